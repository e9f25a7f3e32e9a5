use super::policy::{Policy, PolicyType, Selection};
use super::state::PolicyState;

use rand::{rngs::SmallRng, Rng};

/// Baseline ignoring every statistic.
#[derive(Clone, Debug)]
pub struct RandomChoice;

impl Policy for RandomChoice {
    fn policy_type(&self) -> PolicyType {
        PolicyType::Random
    }

    fn select(&self, state: &PolicyState, rng: &mut SmallRng) -> Selection {
        Selection::explore(rng.random_range(0..state.num_arms()))
    }
}
