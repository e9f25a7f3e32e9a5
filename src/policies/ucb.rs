use super::policy::{Policy, PolicyType, Selection};
use super::state::{argmax, PolicyState};

use rand::rngs::SmallRng;

#[derive(Clone, Debug)]
pub struct Ucb {
    c: f64,
}

impl Ucb {
    pub fn new(c: f64) -> Self {
        Self { c }
    }

    fn upper_bound(&self, state: &PolicyState, arm_id: usize) -> f64 {
        let total = state.total_pulls() as f64;
        let pulls = state.pull_count(arm_id) as f64;
        state.estimate(arm_id) + self.c * (total.ln() / pulls).sqrt()
    }
}

impl Policy for Ucb {
    fn policy_type(&self) -> PolicyType {
        PolicyType::Ucb { c: self.c }
    }

    fn select(&self, state: &PolicyState, _: &mut SmallRng) -> Selection {
        // every arm is pulled once, in index order, before confidence bounds apply
        if let Some(arm_id) = state.pull_counts().position(|pulls| pulls == 0) {
            return Selection::explore(arm_id);
        }

        let arm_id = argmax((0..state.num_arms()).map(|arm_id| self.upper_bound(state, arm_id)));
        Selection {
            arm_id,
            explored: arm_id != state.best_arm(),
        }
    }
}
