use super::policy::{Policy, PolicyType, Selection};
use super::state::PolicyState;

use rand::{rngs::SmallRng, Rng};

#[derive(Clone, Debug)]
pub struct EpsilonGreedy {
    epsilon: f64,
}

impl EpsilonGreedy {
    pub fn new(epsilon: f64) -> Self {
        Self { epsilon }
    }
}

impl Policy for EpsilonGreedy {
    fn policy_type(&self) -> PolicyType {
        PolicyType::EpsilonGreedy {
            epsilon: self.epsilon,
        }
    }

    fn select(&self, state: &PolicyState, rng: &mut SmallRng) -> Selection {
        if rng.random::<f64>() < self.epsilon {
            Selection::explore(rng.random_range(0..state.num_arms()))
        } else {
            Selection::exploit(state.best_arm())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    const SEED: u64 = 1234;

    #[test]
    fn select_single_arm() {
        let policy = EpsilonGreedy::new(0.15);
        let mut rng = SmallRng::seed_from_u64(SEED);
        let state = PolicyState::new(1, 0.0);
        assert!((0..50).all(|_| policy.select(&state, &mut rng).arm_id == 0));
    }

    #[test]
    fn select_best() {
        let policy = EpsilonGreedy::new(0.0);
        let mut rng = SmallRng::seed_from_u64(SEED);
        let mut state = PolicyState::new(3, 0.0);
        state.record_pull(0, 0.2).unwrap();
        state.record_pull(1, 0.9).unwrap();
        state.record_pull(2, 0.5).unwrap();

        assert!((0..100).all(|_| policy.select(&state, &mut rng).arm_id == 1));
    }

    #[test]
    fn greedy_ties_lowest_index() {
        let policy = EpsilonGreedy::new(0.0);
        let mut rng = SmallRng::seed_from_u64(SEED);
        let mut state = PolicyState::new(4, 0.0);
        state.record_pull(2, 1.0).unwrap();
        state.record_pull(3, 1.0).unwrap();

        assert!((0..100).all(|_| policy.select(&state, &mut rng).arm_id == 2));
    }

    #[test]
    fn full_exploration_is_uniform() {
        let policy = EpsilonGreedy::new(1.0);
        let mut rng = SmallRng::seed_from_u64(SEED);
        let mut state = PolicyState::new(4, 0.0);
        state.record_pull(0, 1.0).unwrap();

        let n = 40_000;
        let mut counts = [0usize; 4];
        (0..n).for_each(|_| counts[policy.select(&state, &mut rng).arm_id] += 1);

        counts
            .iter()
            .for_each(|&count| assert!((count as f64 / n as f64 - 0.25).abs() < 0.01));
    }

    #[test]
    fn deterministic_with_seed() {
        let policy = EpsilonGreedy::new(0.5);
        let mut state = PolicyState::new(5, 0.0);
        state.record_pull(3, 1.0).unwrap();

        let draw = |seed| {
            let mut rng = SmallRng::seed_from_u64(seed);
            (0..200)
                .map(|_| policy.select(&state, &mut rng).arm_id)
                .collect::<Vec<usize>>()
        };
        assert_eq!(draw(SEED), draw(SEED));
    }
}
