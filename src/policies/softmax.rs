use super::policy::{Policy, PolicyType, Selection};
use super::state::{argmax, PolicyState};

use rand::distr::{weighted::WeightedIndex, Distribution};
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};

// keeps the annealed temperature finite before the first pull
const LOG_OFFSET: f64 = 1e-8;

/// Selection probabilities proportional to `exp(estimate / temperature)`.
///
/// The maximum estimate is subtracted before exponentiating: every weight is
/// then in `[0, 1]` and the largest is exactly 1, so the normalizer never
/// overflows nor vanishes.
pub fn softmax_probabilities(estimates: &[f64], temperature: f64) -> Vec<f64> {
    let max = estimates
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    let weights: Vec<f64> = estimates
        .iter()
        .map(|&estimate| ((estimate - max) / temperature).exp())
        .collect();
    let total: f64 = weights.iter().sum();

    weights.into_iter().map(|weight| weight / total).collect()
}

/// Draws an arm; any arm other than the best estimate counts as exploration.
fn sample_softmax(state: &PolicyState, temperature: f64, rng: &mut SmallRng) -> Selection {
    let estimates: Vec<f64> = state.estimates().collect();
    let probabilities = softmax_probabilities(&estimates, temperature);
    let best_arm = argmax(estimates.iter().copied());

    let arm_id = WeightedIndex::new(&probabilities)
        .map(|distribution| distribution.sample(rng))
        .unwrap_or(best_arm);
    Selection {
        arm_id,
        explored: arm_id != best_arm,
    }
}

#[derive(Clone, Debug)]
pub struct Softmax {
    temperature: f64,
}

impl Softmax {
    pub fn new(temperature: f64) -> Self {
        Self { temperature }
    }
}

impl Policy for Softmax {
    fn policy_type(&self) -> PolicyType {
        PolicyType::Softmax {
            temperature: self.temperature,
        }
    }

    fn select(&self, state: &PolicyState, rng: &mut SmallRng) -> Selection {
        sample_softmax(state, self.temperature, rng)
    }
}

/// Which pull count drives the annealing of the temperature.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemperatureSchedule {
    /// Pulls across all arms.
    #[default]
    TotalPulls,
    /// Pulls of the least pulled arm: cools down only once every arm has data.
    LeastPulled,
}

/// Softmax whose temperature `numerator / ln(t + 1)` decreases as `t` grows.
#[derive(Clone, Debug)]
pub struct AnnealingSoftmax {
    numerator: f64,
    schedule: TemperatureSchedule,
}

impl AnnealingSoftmax {
    pub fn new(numerator: f64, schedule: TemperatureSchedule) -> Self {
        Self {
            numerator,
            schedule,
        }
    }

    pub fn temperature(&self, state: &PolicyState) -> f64 {
        let count = match self.schedule {
            TemperatureSchedule::TotalPulls => state.total_pulls(),
            TemperatureSchedule::LeastPulled => state.min_pulls(),
        };
        self.numerator / ((count as f64) + 1.0 + LOG_OFFSET).ln()
    }
}

impl Policy for AnnealingSoftmax {
    fn policy_type(&self) -> PolicyType {
        PolicyType::AnnealingSoftmax {
            numerator: self.numerator,
            schedule: self.schedule,
        }
    }

    fn select(&self, state: &PolicyState, rng: &mut SmallRng) -> Selection {
        sample_softmax(state, self.temperature(state), rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    const SEED: u64 = 1234;
    const EPS: f64 = 1e-9;

    #[test]
    fn probabilities_sum_to_one() {
        let probabilities = softmax_probabilities(&[0.1, 0.4, 0.2], 0.2);
        assert!((probabilities.iter().sum::<f64>() - 1.0).abs() < EPS);
        assert!(probabilities[1] > probabilities[2]);
        assert!(probabilities[2] > probabilities[0]);
    }

    #[test]
    fn translation_invariance() {
        let estimates = [0.3, 0.1, 0.7, 0.5];
        let reference = softmax_probabilities(&estimates, 0.5);

        [-1e6, -3.0, 42.0, 1e6].iter().for_each(|&shift| {
            let shifted: Vec<f64> = estimates.iter().map(|e| e + shift).collect();
            softmax_probabilities(&shifted, 0.5)
                .iter()
                .zip(reference.iter())
                .for_each(|(a, b)| assert!((a - b).abs() < 1e-6));
        });
    }

    #[test]
    fn large_magnitudes_stay_finite() {
        let estimates = [1e6, -1e6, 999_990.0, 0.0];
        [1e-3, 0.2, 1.0, 1e6].iter().for_each(|&temperature| {
            let probabilities = softmax_probabilities(&estimates, temperature);
            assert!(probabilities.iter().all(|p| p.is_finite()));
            assert!((probabilities.iter().sum::<f64>() - 1.0).abs() < EPS);
        });

        let probabilities = softmax_probabilities(&estimates, 0.2);
        assert!((probabilities[0] - 1.0).abs() < EPS);
    }

    #[test]
    fn equal_estimates_are_uniform() {
        let probabilities = softmax_probabilities(&[0.5; 4], 0.1);
        assert!(probabilities.iter().all(|p| (p - 0.25).abs() < EPS));
    }

    #[test]
    fn select_follows_probabilities() {
        let policy = Softmax::new(0.5);
        let mut rng = SmallRng::seed_from_u64(SEED);
        let mut state = PolicyState::new(2, 0.0);
        state.record_pull(0, 1.0).unwrap();
        state.record_pull(1, 0.0).unwrap();

        let expected = softmax_probabilities(&[1.0, 0.0], 0.5)[0];
        let n = 20_000;
        let hits = (0..n)
            .filter(|_| policy.select(&state, &mut rng).arm_id == 0)
            .count();
        assert!((hits as f64 / n as f64 - expected).abs() < 0.02);
    }

    #[test]
    fn cold_temperature_is_greedy() {
        let policy = Softmax::new(1e-4);
        let mut rng = SmallRng::seed_from_u64(SEED);
        let mut state = PolicyState::new(3, 0.0);
        state.record_pull(0, 0.2).unwrap();
        state.record_pull(1, 0.9).unwrap();
        state.record_pull(2, 0.5).unwrap();
        assert!((0..100).all(|_| policy.select(&state, &mut rng).arm_id == 1));
    }

    #[test]
    fn annealing_temperature_decreases() {
        let policy = AnnealingSoftmax::new(0.25, TemperatureSchedule::TotalPulls);
        let mut state = PolicyState::new(2, 0.0);
        let cold_start = policy.temperature(&state);
        assert!(cold_start.is_finite());

        state.record_pull(0, 1.0).unwrap();
        let after_one = policy.temperature(&state);
        state.record_pull(0, 1.0).unwrap();
        let after_two = policy.temperature(&state);
        assert!(cold_start > after_one);
        assert!(after_one > after_two);
        assert!((after_two - 0.25 / (3.0f64 + LOG_OFFSET).ln()).abs() < EPS);
    }

    #[test]
    fn least_pulled_schedule() {
        let policy = AnnealingSoftmax::new(0.25, TemperatureSchedule::LeastPulled);
        let mut state = PolicyState::new(2, 0.0);
        let initial = policy.temperature(&state);
        state.record_pull(0, 1.0).unwrap();
        state.record_pull(0, 1.0).unwrap();
        assert_eq!(policy.temperature(&state), initial);

        state.record_pull(1, 0.0).unwrap();
        assert!(policy.temperature(&state) < initial);
    }
}
