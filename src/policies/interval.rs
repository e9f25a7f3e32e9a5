use super::policy::{Policy, PolicyType, Selection};
use super::state::{argmax, PolicyState};

use rand::{rngs::SmallRng, Rng};

/// Width of the 95% confidence interval of a success rate estimated from
/// `pulls` observations. The lower bound is clipped at zero.
pub fn confidence_width(estimate: f64, pulls: u64) -> f64 {
    if pulls == 0 {
        return f64::INFINITY;
    }
    let p = estimate.clamp(0.0, 1.0);
    let std_error = (p * (1.0 - p) / pulls as f64).sqrt();
    let high = p + 2.0 * std_error;
    let low = (p - 2.0 * std_error).max(0.0);
    high - low
}

/// With probability `rho` pulls the arm whose estimate is the least certain,
/// otherwise the best estimated arm. Intended for success-rate rewards.
#[derive(Clone, Debug)]
pub struct IntervalExploration {
    rho: f64,
}

impl IntervalExploration {
    pub fn new(rho: f64) -> Self {
        Self { rho }
    }
}

impl Policy for IntervalExploration {
    fn policy_type(&self) -> PolicyType {
        PolicyType::IntervalExploration { rho: self.rho }
    }

    fn select(&self, state: &PolicyState, rng: &mut SmallRng) -> Selection {
        if rng.random::<f64>() < self.rho {
            Selection::explore(argmax(
                (0..state.num_arms())
                    .map(|arm_id| confidence_width(state.estimate(arm_id), state.pull_count(arm_id))),
            ))
        } else {
            Selection::exploit(state.best_arm())
        }
    }
}
