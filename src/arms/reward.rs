use crate::errors::SimulationError;

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Ground-truth reward distribution of a single arm.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "distribution", rename_all = "snake_case")]
pub enum RewardModel {
    Bernoulli { probability: f64 },
    Gaussian { mean: f64, std_dev: f64 },
}

impl RewardModel {
    pub fn bernoulli(probability: f64) -> Self {
        RewardModel::Bernoulli { probability }
    }

    /// True expected reward, used to score optimal choices.
    pub fn mean(&self) -> f64 {
        match *self {
            RewardModel::Bernoulli { probability } => probability,
            RewardModel::Gaussian { mean, .. } => mean,
        }
    }

    pub fn validate(&self) -> Result<(), SimulationError> {
        match *self {
            RewardModel::Bernoulli { probability } => {
                if !(0.0..=1.0).contains(&probability) {
                    return Err(SimulationError::InvalidParameter(format!(
                        "bernoulli probability {probability} outside [0, 1]"
                    )));
                }
            }
            RewardModel::Gaussian { mean, std_dev } => {
                if !mean.is_finite() {
                    return Err(SimulationError::InvalidParameter(format!(
                        "gaussian mean {mean} is not finite"
                    )));
                }
                if !std_dev.is_finite() || std_dev < 0.0 {
                    return Err(SimulationError::InvalidParameter(format!(
                        "gaussian standard deviation {std_dev} must be finite and non-negative"
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match *self {
            RewardModel::Bernoulli { probability } => {
                if rng.random::<f64>() < probability {
                    1.0
                } else {
                    0.0
                }
            }
            RewardModel::Gaussian { mean, std_dev } => Normal::new(mean, std_dev)
                .map(|normal| normal.sample(rng))
                .unwrap_or(mean),
        }
    }
}
