use super::reward::RewardModel;

use crate::errors::SimulationError;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Upper bound on arms per set; each trial allocates per-arm state.
pub const MAX_ARMS: usize = 10_000;

fn check_num_arms(num_arms: usize) -> Result<(), SimulationError> {
    if num_arms == 0 {
        return Err(SimulationError::InvalidArmSet(
            "at least one arm is required".to_string(),
        ));
    }
    if num_arms > MAX_ARMS {
        return Err(SimulationError::InvalidArmSet(format!(
            "{num_arms} arms exceeds the limit of {MAX_ARMS}"
        )));
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct Arm {
    pub id: usize,
    pub model: RewardModel,
}

/// Ordered, validated arms with their ground truth. Read-only once built.
#[derive(Clone, Debug, Serialize)]
pub struct ArmSet {
    arms: Vec<Arm>,
    optimal_arm: usize,
    best_mean: f64,
}

impl ArmSet {
    pub fn new(models: Vec<RewardModel>) -> Result<Self, SimulationError> {
        check_num_arms(models.len())?;

        models.iter().enumerate().try_for_each(|(arm_id, model)| {
            model
                .validate()
                .map_err(|err| SimulationError::InvalidArmSet(format!("arm {arm_id}: {err}")))
        })?;

        // strict comparison keeps the lowest index among tied maxima
        let (optimal_arm, best_mean) = models
            .iter()
            .map(RewardModel::mean)
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |(best_id, best), (arm_id, mean)| {
                if mean > best {
                    (arm_id, mean)
                } else {
                    (best_id, best)
                }
            });

        let arms = models
            .into_iter()
            .enumerate()
            .map(|(id, model)| Arm { id, model })
            .collect();

        Ok(Self {
            arms,
            optimal_arm,
            best_mean,
        })
    }

    pub fn arms(&self) -> &[Arm] {
        &self.arms
    }

    pub fn len(&self) -> usize {
        self.arms.len()
    }

    pub fn optimal_arm(&self) -> usize {
        self.optimal_arm
    }

    pub fn best_mean(&self) -> f64 {
        self.best_mean
    }

    pub fn mean(&self, arm_id: usize) -> Option<f64> {
        self.arms.get(arm_id).map(|arm| arm.model.mean())
    }

    /// Any arm tied with the best true mean counts as optimal.
    pub fn is_optimal(&self, arm_id: usize) -> bool {
        self.mean(arm_id)
            .is_some_and(|mean| mean >= self.best_mean)
    }

    pub fn sample<R: Rng + ?Sized>(&self, arm_id: usize, rng: &mut R) -> Option<f64> {
        self.arms.get(arm_id).map(|arm| arm.model.sample(rng))
    }
}

/// How the arm set of each cycle is produced.
///
/// `Fixed` builds one arm set that every cycle and every policy shares, so the
/// convergence curve measures how fast a policy finds one known optimum.
/// `Resampled` draws fresh Bernoulli probabilities for every cycle, so the
/// curve averages over random problem instances. The arm set of a cycle only
/// depends on the seed and the cycle index, never on the policy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ArmSetSpec {
    Fixed {
        arms: Vec<RewardModel>,
    },
    Resampled {
        num_arms: usize,
        #[serde(default)]
        min_probability: f64,
        #[serde(default = "default_max_probability")]
        max_probability: f64,
    },
}

fn default_max_probability() -> f64 {
    1.0
}

impl ArmSetSpec {
    pub fn validate(&self) -> Result<(), SimulationError> {
        match self {
            ArmSetSpec::Fixed { arms } => ArmSet::new(arms.clone()).map(|_| ()),
            ArmSetSpec::Resampled {
                num_arms,
                min_probability,
                max_probability,
            } => {
                check_num_arms(*num_arms)?;
                if !(0.0..=1.0).contains(min_probability)
                    || !(0.0..=1.0).contains(max_probability)
                    || min_probability > max_probability
                {
                    return Err(SimulationError::InvalidArmSet(format!(
                        "probability range [{min_probability}, {max_probability}] must lie within [0, 1]"
                    )));
                }
                Ok(())
            }
        }
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self, ArmSetSpec::Fixed { .. })
    }

    pub fn num_arms(&self) -> usize {
        match self {
            ArmSetSpec::Fixed { arms } => arms.len(),
            ArmSetSpec::Resampled { num_arms, .. } => *num_arms,
        }
    }

    pub fn build<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<ArmSet, SimulationError> {
        match self {
            ArmSetSpec::Fixed { arms } => ArmSet::new(arms.clone()),
            ArmSetSpec::Resampled {
                num_arms,
                min_probability,
                max_probability,
            } => {
                self.validate()?;
                let models = (0..*num_arms)
                    .map(|_| {
                        RewardModel::bernoulli(rng.random_range(*min_probability..=*max_probability))
                    })
                    .collect();
                ArmSet::new(models)
            }
        }
    }
}
