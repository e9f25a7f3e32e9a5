use super::epsilon_greedy::EpsilonGreedy;
use super::interval::IntervalExploration;
use super::random::RandomChoice;
use super::softmax::{AnnealingSoftmax, Softmax, TemperatureSchedule};
use super::state::PolicyState;
use super::ucb::Ucb;

use crate::errors::SimulationError;

use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};

/// Closed set of known policies and their parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PolicyType {
    EpsilonGreedy {
        #[serde(default = "default_epsilon")]
        epsilon: f64,
    },
    Softmax {
        temperature: f64,
    },
    AnnealingSoftmax {
        #[serde(default = "default_numerator")]
        numerator: f64,
        #[serde(default)]
        schedule: TemperatureSchedule,
    },
    Ucb {
        #[serde(default = "default_confidence")]
        c: f64,
    },
    IntervalExploration {
        rho: f64,
    },
    Random,
}

fn default_epsilon() -> f64 {
    0.1
}

fn default_numerator() -> f64 {
    0.25
}

fn default_confidence() -> f64 {
    std::f64::consts::SQRT_2
}

fn check_probability(name: &str, value: f64) -> Result<(), SimulationError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SimulationError::InvalidConfig(format!(
            "{name} must be within [0, 1], got {value}"
        )))
    }
}

fn check_positive(name: &str, value: f64) -> Result<(), SimulationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SimulationError::InvalidConfig(format!(
            "{name} must be finite and strictly positive, got {value}"
        )))
    }
}

impl PolicyType {
    pub fn validate(&self) -> Result<(), SimulationError> {
        match *self {
            PolicyType::EpsilonGreedy { epsilon } => check_probability("epsilon", epsilon),
            PolicyType::Softmax { temperature } => check_positive("temperature", temperature),
            PolicyType::AnnealingSoftmax { numerator, .. } => {
                check_positive("numerator", numerator)
            }
            PolicyType::Ucb { c } => {
                if c.is_finite() && c >= 0.0 {
                    Ok(())
                } else {
                    Err(SimulationError::InvalidConfig(format!(
                        "confidence level c must be finite and non-negative, got {c}"
                    )))
                }
            }
            PolicyType::IntervalExploration { rho } => check_probability("rho", rho),
            PolicyType::Random => Ok(()),
        }
    }

    pub fn into_inner(self) -> Box<dyn Policy> {
        match self {
            PolicyType::EpsilonGreedy { epsilon } => Box::new(EpsilonGreedy::new(epsilon)),
            PolicyType::Softmax { temperature } => Box::new(Softmax::new(temperature)),
            PolicyType::AnnealingSoftmax {
                numerator,
                schedule,
            } => Box::new(AnnealingSoftmax::new(numerator, schedule)),
            PolicyType::Ucb { c } => Box::new(Ucb::new(c)),
            PolicyType::IntervalExploration { rho } => Box::new(IntervalExploration::new(rho)),
            PolicyType::Random => Box::new(RandomChoice),
        }
    }
}

/// An arm choice, flagged when it departs from the best current estimate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Selection {
    pub arm_id: usize,
    pub explored: bool,
}

impl Selection {
    pub fn explore(arm_id: usize) -> Self {
        Self {
            arm_id,
            explored: true,
        }
    }

    pub fn exploit(arm_id: usize) -> Self {
        Self {
            arm_id,
            explored: false,
        }
    }
}

pub trait Policy: Send + Sync {
    fn policy_type(&self) -> PolicyType;
    /// Picks the next arm to pull among `state.num_arms()` arms.
    fn select(&self, state: &PolicyState, rng: &mut SmallRng) -> Selection;
}

/// A policy as configured for a simulation.
///
/// While the least pulled arm has fewer than `warm_up` pulls it is chosen
/// directly and the policy is not consulted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolicySpec {
    pub policy: PolicyType,
    #[serde(default)]
    pub warm_up: u64,
}

impl PolicySpec {
    pub fn new(policy: PolicyType) -> Self {
        Self { policy, warm_up: 0 }
    }

    pub fn with_warm_up(mut self, warm_up: u64) -> Self {
        self.warm_up = warm_up;
        self
    }

    pub fn build(&self) -> Result<ConfiguredPolicy, SimulationError> {
        self.policy.validate()?;
        Ok(ConfiguredPolicy {
            policy: self.policy.clone().into_inner(),
            warm_up: self.warm_up,
        })
    }
}

pub struct ConfiguredPolicy {
    policy: Box<dyn Policy>,
    warm_up: u64,
}

impl ConfiguredPolicy {
    pub fn policy_type(&self) -> PolicyType {
        self.policy.policy_type()
    }

    /// Warm-up pulls count as exploration.
    pub fn select(&self, state: &PolicyState, rng: &mut SmallRng) -> Selection {
        if self.warm_up > 0 && state.min_pulls() < self.warm_up {
            Selection::explore(state.least_pulled_arm())
        } else {
            self.policy.select(state, rng)
        }
    }
}
