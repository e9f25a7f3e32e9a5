use super::errors::PolicyError;

use serde::Serialize;
use std::cmp::Ordering;

#[derive(Clone, Debug, Serialize)]
pub struct ArmStats {
    pub pulls: u64,
    pub mean_reward: f64,
    pub rewards: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct PolicyStats {
    pub arms: Vec<ArmStats>,
}

#[derive(Clone, Debug)]
struct ArmEstimate {
    pulls: u64,
    estimate: f64,
    rewards: f64,
}

impl ArmEstimate {
    fn new(initial_estimate: f64) -> Self {
        Self {
            pulls: 0,
            estimate: initial_estimate,
            rewards: 0.0,
        }
    }

    fn update(&mut self, reward: f64) {
        self.pulls += 1;
        self.rewards += reward;
        self.estimate += (reward - self.estimate) / (self.pulls as f64);
    }
}

/// Online statistics a policy reads to pick its next arm.
///
/// Owned by a single trial: the trial is the only writer, policies only get a
/// shared reference. Before an arm is pulled its estimate is the configured
/// initial estimate; the first pull replaces it with the observed reward.
#[derive(Clone, Debug)]
pub struct PolicyState {
    arms: Vec<ArmEstimate>,
    initial_estimate: f64,
    total_pulls: u64,
}

impl PolicyState {
    pub fn new(num_arms: usize, initial_estimate: f64) -> Self {
        Self {
            arms: vec![ArmEstimate::new(initial_estimate); num_arms],
            initial_estimate,
            total_pulls: 0,
        }
    }

    pub fn num_arms(&self) -> usize {
        self.arms.len()
    }

    pub fn total_pulls(&self) -> u64 {
        self.total_pulls
    }

    pub fn pull_count(&self, arm_id: usize) -> u64 {
        self.arms.get(arm_id).map(|arm| arm.pulls).unwrap_or_default()
    }

    pub fn estimate(&self, arm_id: usize) -> f64 {
        self.arms
            .get(arm_id)
            .map(|arm| arm.estimate)
            .unwrap_or(self.initial_estimate)
    }

    pub fn estimates(&self) -> impl Iterator<Item = f64> + '_ {
        self.arms.iter().map(|arm| arm.estimate)
    }

    pub fn pull_counts(&self) -> impl Iterator<Item = u64> + '_ {
        self.arms.iter().map(|arm| arm.pulls)
    }

    pub fn min_pulls(&self) -> u64 {
        self.pull_counts().min().unwrap_or_default()
    }

    /// Arm with the highest estimate, lowest index on ties.
    pub fn best_arm(&self) -> usize {
        argmax(self.estimates())
    }

    /// Arm with the fewest pulls, lowest index on ties.
    pub fn least_pulled_arm(&self) -> usize {
        self.pull_counts()
            .enumerate()
            .min_by_key(|&(_, pulls)| pulls)
            .map(|(arm_id, _)| arm_id)
            .unwrap_or_default()
    }

    pub fn record_pull(&mut self, arm_id: usize, reward: f64) -> Result<(), PolicyError> {
        self.arms
            .get_mut(arm_id)
            .ok_or(PolicyError::ArmNotFound(arm_id))?
            .update(reward);
        self.total_pulls += 1;

        Ok(())
    }

    pub fn stats(&self) -> PolicyStats {
        PolicyStats {
            arms: self
                .arms
                .iter()
                .map(|arm| ArmStats {
                    pulls: arm.pulls,
                    mean_reward: arm.estimate,
                    rewards: arm.rewards,
                })
                .collect(),
        }
    }
}

/// Index of the largest value, keeping the lowest index among ties.
pub(crate) fn argmax(values: impl Iterator<Item = f64>) -> usize {
    values
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (arm_id, value)| match best {
            Some((_, best_value))
                if value.partial_cmp(&best_value).unwrap_or(Ordering::Less)
                    != Ordering::Greater =>
            {
                best
            }
            _ => Some((arm_id, value)),
        })
        .map(|(arm_id, _)| arm_id)
        .unwrap_or_default()
}
