use crate::arms::ArmSet;
use crate::errors::SimulationError;
use crate::policies::errors::PolicyError;
use crate::policies::{ConfiguredPolicy, PolicyState, PolicyStats};

use rand::rngs::SmallRng;

#[derive(Clone, Copy, Debug)]
pub struct PullRecord {
    pub arm_id: usize,
    pub reward: f64,
    pub was_optimal: bool,
    /// The policy departed from its best estimate for this pull.
    pub explored: bool,
}

#[derive(Clone, Debug)]
pub struct TrialResult {
    pub pulls: Vec<PullRecord>,
    pub stats: PolicyStats,
    pub regret: f64,
}

impl TrialResult {
    pub fn was_optimal(&self) -> impl Iterator<Item = bool> + '_ {
        self.pulls.iter().map(|pull| pull.was_optimal)
    }

    pub fn explorations(&self) -> u64 {
        self.pulls.iter().filter(|pull| pull.explored).count() as u64
    }

    pub fn exploitations(&self) -> u64 {
        self.pulls.len() as u64 - self.explorations()
    }

    pub fn total_reward(&self) -> f64 {
        self.pulls.iter().map(|pull| pull.reward).sum()
    }

    /// Share of pulls that chose an optimal arm.
    pub fn average_convergence(&self) -> f64 {
        if self.pulls.is_empty() {
            return 0.0;
        }
        self.was_optimal().filter(|&optimal| optimal).count() as f64 / self.pulls.len() as f64
    }
}

/// One policy playing one arm set for a fixed number of pulls, from a cold state.
pub struct Trial<'a> {
    policy: &'a ConfiguredPolicy,
    arm_set: &'a ArmSet,
    num_pulls: usize,
    initial_estimate: f64,
}

impl<'a> Trial<'a> {
    pub fn new(
        policy: &'a ConfiguredPolicy,
        arm_set: &'a ArmSet,
        num_pulls: usize,
        initial_estimate: f64,
    ) -> Result<Self, SimulationError> {
        if num_pulls < 1 {
            return Err(SimulationError::InvalidConfig(
                "a trial needs at least one pull".to_string(),
            ));
        }

        Ok(Self {
            policy,
            arm_set,
            num_pulls,
            initial_estimate,
        })
    }

    pub fn run(&self, rng: &mut SmallRng) -> Result<TrialResult, SimulationError> {
        let mut state = PolicyState::new(self.arm_set.len(), self.initial_estimate);
        let mut pulls = Vec::with_capacity(self.num_pulls);
        let mut regret = 0.0;

        for _ in 0..self.num_pulls {
            let selection = self.policy.select(&state, rng);
            let arm_id = selection.arm_id;
            let reward = self
                .arm_set
                .sample(arm_id, rng)
                .ok_or(PolicyError::ArmNotFound(arm_id))?;
            regret += self.arm_set.best_mean() - self.arm_set.mean(arm_id).unwrap_or_default();

            pulls.push(PullRecord {
                arm_id,
                reward,
                was_optimal: self.arm_set.is_optimal(arm_id),
                explored: selection.explored,
            });
            state.record_pull(arm_id, reward)?;
        }

        Ok(TrialResult {
            pulls,
            stats: state.stats(),
            regret,
        })
    }
}
