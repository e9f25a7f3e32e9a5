use super::trial::TrialResult;

use crate::arms::ArmSetSpec;
use crate::policies::PolicySpec;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CycleSummary {
    pub cycle: u64,
    pub average_convergence: f64,
    pub final_optimal: bool,
    pub total_reward: f64,
    pub regret: f64,
    /// Pulls that departed from the best current estimate.
    #[serde(default)]
    pub explorations: u64,
    #[serde(default)]
    pub exploitations: u64,
}

/// Output of one (policy, cycle) unit of work.
#[derive(Clone, Debug)]
pub struct CycleOutcome {
    pub policy_index: usize,
    pub cycle: u64,
    pub was_optimal: Vec<bool>,
    pub summary: CycleSummary,
}

impl CycleOutcome {
    pub fn new(policy_index: usize, cycle: u64, trial: TrialResult) -> Self {
        let was_optimal: Vec<bool> = trial.was_optimal().collect();
        let summary = CycleSummary {
            cycle,
            average_convergence: trial.average_convergence(),
            final_optimal: was_optimal.last().copied().unwrap_or_default(),
            total_reward: trial.total_reward(),
            regret: trial.regret,
            explorations: trial.explorations(),
            exploitations: trial.exploitations(),
        };

        Self {
            policy_index,
            cycle,
            was_optimal,
            summary,
        }
    }
}

/// Per-policy sums over cycles.
///
/// Only integer counts and per-cycle records are kept, so merging batches in
/// any order yields exactly the same aggregate.
#[derive(Clone, Debug, Default)]
pub struct ConvergenceAccumulator {
    cycles: u64,
    optimal_counts: Vec<u64>,
    summaries: Vec<CycleSummary>,
}

impl ConvergenceAccumulator {
    pub fn new(num_pulls: usize) -> Self {
        Self {
            cycles: 0,
            optimal_counts: vec![0; num_pulls],
            summaries: Vec::new(),
        }
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn add(&mut self, outcome: CycleOutcome) {
        if self.optimal_counts.len() < outcome.was_optimal.len() {
            self.optimal_counts.resize(outcome.was_optimal.len(), 0);
        }
        self.optimal_counts
            .iter_mut()
            .zip(outcome.was_optimal.iter())
            .for_each(|(count, &optimal)| *count += optimal as u64);
        self.cycles += 1;
        self.summaries.push(outcome.summary);
    }

    pub fn merge(mut self, other: ConvergenceAccumulator) -> Self {
        if self.optimal_counts.len() < other.optimal_counts.len() {
            self.optimal_counts.resize(other.optimal_counts.len(), 0);
        }
        self.optimal_counts
            .iter_mut()
            .zip(other.optimal_counts.iter())
            .for_each(|(count, other)| *count += other);
        self.cycles += other.cycles;
        self.summaries.extend(other.summaries);
        self
    }

    pub fn finish(mut self, policy: &str, spec: &PolicySpec) -> AggregateResult {
        self.summaries.sort_by_key(|summary| summary.cycle);

        let cycles = self.cycles.max(1) as f64;
        let curve: Vec<f64> = self
            .optimal_counts
            .iter()
            .map(|&count| count as f64 / cycles)
            .collect();
        let curve_std_error = curve
            .iter()
            .map(|&fraction| (fraction * (1.0 - fraction) / cycles).sqrt())
            .collect();
        let mean_reward = self.summaries.iter().map(|s| s.total_reward).sum::<f64>() / cycles;
        let mean_regret = self.summaries.iter().map(|s| s.regret).sum::<f64>() / cycles;

        AggregateResult {
            policy: policy.to_string(),
            spec: spec.clone(),
            cycles: self.cycles,
            num_pulls: curve.len(),
            final_fraction: curve.last().copied().unwrap_or_default(),
            mean_fraction: if curve.is_empty() {
                0.0
            } else {
                curve.iter().sum::<f64>() / curve.len() as f64
            },
            mean_reward,
            mean_regret,
            curve,
            curve_std_error,
            cycle_summaries: self.summaries,
        }
    }
}

/// Convergence statistics of one policy across all completed cycles.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub policy: String,
    pub spec: PolicySpec,
    pub cycles: u64,
    pub num_pulls: usize,
    /// Fraction of cycles that chose an optimal arm at each pull.
    pub curve: Vec<f64>,
    pub curve_std_error: Vec<f64>,
    pub final_fraction: f64,
    pub mean_fraction: f64,
    pub mean_reward: f64,
    pub mean_regret: f64,
    pub cycle_summaries: Vec<CycleSummary>,
}

#[derive(Clone, Debug, Serialize)]
pub struct CycleRow {
    pub policy: String,
    pub cycle: u64,
    pub average_convergence: f64,
    pub final_optimal: bool,
    pub total_reward: f64,
    pub explorations: u64,
    pub exploitations: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct CurveRow {
    pub policy: String,
    pub pull: usize,
    pub fraction_optimal: f64,
    pub std_error: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct PolicySummary {
    pub policy: String,
    pub cycles: u64,
    pub final_fraction: f64,
    pub mean_fraction: f64,
    pub mean_reward: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub seed: u64,
    pub arm_set: ArmSetSpec,
    pub num_cycles: u64,
    pub num_pulls: usize,
    pub completed_cycles: u64,
    pub cancelled: bool,
    pub results: BTreeMap<String, AggregateResult>,
}

impl SimulationReport {
    pub fn summary(&self) -> Vec<PolicySummary> {
        self.results
            .values()
            .map(|result| PolicySummary {
                policy: result.policy.clone(),
                cycles: result.cycles,
                final_fraction: result.final_fraction,
                mean_fraction: result.mean_fraction,
                mean_reward: result.mean_reward,
            })
            .collect()
    }

    /// Flat table: one row per (policy, cycle).
    pub fn cycle_rows(&self) -> Vec<CycleRow> {
        self.results
            .values()
            .flat_map(|result| {
                result.cycle_summaries.iter().map(|summary| CycleRow {
                    policy: result.policy.clone(),
                    cycle: summary.cycle,
                    average_convergence: summary.average_convergence,
                    final_optimal: summary.final_optimal,
                    total_reward: summary.total_reward,
                    explorations: summary.explorations,
                    exploitations: summary.exploitations,
                })
            })
            .collect()
    }

    /// Flat table: one row per (policy, pull index).
    pub fn curve_rows(&self) -> Vec<CurveRow> {
        self.results
            .values()
            .flat_map(|result| {
                result
                    .curve
                    .iter()
                    .zip(result.curve_std_error.iter())
                    .enumerate()
                    .map(|(pull, (&fraction_optimal, &std_error))| CurveRow {
                        policy: result.policy.clone(),
                        pull,
                        fraction_optimal,
                        std_error,
                    })
            })
            .collect()
    }
}
