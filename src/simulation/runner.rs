use super::results::{ConvergenceAccumulator, CycleOutcome, SimulationReport};
use super::seeding::{cycle_rng, policy_stream, resolve_seed, ARM_SET_STREAM};
use super::trial::Trial;

use crate::arms::{ArmSet, ArmSetSpec};
use crate::errors::SimulationError;
use crate::policies::{ConfiguredPolicy, PolicySpec};

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub policies: BTreeMap<String, PolicySpec>,
    pub arm_set: ArmSetSpec,
    pub num_cycles: u64,
    pub num_pulls: usize,
    #[serde(default)]
    pub seed: Option<u64>,
    /// Estimate of an arm before its first pull.
    #[serde(default)]
    pub initial_estimate: f64,
}

/// Limits on how long a run may go on.
///
/// Checked before each (policy, cycle) unit starts; a unit that is already
/// running always completes.
#[derive(Clone, Debug, Default)]
pub struct RunBudget {
    deadline: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

impl RunBudget {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_exhausted(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
            || self
                .deadline
                .is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// Accumulators of a range of cycles, one per policy in configuration order.
#[derive(Clone, Debug)]
pub struct BatchResult {
    accumulators: Vec<ConvergenceAccumulator>,
    completed_cycles: u64,
    cancelled: bool,
}

impl BatchResult {
    fn empty(num_policies: usize, num_pulls: usize) -> Self {
        Self {
            accumulators: vec![ConvergenceAccumulator::new(num_pulls); num_policies],
            completed_cycles: 0,
            cancelled: false,
        }
    }

    fn push_cycle(&mut self, outcomes: Vec<CycleOutcome>) {
        if outcomes.len() != self.accumulators.len() {
            self.cancelled = true;
            return;
        }
        for outcome in outcomes {
            if let Some(accumulator) = self.accumulators.get_mut(outcome.policy_index) {
                accumulator.add(outcome);
            }
        }
        self.completed_cycles += 1;
    }

    pub fn completed_cycles(&self) -> u64 {
        self.completed_cycles
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn merge(self, other: BatchResult) -> Self {
        Self {
            accumulators: self
                .accumulators
                .into_iter()
                .zip(other.accumulators)
                .map(|(left, right)| left.merge(right))
                .collect(),
            completed_cycles: self.completed_cycles + other.completed_cycles,
            cancelled: self.cancelled || other.cancelled,
        }
    }
}

/// Folds outcomes into a batch as they arrive, in any order.
///
/// A cycle is held only until every policy has reported it. `None` marks a
/// unit skipped by the budget.
#[derive(Debug)]
pub struct CycleCollector {
    batch: BatchResult,
    pending: BTreeMap<u64, Vec<CycleOutcome>>,
}

impl CycleCollector {
    pub fn new(num_policies: usize, num_pulls: usize) -> Self {
        Self {
            batch: BatchResult::empty(num_policies, num_pulls),
            pending: BTreeMap::new(),
        }
    }

    pub fn push(&mut self, outcome: Option<CycleOutcome>) {
        let Some(outcome) = outcome else {
            self.batch.cancelled = true;
            return;
        };

        let cycle = outcome.cycle;
        let outcomes = self.pending.entry(cycle).or_default();
        outcomes.push(outcome);
        if outcomes.len() < self.batch.accumulators.len() {
            return;
        }
        if let Some(outcomes) = self.pending.remove(&cycle) {
            self.batch.push_cycle(outcomes);
        }
    }

    /// Cycles still waiting for at least one policy.
    pub fn pending_cycles(&self) -> usize {
        self.pending.len()
    }

    /// Drops the cycles some policy never finished.
    pub fn finish(mut self) -> BatchResult {
        if !self.pending.is_empty() {
            self.batch.cancelled = true;
        }
        self.batch
    }
}

/// Validated simulation, ready to run cycles in any order.
pub struct SimulationRunner {
    config: SimulationConfig,
    seed: u64,
    policies: Vec<(String, ConfiguredPolicy)>,
    fixed_arm_set: Option<ArmSet>,
}

impl SimulationRunner {
    /// Rejects the whole configuration on the first invalid element.
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        if config.policies.is_empty() {
            return Err(SimulationError::InvalidConfig(
                "at least one policy is required".to_string(),
            ));
        }
        if config.num_cycles < 1 {
            return Err(SimulationError::InvalidConfig(
                "num_cycles must be at least 1".to_string(),
            ));
        }
        if config.num_pulls < 1 {
            return Err(SimulationError::InvalidConfig(
                "num_pulls must be at least 1".to_string(),
            ));
        }
        if !config.initial_estimate.is_finite() {
            return Err(SimulationError::InvalidConfig(format!(
                "initial_estimate {} is not finite",
                config.initial_estimate
            )));
        }
        config.arm_set.validate()?;

        let policies = config
            .policies
            .iter()
            .map(|(name, spec)| {
                spec.build()
                    .map(|policy| (name.clone(), policy))
                    .map_err(|err| SimulationError::InvalidConfig(format!("{name}: {err}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let seed = resolve_seed(config.seed);
        let fixed_arm_set = match &config.arm_set {
            ArmSetSpec::Fixed { arms } => Some(ArmSet::new(arms.clone())?),
            ArmSetSpec::Resampled { .. } => None,
        };

        Ok(Self {
            config,
            seed,
            policies,
            fixed_arm_set,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn num_policies(&self) -> usize {
        self.policies.len()
    }

    pub fn num_cycles(&self) -> u64 {
        self.config.num_cycles
    }

    pub fn num_pulls(&self) -> usize {
        self.config.num_pulls
    }

    pub fn policy_names(&self) -> impl Iterator<Item = &str> {
        self.policies.iter().map(|(name, _)| name.as_str())
    }

    fn arm_set_for_cycle(&self, cycle: u64) -> Result<Cow<'_, ArmSet>, SimulationError> {
        match &self.fixed_arm_set {
            Some(arm_set) => Ok(Cow::Borrowed(arm_set)),
            None => {
                let mut rng = cycle_rng(self.seed, ARM_SET_STREAM, cycle);
                self.config.arm_set.build(&mut rng).map(Cow::Owned)
            }
        }
    }

    /// Runs one policy on one cycle. Pure: the outcome only depends on the
    /// policy, its name, the arm set, the seed and the cycle index.
    pub fn run_cycle(
        &self,
        policy_index: usize,
        cycle: u64,
    ) -> Result<CycleOutcome, SimulationError> {
        let (name, policy) = self.policies.get(policy_index).ok_or_else(|| {
            SimulationError::InvalidConfig(format!("no policy at index {policy_index}"))
        })?;
        let arm_set = self.arm_set_for_cycle(cycle)?;
        let mut rng = cycle_rng(self.seed, policy_stream(name), cycle);

        let trial = Trial::new(
            policy,
            &arm_set,
            self.config.num_pulls,
            self.config.initial_estimate,
        )?
        .run(&mut rng)?;

        Ok(CycleOutcome::new(policy_index, cycle, trial))
    }

    /// Runs every policy over `cycles`, cycle by cycle. Stops at the first
    /// unit the budget does not allow; the interrupted cycle is dropped.
    pub fn run_batch(
        &self,
        cycles: Range<u64>,
        budget: &RunBudget,
    ) -> Result<BatchResult, SimulationError> {
        let mut batch = BatchResult::empty(self.policies.len(), self.config.num_pulls);

        'cycles: for cycle in cycles {
            let mut outcomes = Vec::with_capacity(self.policies.len());
            for policy_index in 0..self.policies.len() {
                if budget.is_exhausted() {
                    batch.cancelled = true;
                    break 'cycles;
                }
                outcomes.push(self.run_cycle(policy_index, cycle)?);
            }
            batch.push_cycle(outcomes);
        }

        debug!(
            completed_cycles = batch.completed_cycles,
            cancelled = batch.cancelled,
            "Finished batch"
        );
        Ok(batch)
    }

    pub fn report(&self, batch: BatchResult) -> SimulationReport {
        if batch.cancelled {
            warn!(
                seed = self.seed,
                completed_cycles = batch.completed_cycles,
                requested_cycles = self.config.num_cycles,
                "Simulation stopped before completing every cycle"
            );
        }

        let results = self
            .config
            .policies
            .iter()
            .zip(batch.accumulators)
            .map(|((name, spec), accumulator)| (name.clone(), accumulator.finish(name, spec)))
            .collect();

        SimulationReport {
            seed: self.seed,
            arm_set: self.config.arm_set.clone(),
            num_cycles: self.config.num_cycles,
            num_pulls: self.config.num_pulls,
            completed_cycles: batch.completed_cycles,
            cancelled: batch.cancelled,
            results,
        }
    }

    /// Runs the whole configuration on the current thread.
    pub fn run(&self, budget: &RunBudget) -> Result<SimulationReport, SimulationError> {
        info!(
            seed = self.seed,
            policies = self.policies.len(),
            cycles = self.config.num_cycles,
            pulls = self.config.num_pulls,
            "Starting simulation"
        );
        let batch = self.run_batch(0..self.config.num_cycles, budget)?;
        Ok(self.report(batch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arms::RewardModel;
    use crate::policies::PolicyType;

    const SEED: u64 = 1234;

    fn fixed_arms(probabilities: &[f64]) -> ArmSetSpec {
        ArmSetSpec::Fixed {
            arms: probabilities
                .iter()
                .map(|&p| RewardModel::bernoulli(p))
                .collect(),
        }
    }

    fn config(policies: &[(&str, PolicyType)], num_cycles: u64, num_pulls: usize) -> SimulationConfig {
        SimulationConfig {
            policies: policies
                .iter()
                .map(|(name, policy_type)| (name.to_string(), PolicySpec::new(policy_type.clone())))
                .collect(),
            arm_set: fixed_arms(&[0.5, 0.5, 0.9]),
            num_cycles,
            num_pulls,
            seed: Some(SEED),
            initial_estimate: 0.0,
        }
    }

    fn epsilon_greedy() -> (&'static str, PolicyType) {
        ("epsilon-greedy", PolicyType::EpsilonGreedy { epsilon: 0.1 })
    }

    #[test]
    fn rejects_invalid_configuration() {
        let mut bad = config(&[epsilon_greedy()], 10, 10);
        bad.num_pulls = 0;
        assert!(matches!(
            SimulationRunner::new(bad),
            Err(SimulationError::InvalidConfig(_))
        ));

        let mut bad = config(&[epsilon_greedy()], 10, 10);
        bad.num_cycles = 0;
        assert!(SimulationRunner::new(bad).is_err());

        let bad = config(&[], 10, 10);
        assert!(SimulationRunner::new(bad).is_err());

        // one bad policy rejects everything
        let bad = config(
            &[epsilon_greedy(), ("softmax", PolicyType::Softmax { temperature: 0.0 })],
            10,
            10,
        );
        assert!(matches!(
            SimulationRunner::new(bad),
            Err(SimulationError::InvalidConfig(_))
        ));

        let mut bad = config(&[epsilon_greedy()], 10, 10);
        bad.arm_set = fixed_arms(&[]);
        assert!(matches!(
            SimulationRunner::new(bad),
            Err(SimulationError::InvalidArmSet(_))
        ));

        let mut bad = config(&[epsilon_greedy()], 10, 10);
        bad.arm_set = fixed_arms(&[0.3, 1.3]);
        assert!(matches!(
            SimulationRunner::new(bad),
            Err(SimulationError::InvalidArmSet(_))
        ));
    }

    #[test]
    fn run_cycle_is_pure() {
        let runner = SimulationRunner::new(config(&[epsilon_greedy()], 5, 200)).unwrap();
        let first = runner.run_cycle(0, 3).unwrap();
        let second = runner.run_cycle(0, 3).unwrap();
        assert_eq!(first.was_optimal, second.was_optimal);
        assert_eq!(first.summary, second.summary);
        assert!(runner.run_cycle(4, 0).is_err());
    }

    #[test]
    fn rejects_oversized_arm_set() {
        let mut bad = config(&[epsilon_greedy()], 10, 10);
        bad.arm_set = ArmSetSpec::Resampled {
            num_arms: usize::MAX / 8,
            min_probability: 0.0,
            max_probability: 1.0,
        };
        assert!(matches!(
            SimulationRunner::new(bad),
            Err(SimulationError::InvalidArmSet(_))
        ));
    }

    #[test]
    fn policy_results_ignore_other_policies() {
        let alone = SimulationRunner::new(config(&[epsilon_greedy()], 50, 100))
            .unwrap()
            .run(&RunBudget::unlimited())
            .unwrap();
        let with_other = SimulationRunner::new(config(
            &[("alpha", PolicyType::Random), epsilon_greedy()],
            50,
            100,
        ))
        .unwrap()
        .run(&RunBudget::unlimited())
        .unwrap();

        let name = epsilon_greedy().0;
        assert_eq!(with_other.results[name], alone.results[name]);
    }

    #[test]
    fn curve_shape() {
        let runner = SimulationRunner::new(config(
            &[epsilon_greedy(), ("ucb", PolicyType::Ucb { c: 1.0 })],
            20,
            100,
        ))
        .unwrap();
        let report = runner.run(&RunBudget::unlimited()).unwrap();

        assert_eq!(report.completed_cycles, 20);
        assert!(!report.cancelled);
        assert_eq!(report.results.len(), 2);
        report.results.values().for_each(|result| {
            assert_eq!(result.cycles, 20);
            assert_eq!(result.curve.len(), 100);
            assert!(result.curve.iter().all(|f| (0.0..=1.0).contains(f)));
            assert_eq!(result.cycle_summaries.len(), 20);
        });
    }

    #[test]
    fn convergence_improves() {
        let runner = SimulationRunner::new(SimulationConfig {
            arm_set: fixed_arms(&[0.1, 0.1, 0.9, 0.1]),
            ..config(&[epsilon_greedy()], 300, 2000)
        })
        .unwrap();
        let report = runner.run(&RunBudget::unlimited()).unwrap();
        let curve = &report.results["epsilon-greedy"].curve;

        let early: f64 = curve[..10].iter().sum::<f64>() / 10.0;
        let late: f64 = curve[1990..].iter().sum::<f64>() / 10.0;
        assert!(late > early + 0.3, "early {early}, late {late}");
        assert!(curve[1999] > curve[9]);
    }

    #[test]
    fn end_to_end_is_reproducible() {
        let run = || {
            SimulationRunner::new(config(&[epsilon_greedy()], 500, 2000))
                .unwrap()
                .run(&RunBudget::unlimited())
                .unwrap()
        };
        let first = run();
        let result = &first.results["epsilon-greedy"];
        // exploiting arm 2 forever caps the fraction at 0.9 + 0.1 / 3
        let late = result.curve[1900..].iter().sum::<f64>() / 100.0;
        assert!((0.70..=0.95).contains(&late), "late fraction {late}");
        assert!(
            result.final_fraction > 0.70,
            "final fraction {}",
            result.final_fraction
        );
        assert!(result.mean_fraction > 0.5 && result.mean_fraction < late);

        let second = run();
        assert_eq!(first, second);
        assert_eq!(
            result.final_fraction.to_bits(),
            second.results["epsilon-greedy"].final_fraction.to_bits()
        );
    }

    #[test]
    fn split_batches_merge_to_single_run() {
        let runner = SimulationRunner::new(config(
            &[epsilon_greedy(), ("softmax", PolicyType::Softmax { temperature: 0.2 })],
            500,
            200,
        ))
        .unwrap();
        let budget = RunBudget::unlimited();

        let whole = runner.run_batch(0..500, &budget).unwrap();
        let first = runner.run_batch(0..250, &budget).unwrap();
        let second = runner.run_batch(250..500, &budget).unwrap();

        let merged = runner.report(second.merge(first));
        let single = runner.report(whole);
        assert_eq!(merged.completed_cycles, 500);
        assert_eq!(merged, single);
    }

    #[test]
    fn resampled_arm_sets_are_shared_across_policies() {
        let mut resampled = config(
            &[("a", PolicyType::Random), ("b", PolicyType::Ucb { c: 1.0 })],
            3,
            10,
        );
        resampled.arm_set = ArmSetSpec::Resampled {
            num_arms: 4,
            min_probability: 0.0,
            max_probability: 1.0,
        };
        let runner = SimulationRunner::new(resampled).unwrap();

        let first = runner.arm_set_for_cycle(1).unwrap().into_owned();
        let again = runner.arm_set_for_cycle(1).unwrap().into_owned();
        let other = runner.arm_set_for_cycle(2).unwrap().into_owned();
        let means = |arm_set: &ArmSet| -> Vec<f64> {
            arm_set.arms().iter().map(|arm| arm.model.mean()).collect()
        };
        assert_eq!(means(&first), means(&again));
        assert_ne!(means(&first), means(&other));

        let report = runner.run(&RunBudget::unlimited()).unwrap();
        assert!(!report.arm_set.is_fixed());
        assert_eq!(report.completed_cycles, 3);
    }

    #[test]
    fn cancelled_budget_runs_nothing() {
        let runner = SimulationRunner::new(config(&[epsilon_greedy()], 50, 100)).unwrap();
        let budget = RunBudget::unlimited();
        budget.cancel();

        let report = runner.run(&budget).unwrap();
        assert!(report.cancelled);
        assert_eq!(report.completed_cycles, 0);
        assert_eq!(report.results["epsilon-greedy"].cycles, 0);
    }

    #[test]
    fn expired_deadline_runs_nothing() {
        let runner = SimulationRunner::new(config(&[epsilon_greedy()], 50, 100)).unwrap();
        let budget = RunBudget::with_timeout(Duration::ZERO);
        let report = runner.run(&budget).unwrap();
        assert!(report.cancelled);
        assert_eq!(report.completed_cycles, 0);
    }

    #[test]
    fn incomplete_cycles_are_discarded() {
        let runner = SimulationRunner::new(config(
            &[epsilon_greedy(), ("random", PolicyType::Random)],
            3,
            50,
        ))
        .unwrap();
        let outcomes = vec![
            Some(runner.run_cycle(0, 0).unwrap()),
            Some(runner.run_cycle(1, 0).unwrap()),
            Some(runner.run_cycle(0, 1).unwrap()),
            None,
            Some(runner.run_cycle(1, 2).unwrap()),
            Some(runner.run_cycle(0, 2).unwrap()),
        ];
        let mut collector = CycleCollector::new(2, 50);
        outcomes.into_iter().for_each(|outcome| collector.push(outcome));
        assert_eq!(collector.pending_cycles(), 1);
        let batch = collector.finish();
        assert!(batch.is_cancelled());
        assert_eq!(batch.completed_cycles(), 2);

        let report = runner.report(batch);
        report.results.values().for_each(|result| {
            let cycles: Vec<u64> = result.cycle_summaries.iter().map(|s| s.cycle).collect();
            assert_eq!(cycles, vec![0, 2]);
        });
    }

    #[test]
    fn collector_accepts_any_order() {
        let runner = SimulationRunner::new(config(
            &[epsilon_greedy(), ("random", PolicyType::Random)],
            4,
            50,
        ))
        .unwrap();
        let mut collector = CycleCollector::new(2, 50);
        for (policy_index, cycle) in [(1, 3), (0, 2), (1, 0), (0, 3), (1, 1), (0, 0), (1, 2), (0, 1)] {
            collector.push(Some(runner.run_cycle(policy_index, cycle).unwrap()));
        }
        assert_eq!(collector.pending_cycles(), 0);

        let batch = collector.finish();
        assert!(!batch.is_cancelled());
        assert_eq!(batch.completed_cycles(), 4);
        assert_eq!(
            runner.report(batch),
            runner.run(&RunBudget::unlimited()).unwrap()
        );
    }

    #[test]
    fn unseeded_run_records_seed() {
        let mut unseeded = config(&[epsilon_greedy()], 2, 10);
        unseeded.seed = None;
        let runner = SimulationRunner::new(unseeded).unwrap();
        let report = runner.run(&RunBudget::unlimited()).unwrap();
        assert_eq!(report.seed, runner.seed());

        let mut replay = config(&[epsilon_greedy()], 2, 10);
        replay.seed = Some(runner.seed());
        let replayed = SimulationRunner::new(replay)
            .unwrap()
            .run(&RunBudget::unlimited())
            .unwrap();
        assert_eq!(report, replayed);
    }
}
