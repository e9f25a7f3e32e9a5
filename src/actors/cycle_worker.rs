use crate::errors::{ServiceError, SimulationError};
use crate::simulation::{
    CycleCollector, CycleOutcome, RunBudget, SimulationReport, SimulationRunner,
};

use actix::prelude::*;
use futures_util::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info};

/// Runs (policy, cycle) units on a dedicated thread of a `SyncArbiter`.
pub struct CycleWorker;

impl Actor for CycleWorker {
    type Context = SyncContext<Self>;

    fn started(&mut self, _: &mut Self::Context) {
        debug!("Starting cycle worker");
    }
}

// Messages
#[derive(Message)]
#[rtype(result = "Result<Option<CycleOutcome>, SimulationError>")]
pub struct RunCycle {
    pub runner: Arc<SimulationRunner>,
    pub policy_index: usize,
    pub cycle: u64,
    pub budget: RunBudget,
}

impl Handler<RunCycle> for CycleWorker {
    type Result = Result<Option<CycleOutcome>, SimulationError>;

    fn handle(&mut self, msg: RunCycle, _: &mut Self::Context) -> Self::Result {
        if msg.budget.is_exhausted() {
            return Ok(None);
        }
        msg.runner.run_cycle(msg.policy_index, msg.cycle).map(Some)
    }
}

/// Dispatches every unit of `runner` to the worker pool, at most `in_flight`
/// at a time, and folds outcomes as they come back. Units are queued cycle by
/// cycle so a deadline cuts late cycles.
pub async fn run_parallel(
    workers: &Addr<CycleWorker>,
    runner: Arc<SimulationRunner>,
    budget: RunBudget,
    in_flight: usize,
) -> Result<SimulationReport, ServiceError> {
    info!(
        seed = runner.seed(),
        policies = runner.num_policies(),
        cycles = runner.num_cycles(),
        pulls = runner.num_pulls(),
        in_flight,
        "Dispatching simulation to workers"
    );

    let units = (0..runner.num_cycles()).flat_map(|cycle| {
        (0..runner.num_policies()).map(move |policy_index| (policy_index, cycle))
    });
    let mut results = stream::iter(units)
        .map(|(policy_index, cycle)| {
            workers.send(RunCycle {
                runner: runner.clone(),
                policy_index,
                cycle,
                budget: budget.clone(),
            })
        })
        .buffer_unordered(in_flight.max(1));

    let mut collector = CycleCollector::new(runner.num_policies(), runner.num_pulls());
    while let Some(result) = results.next().await {
        let outcome = result.map_err(|err| ServiceError::Mailbox {
            actor: "CycleWorker",
            source: err,
        })??;
        collector.push(outcome);
    }

    Ok(runner.report(collector.finish()))
}
