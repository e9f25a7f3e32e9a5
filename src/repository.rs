use crate::actors::cycle_worker::{run_parallel, CycleWorker};
use crate::actors::report_store::{ClearReports, DeleteReport, LoadAllReports, ReportStore, SaveReport};
use crate::config::RunnerConfig;
use crate::errors::{ServiceError, SimulationError};
use crate::simulation::{PolicySummary, RunBudget, SimulationConfig, SimulationReport, SimulationRunner};

use actix::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

/// A validated simulation detached from the repository. Owns everything the
/// run needs, so no repository lock is held while it runs.
pub struct SimulationJob {
    simulation_id: Uuid,
    workers: Addr<CycleWorker>,
    runner: Arc<SimulationRunner>,
    budget: RunBudget,
    in_flight: usize,
}

impl SimulationJob {
    pub fn simulation_id(&self) -> Uuid {
        self.simulation_id
    }

    pub async fn run(self) -> Result<SimulationReport, ServiceError> {
        run_parallel(&self.workers, self.runner, self.budget, self.in_flight).await
    }
}

pub struct Repository {
    reports: HashMap<Uuid, SimulationReport>,
    running: HashMap<Uuid, RunBudget>,
    workers: Addr<CycleWorker>,
    report_store: Addr<ReportStore>,
    config: RunnerConfig,
}

impl Repository {
    pub fn new(
        config: RunnerConfig,
        workers: Addr<CycleWorker>,
        report_store: Addr<ReportStore>,
    ) -> Self {
        Self {
            reports: HashMap::new(),
            running: HashMap::new(),
            workers,
            report_store,
            config,
        }
    }

    pub async fn load_reports(&mut self) -> Result<(), ServiceError> {
        let reports = self
            .report_store
            .send(LoadAllReports)
            .await
            .map_err(|err| ServiceError::Mailbox {
                actor: "ReportStore",
                source: err,
            })?;

        info!(num_reports = %reports.len(), "Loaded simulation reports");
        self.reports.extend(reports);
        Ok(())
    }

    fn check_limits(&self, config: &SimulationConfig) -> Result<(), SimulationError> {
        if config.num_cycles > self.config.max_cycles {
            return Err(SimulationError::InvalidConfig(format!(
                "num_cycles {} exceeds the limit of {}",
                config.num_cycles, self.config.max_cycles
            )));
        }
        if config.num_pulls > self.config.max_pulls {
            return Err(SimulationError::InvalidConfig(format!(
                "num_pulls {} exceeds the limit of {}",
                config.num_pulls, self.config.max_pulls
            )));
        }
        let num_arms = config.arm_set.num_arms();
        if num_arms > self.config.max_arms {
            return Err(SimulationError::InvalidConfig(format!(
                "{num_arms} arms exceeds the limit of {}",
                self.config.max_arms
            )));
        }
        Ok(())
    }

    /// Budget from the tighter of the requested and configured deadlines.
    fn budget(&self, deadline_seconds: Option<u64>) -> RunBudget {
        let deadline = match (deadline_seconds, self.config.deadline_seconds) {
            (Some(requested), Some(limit)) => Some(requested.min(limit)),
            (requested, limit) => requested.or(limit),
        };

        deadline
            .map(|seconds| RunBudget::with_timeout(Duration::from_secs(seconds)))
            .unwrap_or_else(RunBudget::unlimited)
    }

    /// Validates `config` and registers the run as cancellable.
    pub fn start_simulation(
        &mut self,
        config: SimulationConfig,
        deadline_seconds: Option<u64>,
    ) -> Result<SimulationJob, ServiceError> {
        self.check_limits(&config)?;
        let runner = Arc::new(SimulationRunner::new(config)?);
        let simulation_id = Uuid::new_v4();
        let budget = self.budget(deadline_seconds);
        self.running.insert(simulation_id, budget.clone());

        info!(id = %simulation_id, seed = runner.seed(), "Started simulation");
        Ok(SimulationJob {
            simulation_id,
            workers: self.workers.clone(),
            runner,
            budget,
            in_flight: self.config.workers.max(1) * 2,
        })
    }

    /// Unregisters a run and stores its report when it succeeded.
    pub fn finish_simulation(
        &mut self,
        simulation_id: Uuid,
        result: Result<SimulationReport, ServiceError>,
    ) -> Result<&SimulationReport, ServiceError> {
        self.running.remove(&simulation_id);
        let report = result?;

        self.report_store.do_send(SaveReport {
            simulation_id,
            report: report.clone(),
        });
        info!(id = %simulation_id, "Stored simulation report");
        Ok(self.reports.entry(simulation_id).or_insert(report))
    }

    /// Stops dispatching new cycles of a running simulation. Cycles already
    /// completed by every policy are kept in its report.
    pub fn cancel_simulation(&self, simulation_id: Uuid) -> Result<(), ServiceError> {
        self.running
            .get(&simulation_id)
            .ok_or(ServiceError::SimulationNotFound(simulation_id))?
            .cancel();

        info!(id = %simulation_id, "Cancelled simulation");
        Ok(())
    }

    pub fn running_simulations(&self) -> impl Iterator<Item = &Uuid> {
        self.running.keys()
    }

    pub fn list_reports(&self) -> impl Iterator<Item = (&Uuid, Vec<PolicySummary>)> {
        self.reports.iter().map(|(id, report)| (id, report.summary()))
    }

    pub fn get_report(&self, simulation_id: Uuid) -> Result<&SimulationReport, ServiceError> {
        self.reports
            .get(&simulation_id)
            .ok_or(ServiceError::SimulationNotFound(simulation_id))
    }

    pub fn delete_report(&mut self, simulation_id: Uuid) -> Result<(), ServiceError> {
        self.reports
            .remove(&simulation_id)
            .ok_or(ServiceError::SimulationNotFound(simulation_id))?;
        self.report_store.do_send(DeleteReport { simulation_id });
        Ok(())
    }

    pub fn clear(&mut self) {
        self.reports.clear();
        self.report_store.do_send(ClearReports);
    }
}
