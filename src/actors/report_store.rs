use crate::config::ReportStoreConfig;
use crate::errors::PersistenceError;
use crate::simulation::SimulationReport;

use actix::prelude::*;
use std::{collections::HashMap, fs::File, io::BufReader, time::Duration};
use tracing::{info, warn};
use uuid::Uuid;

/// Keeps finished reports and writes them to a JSON file on an interval.
pub struct ReportStore {
    storage: HashMap<Uuid, SimulationReport>,
    config: ReportStoreConfig,
    dirty: bool,
}

impl ReportStore {
    pub fn new(config: ReportStoreConfig) -> Self {
        let storage = File::open(&config.path)
            .map(|file| {
                let reader = BufReader::new(file);
                serde_json::from_reader(reader).unwrap_or_default()
            })
            .unwrap_or_default();

        Self {
            storage,
            config,
            dirty: false,
        }
    }

    /// Never shorter than a second, so a zero setting cannot spin the actor.
    fn persist_interval(&self) -> Duration {
        Duration::from_secs(self.config.persist_every.max(1))
    }

    fn persist(&mut self) -> Result<(), PersistenceError> {
        if !self.dirty {
            return Ok(());
        }

        info!(
            path = ?self.config.path,
            num_reports = self.storage.len(),
            "Persisting simulation reports"
        );

        let serialized = serde_json::to_string(&self.storage)?;
        std::fs::write(&self.config.path, serialized)?;
        self.dirty = false;
        Ok(())
    }
}

impl Actor for ReportStore {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!("Starting simulation ReportStore actor");
        ctx.run_interval(self.persist_interval(), |report_store, _| {
            if let Err(err) = report_store.persist() {
                warn!(error = %err, "Failed to persist report store");
            }
        });
    }

    fn stopped(&mut self, _: &mut Self::Context) {
        if let Err(err) = self.persist() {
            warn!(error = %err, "Failed to persist report store on shutdown");
        }
    }
}

// Messages
#[derive(Message)]
#[rtype(result = "()")]
pub struct SaveReport {
    pub simulation_id: Uuid,
    pub report: SimulationReport,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct DeleteReport {
    pub simulation_id: Uuid,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct ClearReports;

#[derive(Message)]
#[rtype(result = "Result<(), PersistenceError>")]
pub struct Flush;

#[derive(Message)]
#[rtype(result = "HashMap<Uuid, SimulationReport>")]
pub struct LoadAllReports;

// Handlers
impl Handler<SaveReport> for ReportStore {
    type Result = ();

    fn handle(&mut self, msg: SaveReport, _: &mut Self::Context) -> Self::Result {
        self.storage.insert(msg.simulation_id, msg.report);
        self.dirty = true;
    }
}

impl Handler<DeleteReport> for ReportStore {
    type Result = ();

    fn handle(&mut self, msg: DeleteReport, _: &mut Self::Context) -> Self::Result {
        if self.storage.remove(&msg.simulation_id).is_some() {
            self.dirty = true;
        }
    }
}

impl Handler<ClearReports> for ReportStore {
    type Result = ();

    fn handle(&mut self, _: ClearReports, _: &mut Self::Context) -> Self::Result {
        self.storage.clear();
        self.dirty = true;
    }
}

impl Handler<Flush> for ReportStore {
    type Result = Result<(), PersistenceError>;

    fn handle(&mut self, _: Flush, _: &mut Self::Context) -> Self::Result {
        self.persist()
    }
}

impl Handler<LoadAllReports> for ReportStore {
    type Result = MessageResult<LoadAllReports>;

    fn handle(&mut self, _: LoadAllReports, _: &mut Self::Context) -> Self::Result {
        MessageResult(self.storage.clone())
    }
}
