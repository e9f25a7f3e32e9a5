use crate::simulation::{CurveRow, CycleRow, PolicySummary};

use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct SimulationSummary {
    pub simulation_id: Uuid,
    pub seed: u64,
    pub completed_cycles: u64,
    pub cancelled: bool,
    pub policies: Vec<PolicySummary>,
}

#[derive(Debug, Serialize)]
pub struct ListSimulationsResponse {
    pub simulations: Vec<ListedSimulation>,
}

#[derive(Debug, Serialize)]
pub struct ListedSimulation {
    pub simulation_id: Uuid,
    pub policies: Vec<PolicySummary>,
}

#[derive(Debug, Serialize)]
pub struct CycleRowsResponse {
    pub simulation_id: Uuid,
    pub rows: Vec<CycleRow>,
}

#[derive(Debug, Serialize)]
pub struct CurveRowsResponse {
    pub simulation_id: Uuid,
    pub rows: Vec<CurveRow>,
}

#[derive(Debug, Serialize)]
pub struct RunningSimulationsResponse {
    pub simulation_ids: Vec<Uuid>,
}
