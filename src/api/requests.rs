use crate::simulation::SimulationConfig;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(super) struct SimulationRequest {
    #[serde(flatten)]
    pub config: SimulationConfig,
    /// Stop dispatching new cycles after this many seconds.
    #[serde(default)]
    pub deadline_seconds: Option<u64>,
}
