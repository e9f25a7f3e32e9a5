pub mod results;
pub mod runner;
pub mod seeding;
pub mod trial;

pub use results::{AggregateResult, CurveRow, CycleOutcome, CycleRow, PolicySummary, SimulationReport};
pub use runner::{CycleCollector, RunBudget, SimulationConfig, SimulationRunner};
pub use trial::{PullRecord, Trial, TrialResult};
