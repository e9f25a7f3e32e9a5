pub mod epsilon_greedy;
pub mod errors;
pub mod interval;
mod policy;
pub mod random;
pub mod softmax;
pub mod state;
pub mod ucb;

pub use policy::{ConfiguredPolicy, Policy, PolicySpec, PolicyType};
pub use softmax::TemperatureSchedule;
pub use state::{ArmStats, PolicyState, PolicyStats};
