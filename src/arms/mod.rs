pub mod arm_set;
pub mod reward;

pub use arm_set::{Arm, ArmSet, ArmSetSpec};
pub use reward::RewardModel;
