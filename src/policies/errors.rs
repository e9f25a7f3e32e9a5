use thiserror::Error;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("Arm {0} not found")]
    ArmNotFound(usize),
}
