use crate::policies::errors::PolicyError;

use actix::MailboxError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Invalid reward parameter: {0}")]
    InvalidParameter(String),
    #[error("Invalid arm set: {0}")]
    InvalidArmSet(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Policy(#[from] PolicyError),
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Simulation {0} not found")]
    SimulationNotFound(Uuid),
    #[error(transparent)]
    Simulation(#[from] SimulationError),
    #[error("Actor {actor} mailbox error: {source}")]
    Mailbox {
        actor: &'static str,
        #[source]
        source: MailboxError,
    },
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error while writing reports: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize reports to JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}
