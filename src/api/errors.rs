use crate::errors::{ServiceError, SimulationError};

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiResponseError {
    #[error("Server Internal Error")]
    InternalError,
    #[error(transparent)]
    ErrorBadRequest(SimulationError),
    #[error("Simulation {0} not found")]
    ErrorNotFound(uuid::Uuid),
    #[error(transparent)]
    ErrorBadUuid(#[from] uuid::Error),
}

impl From<ServiceError> for ApiResponseError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::SimulationNotFound(id) => Self::ErrorNotFound(id),
            ServiceError::Simulation(err) => Self::ErrorBadRequest(err),
            ServiceError::Mailbox { .. } => {
                tracing::error!(error = %err, "Actor mailbox failure");
                Self::InternalError
            }
        }
    }
}

impl ResponseError for ApiResponseError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }

    fn status_code(&self) -> StatusCode {
        match *self {
            ApiResponseError::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            ApiResponseError::ErrorBadRequest(_) => StatusCode::BAD_REQUEST,
            ApiResponseError::ErrorNotFound(_) => StatusCode::NOT_FOUND,
            ApiResponseError::ErrorBadUuid(_) => StatusCode::BAD_REQUEST,
        }
    }
}
