use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;

use crate::state::{CreateSessionError, JoinError};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Session id failed syntactic validation.
    #[error("invalid session id: {0}")]
    InvalidId(String),
    /// Player name failed syntactic validation.
    #[error("invalid player name: {0}")]
    InvalidName(String),
    /// Requested session does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// A session with the requested id already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),
    /// The player name is already registered in the session.
    #[error("name taken: {0}")]
    NameTaken(String),
}

impl From<CreateSessionError> for ServiceError {
    fn from(err: CreateSessionError) -> Self {
        match err {
            CreateSessionError::AlreadyExists(sid) => {
                ServiceError::AlreadyExists(format!("session `{sid}` already exists"))
            }
        }
    }
}

impl From<JoinError> for ServiceError {
    fn from(err: JoinError) -> Self {
        match err {
            JoinError::NameTaken(name) => {
                ServiceError::NameTaken(format!("name `{name}` is already taken"))
            }
        }
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InvalidId(message) | ServiceError::InvalidName(message) => {
                AppError::BadRequest(message)
            }
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::AlreadyExists(message) | ServiceError::NameTaken(message) => {
                AppError::Conflict(message)
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
