use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use arena_core::intake::IntakeError;
use arena_core::registration::RegistrationError;
use arena_core::store::StoreError;
use arena_core::tournament::TournamentError;

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    Conflict(String),
    Unavailable(String),
    Internal(String),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest(m)
            | Self::Unauthorized(m)
            | Self::NotFound(m)
            | Self::Conflict(m)
            | Self::Unavailable(m)
            | Self::Internal(m) => write!(f, "{m}"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            Self::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m.clone()),
            Self::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            Self::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
            Self::Unavailable(m) => (StatusCode::SERVICE_UNAVAILABLE, m.clone()),
            Self::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m.clone()),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unconfigured(_) => Self::Unavailable(err.to_string()),
            StoreError::NotFound(_) => Self::NotFound(err.to_string()),
            StoreError::InvalidRange(_) | StoreError::Backend(_) => {
                tracing::error!(error = %err, "store failure");
                Self::Internal("store request failed".to_string())
            },
        }
    }
}

impl From<IntakeError> for AppError {
    fn from(err: IntakeError) -> Self {
        match err {
            IntakeError::UnknownTeam { .. } => Self::NotFound(err.to_string()),
            _ => Self::BadRequest(err.to_string()),
        }
    }
}

impl From<RegistrationError> for AppError {
    fn from(err: RegistrationError) -> Self {
        match err {
            RegistrationError::Invalid { .. } => Self::BadRequest(err.to_string()),
            RegistrationError::DuplicateName { .. } => Self::Conflict(err.to_string()),
        }
    }
}

impl From<TournamentError> for AppError {
    fn from(err: TournamentError) -> Self {
        match err {
            TournamentError::Store(e) => e.into(),
            TournamentError::Intake(e) => e.into(),
            TournamentError::Registration(e) => e.into(),
        }
    }
}
