//! Application error type mapping to HTTP status codes and envelope format.

use std::time::Instant;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use credsync_types::error::{SchedulerError, VaultError};

use crate::http::response::ApiResponse;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    Vault(VaultError),
    Scheduler(SchedulerError),
    /// Path segment that names no credential type.
    UnknownCredentialType(String),
    /// Request body failed schema or field validation.
    Validation(String),
}

impl From<VaultError> for AppError {
    fn from(e: VaultError) -> Self {
        AppError::Vault(e)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<SchedulerError> for AppError {
    fn from(e: SchedulerError) -> Self {
        AppError::Scheduler(e)
    }
}

impl AppError {
    /// HTTP status, stable code and message for this error.
    pub fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Vault(e) => {
                let status = match e {
                    VaultError::MissingTenant => StatusCode::UNAUTHORIZED,
                    VaultError::NotFound => StatusCode::NOT_FOUND,
                    VaultError::Expired => StatusCode::GONE,
                    VaultError::InvalidExpiry => StatusCode::BAD_REQUEST,
                    VaultError::Oversize { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                    VaultError::Tampered
                    | VaultError::Encrypt(_)
                    | VaultError::Persist(_)
                    | VaultError::Decode(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.code(), e.to_string())
            }
            AppError::Scheduler(e) => {
                let (status, code) = match e {
                    SchedulerError::NotRegistered(_) => (StatusCode::NOT_FOUND, "JOB_NOT_FOUND"),
                    SchedulerError::Duplicate(_) => (StatusCode::CONFLICT, "JOB_DUPLICATE"),
                    SchedulerError::InvalidInterval(_) => {
                        (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
                    }
                    SchedulerError::AlreadyStarted => (StatusCode::CONFLICT, "SCHEDULER_STARTED"),
                };
                (status, code, e.to_string())
            }
            AppError::UnknownCredentialType(slug) => (
                StatusCode::BAD_REQUEST,
                "UNKNOWN_CREDENTIAL_TYPE",
                format!("Unknown credential type '{slug}'"),
            ),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if status.is_server_error() {
            tracing::error!(code, error = %message, "request failed");
        }
        (status, Json(ApiResponse::error(code, &message, Instant::now()))).into_response()
    }
}
