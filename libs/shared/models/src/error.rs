use std::collections::BTreeMap;

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Field name -> human readable problem.
pub type FieldErrors = BTreeMap<String, String>;

pub const CANCELLATION_WINDOW_CLOSED: &str = "APPOINTMENT_CANCELLATION_WINDOW_CLOSED";

const GENERIC_INTERNAL_MESSAGE: &str = "An unexpected error occurred.";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Forbidden ({code}): {message}")]
    Forbidden {
        code: String,
        message: String,
        details: FieldErrors,
    },

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0:?}")]
    ValidationError(FieldErrors),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("External service error: {0}")]
    ExternalService(String),
}

impl AppError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), message.into());
        AppError::ValidationError(errors)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::AccessDenied(_) | AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) | AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ExternalService(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn code(&self) -> &str {
        match self {
            AppError::Auth(_) => "UNAUTHENTICATED",
            AppError::AccessDenied(_) => "ACCESS_DENIED",
            AppError::Forbidden { code, .. } => code,
            AppError::NotFound(_) => "RESOURCE_NOT_FOUND",
            AppError::BadRequest(_) => "INVALID_REQUEST",
            AppError::ValidationError(_) => "VALIDATION_FAILED",
            AppError::Conflict(_) => "BUSINESS_CONFLICT",
            AppError::Internal(_) | AppError::Database(_) => "INTERNAL_SERVER_ERROR",
            AppError::ExternalService(_) => "EXTERNAL_SERVICE_ERROR",
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        let (message, field_errors) = match self {
            AppError::Auth(msg)
            | AppError::AccessDenied(msg)
            | AppError::NotFound(msg)
            | AppError::BadRequest(msg)
            | AppError::Conflict(msg)
            | AppError::ExternalService(msg) => (msg.clone(), None),
            AppError::Forbidden { message, details, .. } => {
                let details = (!details.is_empty()).then(|| details.clone());
                (message.clone(), details)
            }
            AppError::ValidationError(errors) => {
                ("Request validation failed".to_string(), Some(errors.clone()))
            }
            AppError::Internal(_) | AppError::Database(_) => {
                (GENERIC_INTERNAL_MESSAGE.to_string(), None)
            }
        };

        ErrorBody {
            code: self.code().to_string(),
            message,
            field_errors,
            timestamp: Utc::now(),
            http_status: self.status().as_u16(),
        }
    }
}

/// Wire shape shared by every failing endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub field_errors: Option<FieldErrors>,
    #[serde(with = "crate::time::utc_seconds")]
    pub timestamp: DateTime<Utc>,
    pub http_status: u16,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!("Error: {}: {}", status, self);
        } else {
            tracing::debug!("Request failed: {}: {}", status, self);
        }

        (status, Json(self.to_body())).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}
