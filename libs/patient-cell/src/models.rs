use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_database::{DbError, Transient};
use shared_models::error::AppError;
use shared_models::time::utc_seconds;
use shared_utils::validation::FieldValidator;

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_EMAIL_LEN: usize = 150;
pub const MAX_PHONE_LEN: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    #[serde(with = "utc_seconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "utc_seconds")]
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<String>,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Body for both registration and full update.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
}

impl PatientRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        FieldValidator::new()
            .not_blank("firstName", &self.first_name)
            .max_len("firstName", &self.first_name, MAX_NAME_LEN)
            .not_blank("lastName", &self.last_name)
            .max_len("lastName", &self.last_name, MAX_NAME_LEN)
            .not_blank("email", &self.email)
            .max_len("email", &self.email, MAX_EMAIL_LEN)
            .email("email", &self.email)
            .max_len_opt("phone", self.phone.as_deref(), MAX_PHONE_LEN)
            .phone_opt("phone", self.phone.as_deref())
            .finish()
    }

    /// Blank phone numbers are stored as absent.
    pub fn normalized_phone(&self) -> Option<String> {
        self.phone
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientListQuery {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum PatientError {
    #[error("Patient not found")]
    NotFound,

    #[error("A patient with email {0} already exists")]
    DuplicateEmail(String),

    #[error("Patient still has appointments")]
    PatientInUse,

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<DbError> for PatientError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::Unavailable(msg) => PatientError::Unavailable(msg),
            other => PatientError::DatabaseError(other.to_string()),
        }
    }
}

impl Transient for PatientError {
    fn is_transient(&self) -> bool {
        matches!(self, PatientError::Unavailable(_))
    }
}

impl From<PatientError> for AppError {
    fn from(e: PatientError) -> Self {
        match e {
            PatientError::NotFound => AppError::NotFound(e.to_string()),
            PatientError::DuplicateEmail(_) | PatientError::PatientInUse => AppError::Conflict(e.to_string()),
            PatientError::Unavailable(msg) | PatientError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
