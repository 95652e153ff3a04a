use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_database::{DbError, Transient};
use shared_models::error::AppError;
use shared_models::time::utc_seconds;
use shared_utils::validation::FieldValidator;

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_EMAIL_LEN: usize = 150;
pub const MAX_IMAGE_URL_LEN: usize = 255;

// ==============================================================================
// ENTITIES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Specialty {
    pub id: Uuid,
    pub name: String,
    #[serde(with = "utc_seconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "utc_seconds")]
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub specialty_id: Uuid,
    pub profile_image_url: Option<String>,
    pub biography: Option<String>,
    #[serde(with = "utc_seconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "utc_seconds")]
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<String>,
}

impl Doctor {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A fixed interval offered by one doctor. `reserved` is only ever flipped by
/// the store's `reserve`/`release` operations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilitySlot {
    pub id: Uuid,
    pub doctor_id: Uuid,
    #[serde(with = "utc_seconds")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "utc_seconds")]
    pub end_time: DateTime<Utc>,
    pub reserved: bool,
    #[serde(with = "utc_seconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "utc_seconds")]
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<String>,
}

impl AvailabilitySlot {
    /// Half-open interval overlap.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start < self.end_time && end > self.start_time
    }
}

// ==============================================================================
// REQUESTS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecialtyRequest {
    pub name: String,
}

/// Body for both create and full update of a doctor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub specialty_id: Uuid,
    pub profile_image_url: Option<String>,
    pub biography: Option<String>,
}

impl SpecialtyRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        FieldValidator::new()
            .not_blank("name", &self.name)
            .max_len("name", &self.name, MAX_NAME_LEN)
            .finish()
    }
}

impl DoctorRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        FieldValidator::new()
            .not_blank("firstName", &self.first_name)
            .max_len("firstName", &self.first_name, MAX_NAME_LEN)
            .not_blank("lastName", &self.last_name)
            .max_len("lastName", &self.last_name, MAX_NAME_LEN)
            .not_blank("email", &self.email)
            .max_len("email", &self.email, MAX_EMAIL_LEN)
            .email("email", &self.email)
            .max_len_opt("profileImageUrl", self.profile_image_url.as_deref(), MAX_IMAGE_URL_LEN)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSlotRequest {
    pub doctor_id: Option<Uuid>,
    #[serde(with = "utc_seconds")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "utc_seconds")]
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotRangeQuery {
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorListQuery {
    pub specialty_id: Option<Uuid>,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Specialty not found")]
    SpecialtyNotFound,

    /// Missing or already reserved; callers cannot tell which.
    #[error("Availability slot not found or not available")]
    SlotNotFound,

    #[error("Slot start time must be before its end time")]
    InvalidInterval,

    #[error("Slot overlaps an existing slot of this doctor")]
    SlotOverlap,

    #[error("Slot is already reserved")]
    SlotAlreadyReserved,

    #[error("Slot is not reserved")]
    SlotNotReserved,

    #[error("Reserved slots cannot be deleted")]
    SlotReserved,

    #[error("Slot is referenced by an appointment")]
    SlotInUse,

    #[error("Doctor still has availability slots or appointments")]
    DoctorInUse,

    #[error("Specialty is still assigned to doctors")]
    SpecialtyInUse,

    #[error("A doctor with email {0} already exists")]
    DuplicateEmail(String),

    #[error("A specialty named {0} already exists")]
    DuplicateSpecialty(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<DbError> for DoctorError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::Unavailable(msg) => DoctorError::Unavailable(msg),
            other => DoctorError::DatabaseError(other.to_string()),
        }
    }
}

impl Transient for DoctorError {
    fn is_transient(&self) -> bool {
        matches!(self, DoctorError::Unavailable(_))
    }
}

impl From<DoctorError> for AppError {
    fn from(e: DoctorError) -> Self {
        match e {
            DoctorError::NotFound
            | DoctorError::SpecialtyNotFound
            | DoctorError::SlotNotFound => AppError::NotFound(e.to_string()),
            DoctorError::InvalidInterval
            | DoctorError::SlotOverlap
            | DoctorError::SlotReserved
            | DoctorError::ValidationError(_) => AppError::BadRequest(e.to_string()),
            DoctorError::SlotAlreadyReserved
            | DoctorError::SlotNotReserved
            | DoctorError::SlotInUse
            | DoctorError::DoctorInUse
            | DoctorError::SpecialtyInUse
            | DoctorError::DuplicateEmail(_)
            | DoctorError::DuplicateSpecialty(_) => AppError::Conflict(e.to_string()),
            DoctorError::Unavailable(msg) | DoctorError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
