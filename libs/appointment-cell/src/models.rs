use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use doctor_cell::DoctorError;
use patient_cell::PatientError;
use shared_database::{DbError, Transient};
use shared_models::auth::User;
use shared_models::error::{AppError, FieldErrors, CANCELLATION_WINDOW_CLOSED};
use shared_models::time::{utc_seconds, utc_seconds_option};
use shared_utils::validation::FieldValidator;

pub const MAX_REASON_LEN: usize = 500;

/// Minimum notice, in whole hours, for a patient-side cancellation.
pub const CANCELLATION_NOTICE_HOURS: i64 = 24;

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Confirmed,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Confirmed => "CONFIRMED",
            AppointmentStatus::Cancelled => "CANCELLED",
            AppointmentStatus::Completed => "COMPLETED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Cancelled | AppointmentStatus::Completed)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A booking of exactly one slot. `start_time`/`end_time` mirror the slot,
/// which can no longer change once an appointment refers to it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub slot_id: Uuid,
    pub reason: Option<String>,
    pub status: AppointmentStatus,
    #[serde(with = "utc_seconds")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "utc_seconds")]
    pub end_time: DateTime<Utc>,
    #[serde(with = "utc_seconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "utc_seconds")]
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<String>,
}

impl Appointment {
    /// The booked patient or the attending doctor.
    pub fn involves_user(&self, user: &User) -> bool {
        user.is(self.patient_id) || user.is(self.doctor_id)
    }
}

// ==============================================================================
// REQUESTS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentRequest {
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub slot_id: Uuid,
    pub reason: Option<String>,
}

impl CreateAppointmentRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        FieldValidator::new()
            .max_len_opt("reason", self.reason.as_deref(), MAX_REASON_LEN)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAppointmentStatusRequest {
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentListQuery {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgendaQuery {
    #[serde(with = "utc_seconds")]
    pub start: DateTime<Utc>,
    #[serde(with = "utc_seconds")]
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportQuery {
    pub patient_id: Uuid,
}

// ==============================================================================
// REPORT JOBS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportJob {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub status: ReportStatus,
    pub file_path: Option<String>,
    pub error: Option<String>,
    #[serde(with = "utc_seconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "utc_seconds_option")]
    pub finished_at: Option<DateTime<Utc>>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Patient not found")]
    PatientNotFound,

    /// Missing and already reserved slots are reported the same way.
    #[error("Availability slot not found or not available")]
    SlotNotAvailable,

    #[error("The slot does not belong to the specified doctor")]
    SlotDoctorMismatch,

    #[error("The slot has already been booked")]
    SlotAlreadyBooked,

    #[error("Slot state changed concurrently: {0}")]
    SlotStateConflict(String),

    #[error("Appointment already cancelled")]
    AlreadyCancelled,

    #[error("Appointment already completed")]
    AlreadyCompleted,

    #[error("Appointments can only be cancelled at least 24 hours in advance")]
    CancellationWindowClosed { remaining_hours: i64 },

    #[error("Status {0} cannot be requested through this endpoint")]
    UnsupportedStatus(AppointmentStatus),

    #[error("Cannot move an appointment from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Report job not found")]
    ReportNotFound,

    #[error("Report generation failed: {0}")]
    ReportFailed(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<DbError> for AppointmentError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::Unavailable(msg) => AppointmentError::Unavailable(msg),
            other => AppointmentError::DatabaseError(other.to_string()),
        }
    }
}

impl From<DoctorError> for AppointmentError {
    fn from(e: DoctorError) -> Self {
        match e {
            DoctorError::NotFound => AppointmentError::DoctorNotFound,
            DoctorError::SlotNotFound => AppointmentError::SlotNotAvailable,
            DoctorError::SlotAlreadyReserved => AppointmentError::SlotAlreadyBooked,
            DoctorError::SlotNotReserved => AppointmentError::SlotStateConflict(e.to_string()),
            DoctorError::ValidationError(msg) => AppointmentError::ValidationError(msg),
            DoctorError::Unavailable(msg) => AppointmentError::Unavailable(msg),
            other => AppointmentError::DatabaseError(other.to_string()),
        }
    }
}

impl From<PatientError> for AppointmentError {
    fn from(e: PatientError) -> Self {
        match e {
            PatientError::NotFound => AppointmentError::PatientNotFound,
            PatientError::Unavailable(msg) => AppointmentError::Unavailable(msg),
            other => AppointmentError::DatabaseError(other.to_string()),
        }
    }
}

impl Transient for AppointmentError {
    fn is_transient(&self) -> bool {
        matches!(self, AppointmentError::Unavailable(_))
    }
}

impl From<AppointmentError> for AppError {
    fn from(e: AppointmentError) -> Self {
        match e {
            AppointmentError::NotFound
            | AppointmentError::DoctorNotFound
            | AppointmentError::PatientNotFound
            | AppointmentError::SlotNotAvailable
            | AppointmentError::ReportNotFound => AppError::NotFound(e.to_string()),
            AppointmentError::SlotDoctorMismatch
            | AppointmentError::SlotAlreadyBooked
            | AppointmentError::SlotStateConflict(_) => AppError::Conflict(e.to_string()),
            AppointmentError::AlreadyCancelled
            | AppointmentError::AlreadyCompleted
            | AppointmentError::UnsupportedStatus(_)
            | AppointmentError::InvalidTransition { .. }
            | AppointmentError::ValidationError(_) => AppError::BadRequest(e.to_string()),
            AppointmentError::CancellationWindowClosed { remaining_hours } => {
                let mut details = FieldErrors::new();
                details.insert("remainingHours".to_string(), remaining_hours.to_string());
                AppError::Forbidden {
                    code: CANCELLATION_WINDOW_CLOSED.to_string(),
                    message: e.to_string(),
                    details,
                }
            }
            AppointmentError::ReportFailed(msg) => AppError::Internal(msg),
            AppointmentError::Unavailable(msg) | AppointmentError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
