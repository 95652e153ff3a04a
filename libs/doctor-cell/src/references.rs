use async_trait::async_trait;
use uuid::Uuid;

use crate::models::DoctorError;

/// Lets deletions ask whether any appointment still points at a doctor or slot.
/// Implemented on top of the appointment store.
#[async_trait]
pub trait AppointmentReferences: Send + Sync {
    async fn slot_is_referenced(&self, slot_id: Uuid) -> Result<bool, DoctorError>;
    async fn doctor_is_referenced(&self, doctor_id: Uuid) -> Result<bool, DoctorError>;
}

/// For wiring the cell on its own, before any appointment exists.
pub struct NoAppointments;

#[async_trait]
impl AppointmentReferences for NoAppointments {
    async fn slot_is_referenced(&self, _slot_id: Uuid) -> Result<bool, DoctorError> {
        Ok(false)
    }

    async fn doctor_is_referenced(&self, _doctor_id: Uuid) -> Result<bool, DoctorError> {
        Ok(false)
    }
}
