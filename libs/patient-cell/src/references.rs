use async_trait::async_trait;
use uuid::Uuid;

use crate::models::PatientError;

/// Asked before a patient is deleted; backed by the appointment store.
#[async_trait]
pub trait PatientReferences: Send + Sync {
    async fn patient_is_referenced(&self, patient_id: Uuid) -> Result<bool, PatientError>;
}

pub struct NoPatientAppointments;

#[async_trait]
impl PatientReferences for NoPatientAppointments {
    async fn patient_is_referenced(&self, _patient_id: Uuid) -> Result<bool, PatientError> {
        Ok(false)
    }
}
