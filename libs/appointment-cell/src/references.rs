use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use doctor_cell::{AppointmentReferences, DoctorError};
use patient_cell::{PatientError, PatientReferences};

use crate::models::AppointmentError;
use crate::store::AppointmentStore;

/// Answers the doctor and patient cells' deletion checks from the appointment store.
pub struct AppointmentReferenceCheck {
    store: Arc<dyn AppointmentStore>,
}

impl AppointmentReferenceCheck {
    pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
        Self { store }
    }
}

fn doctor_side(e: AppointmentError) -> DoctorError {
    match e {
        AppointmentError::Unavailable(msg) => DoctorError::Unavailable(msg),
        other => DoctorError::DatabaseError(other.to_string()),
    }
}

fn patient_side(e: AppointmentError) -> PatientError {
    match e {
        AppointmentError::Unavailable(msg) => PatientError::Unavailable(msg),
        other => PatientError::DatabaseError(other.to_string()),
    }
}

#[async_trait]
impl AppointmentReferences for AppointmentReferenceCheck {
    async fn slot_is_referenced(&self, slot_id: Uuid) -> Result<bool, DoctorError> {
        self.store.exists_for_slot(slot_id).await.map_err(doctor_side)
    }

    async fn doctor_is_referenced(&self, doctor_id: Uuid) -> Result<bool, DoctorError> {
        self.store.exists_for_doctor(doctor_id).await.map_err(doctor_side)
    }
}

#[async_trait]
impl PatientReferences for AppointmentReferenceCheck {
    async fn patient_is_referenced(&self, patient_id: Uuid) -> Result<bool, PatientError> {
        self.store.exists_for_patient(patient_id).await.map_err(patient_side)
    }
}
