use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_models::auth::Actor;
use shared_models::pagination::{Page, PageRequest};

use crate::models::{Patient, PatientError, PatientRequest};
use crate::references::PatientReferences;
use crate::state::PatientCellState;
use crate::store::PatientStore;

#[derive(Clone)]
pub struct PatientService {
    store: Arc<dyn PatientStore>,
    appointments: Arc<dyn PatientReferences>,
}

impl PatientService {
    pub fn new(state: &PatientCellState) -> Self {
        Self {
            store: Arc::clone(&state.store),
            appointments: Arc::clone(&state.appointments),
        }
    }

    /// Get a patient by id
    pub async fn get_patient(&self, patient_id: Uuid) -> Result<Patient, PatientError> {
        debug!("Fetching patient profile: {}", patient_id);
        self.store
            .find_by_id(patient_id)
            .await?
            .ok_or(PatientError::NotFound)
    }

    pub async fn list_patients(&self, page: PageRequest) -> Result<Page<Patient>, PatientError> {
        self.store.list(page).await
    }

    /// Register a new patient; the email must not be in use
    pub async fn create_patient(&self, request: PatientRequest, actor: &Actor) -> Result<Patient, PatientError> {
        debug!("Creating new patient profile for: {}", request.email);

        let email = request.email.trim().to_string();
        if self.store.find_by_email(&email).await?.is_some() {
            return Err(PatientError::DuplicateEmail(email));
        }

        let now = Utc::now();
        let patient = self
            .store
            .insert(Patient {
                id: Uuid::new_v4(),
                first_name: request.first_name.trim().to_string(),
                last_name: request.last_name.trim().to_string(),
                phone: request.normalized_phone(),
                email,
                created_at: now,
                updated_at: now,
                updated_by: actor.to_audit(),
            })
            .await?;

        info!("Patient profile created with ID: {}", patient.id);
        Ok(patient)
    }

    /// Replace a patient's profile fields
    pub async fn update_patient(
        &self,
        patient_id: Uuid,
        request: PatientRequest,
        actor: &Actor,
    ) -> Result<Patient, PatientError> {
        let mut patient = self.get_patient(patient_id).await?;

        let email = request.email.trim().to_string();
        if let Some(other) = self.store.find_by_email(&email).await? {
            if other.id != patient_id {
                return Err(PatientError::DuplicateEmail(email));
            }
        }

        patient.first_name = request.first_name.trim().to_string();
        patient.last_name = request.last_name.trim().to_string();
        patient.phone = request.normalized_phone();
        patient.email = email;
        patient.updated_at = Utc::now();
        patient.updated_by = actor.to_audit();

        let patient = self.store.update(patient).await?;
        info!("Patient {} updated", patient_id);
        Ok(patient)
    }

    /// Delete a patient no appointment refers to
    pub async fn delete_patient(&self, patient_id: Uuid) -> Result<(), PatientError> {
        self.get_patient(patient_id).await?;

        if self.appointments.patient_is_referenced(patient_id).await? {
            warn!("Refusing to delete patient {} with appointments", patient_id);
            return Err(PatientError::PatientInUse);
        }

        if !self.store.delete(patient_id).await? {
            return Err(PatientError::NotFound);
        }
        info!("Patient {} deleted", patient_id);
        Ok(())
    }
}
