use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use doctor_cell::DoctorService;
use patient_cell::PatientService;
use shared_models::auth::Actor;
use shared_models::pagination::{Page, PageRequest};

use crate::models::{Appointment, AppointmentError, AppointmentStatus};
use crate::services::lifecycle;
use crate::services::locks::SlotLockRegistry;
use crate::state::AppointmentCellState;
use crate::store::AppointmentStore;

/// Read side of the appointment cell plus the completion transition.
pub struct AppointmentService {
    store: Arc<dyn AppointmentStore>,
    doctors: DoctorService,
    patients: PatientService,
    locks: Arc<SlotLockRegistry>,
}

impl AppointmentService {
    pub fn new(state: &AppointmentCellState) -> Self {
        Self {
            store: Arc::clone(&state.store),
            doctors: DoctorService::new(&state.doctors),
            patients: PatientService::new(&state.patients),
            locks: Arc::clone(&state.locks),
        }
    }

    /// Get appointment by ID
    pub async fn get_appointment(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        debug!("Fetching appointment: {}", appointment_id);
        self.store
            .find_by_id(appointment_id)
            .await?
            .ok_or(AppointmentError::NotFound)
    }

    /// A patient's appointments, earliest first
    pub async fn list_for_patient(
        &self,
        patient_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<Appointment>, AppointmentError> {
        self.patients.get_patient(patient_id).await?;
        self.store.list_by_patient(patient_id, page).await
    }

    /// A doctor's appointments in every status, earliest first
    pub async fn list_for_doctor(
        &self,
        doctor_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<Appointment>, AppointmentError> {
        self.doctors.get_doctor(doctor_id).await?;
        self.store.list_by_doctor(doctor_id, page).await
    }

    /// Confirmed appointments of a doctor starting within `[start, end]`
    pub async fn doctor_agenda(
        &self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        if end < start {
            return Err(AppointmentError::ValidationError("end must not be before start".to_string()));
        }
        self.doctors.get_doctor(doctor_id).await?;
        self.store.list_confirmed_by_doctor_in_range(doctor_id, start, end).await
    }

    /// Marks a confirmed appointment as attended. The slot stays reserved.
    pub async fn mark_completed(&self, appointment_id: Uuid, actor: &Actor) -> Result<Appointment, AppointmentError> {
        let slot_id = self.get_appointment(appointment_id).await?.slot_id;
        let _slot_guard = self.locks.lock(slot_id).await;

        let appointment = self.get_appointment(appointment_id).await?;
        lifecycle::ensure_transition(appointment.status, AppointmentStatus::Completed)?;

        let completed = self
            .store
            .update_state(appointment_id, AppointmentStatus::Completed, actor)
            .await?;
        info!("Appointment {} completed", appointment_id);
        Ok(completed)
    }
}
