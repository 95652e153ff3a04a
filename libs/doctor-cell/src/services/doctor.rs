use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_models::auth::Actor;
use shared_models::pagination::{Page, PageRequest};

use crate::models::{Doctor, DoctorError, DoctorRequest};
use crate::references::AppointmentReferences;
use crate::state::DoctorCellState;
use crate::store::{DoctorStore, SlotStore, SpecialtyStore};

#[derive(Clone)]
pub struct DoctorService {
    doctors: Arc<dyn DoctorStore>,
    specialties: Arc<dyn SpecialtyStore>,
    slots: Arc<dyn SlotStore>,
    appointments: Arc<dyn AppointmentReferences>,
}

impl DoctorService {
    pub fn new(state: &DoctorCellState) -> Self {
        Self {
            doctors: Arc::clone(&state.stores.doctors),
            specialties: Arc::clone(&state.stores.specialties),
            slots: Arc::clone(&state.stores.slots),
            appointments: Arc::clone(&state.appointments),
        }
    }

    /// Get a doctor by id
    pub async fn get_doctor(&self, doctor_id: Uuid) -> Result<Doctor, DoctorError> {
        debug!("Fetching doctor {}", doctor_id);
        self.doctors
            .find_by_id(doctor_id)
            .await?
            .ok_or(DoctorError::NotFound)
    }

    /// List doctors, optionally restricted to one specialty
    pub async fn list_doctors(
        &self,
        specialty_id: Option<Uuid>,
        page: PageRequest,
    ) -> Result<Page<Doctor>, DoctorError> {
        if let Some(specialty_id) = specialty_id {
            self.ensure_specialty(specialty_id).await?;
        }
        self.doctors.list(specialty_id, page).await
    }

    /// Create a new doctor profile
    pub async fn create_doctor(&self, request: DoctorRequest, actor: &Actor) -> Result<Doctor, DoctorError> {
        debug!("Creating new doctor profile for: {}", request.email);

        self.ensure_specialty(request.specialty_id).await?;

        if self.doctors.find_by_email(&request.email).await?.is_some() {
            return Err(DoctorError::DuplicateEmail(request.email));
        }

        let now = Utc::now();
        let doctor = self
            .doctors
            .insert(Doctor {
                id: Uuid::new_v4(),
                first_name: request.first_name.trim().to_string(),
                last_name: request.last_name.trim().to_string(),
                email: request.email.trim().to_string(),
                specialty_id: request.specialty_id,
                profile_image_url: request.profile_image_url,
                biography: request.biography,
                created_at: now,
                updated_at: now,
                updated_by: actor.to_audit(),
            })
            .await?;

        info!("Doctor {} created", doctor.id);
        Ok(doctor)
    }

    /// Replace a doctor's profile fields
    pub async fn update_doctor(
        &self,
        doctor_id: Uuid,
        request: DoctorRequest,
        actor: &Actor,
    ) -> Result<Doctor, DoctorError> {
        let mut doctor = self.get_doctor(doctor_id).await?;
        self.ensure_specialty(request.specialty_id).await?;

        if let Some(other) = self.doctors.find_by_email(&request.email).await? {
            if other.id != doctor_id {
                return Err(DoctorError::DuplicateEmail(request.email));
            }
        }

        doctor.first_name = request.first_name.trim().to_string();
        doctor.last_name = request.last_name.trim().to_string();
        doctor.email = request.email.trim().to_string();
        doctor.specialty_id = request.specialty_id;
        doctor.profile_image_url = request.profile_image_url;
        doctor.biography = request.biography;
        doctor.updated_at = Utc::now();
        doctor.updated_by = actor.to_audit();

        let doctor = self.doctors.update(doctor).await?;
        info!("Doctor {} updated", doctor_id);
        Ok(doctor)
    }

    /// Delete a doctor that owns no slots and appears in no appointment
    pub async fn delete_doctor(&self, doctor_id: Uuid) -> Result<(), DoctorError> {
        self.get_doctor(doctor_id).await?;

        if self.slots.exists_for_doctor(doctor_id).await?
            || self.appointments.doctor_is_referenced(doctor_id).await?
        {
            warn!("Refusing to delete doctor {} with dependent records", doctor_id);
            return Err(DoctorError::DoctorInUse);
        }

        if !self.doctors.delete(doctor_id).await? {
            return Err(DoctorError::NotFound);
        }
        info!("Doctor {} deleted", doctor_id);
        Ok(())
    }

    async fn ensure_specialty(&self, specialty_id: Uuid) -> Result<(), DoctorError> {
        match self.specialties.find_by_id(specialty_id).await? {
            Some(_) => Ok(()),
            None => Err(DoctorError::SpecialtyNotFound),
        }
    }
}
