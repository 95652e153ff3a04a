use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_models::auth::Actor;

use crate::models::{DoctorError, Specialty, SpecialtyRequest};
use crate::state::DoctorCellState;
use crate::store::{DoctorStore, SpecialtyStore};

pub struct SpecialtyService {
    specialties: Arc<dyn SpecialtyStore>,
    doctors: Arc<dyn DoctorStore>,
}

impl SpecialtyService {
    pub fn new(state: &DoctorCellState) -> Self {
        Self {
            specialties: Arc::clone(&state.stores.specialties),
            doctors: Arc::clone(&state.stores.doctors),
        }
    }

    pub async fn get_specialty(&self, id: Uuid) -> Result<Specialty, DoctorError> {
        self.specialties
            .find_by_id(id)
            .await?
            .ok_or(DoctorError::SpecialtyNotFound)
    }

    pub async fn list_specialties(&self) -> Result<Vec<Specialty>, DoctorError> {
        self.specialties.list().await
    }

    pub async fn create_specialty(&self, request: SpecialtyRequest, actor: &Actor) -> Result<Specialty, DoctorError> {
        let name = request.name.trim().to_string();
        debug!("Creating specialty {}", name);

        if self.specialties.find_by_name(&name).await?.is_some() {
            return Err(DoctorError::DuplicateSpecialty(name));
        }

        let now = Utc::now();
        let specialty = self
            .specialties
            .insert(Specialty {
                id: Uuid::new_v4(),
                name,
                created_at: now,
                updated_at: now,
                updated_by: actor.to_audit(),
            })
            .await?;

        info!("Specialty {} created: {}", specialty.id, specialty.name);
        Ok(specialty)
    }

    pub async fn update_specialty(
        &self,
        id: Uuid,
        request: SpecialtyRequest,
        actor: &Actor,
    ) -> Result<Specialty, DoctorError> {
        let mut specialty = self.get_specialty(id).await?;
        let name = request.name.trim().to_string();

        if let Some(other) = self.specialties.find_by_name(&name).await? {
            if other.id != id {
                return Err(DoctorError::DuplicateSpecialty(name));
            }
        }

        specialty.name = name;
        specialty.updated_at = Utc::now();
        specialty.updated_by = actor.to_audit();
        self.specialties.update(specialty).await
    }

    /// Refused while any doctor is assigned to the specialty.
    pub async fn delete_specialty(&self, id: Uuid) -> Result<(), DoctorError> {
        self.get_specialty(id).await?;

        if self.doctors.exists_with_specialty(id).await? {
            warn!("Refusing to delete specialty {} still assigned to doctors", id);
            return Err(DoctorError::SpecialtyInUse);
        }

        if !self.specialties.delete(id).await? {
            return Err(DoctorError::SpecialtyNotFound);
        }
        info!("Specialty {} deleted", id);
        Ok(())
    }
}
