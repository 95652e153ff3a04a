pub mod memory;
pub mod supabase;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use shared_config::{AppConfig, StorageBackend};
use shared_database::SupabaseClient;
use shared_models::auth::Actor;
use shared_models::pagination::{Page, PageRequest};

use crate::models::{AvailabilitySlot, Doctor, DoctorError, Specialty};

#[async_trait]
pub trait SpecialtyStore: Send + Sync {
    /// Fails with `DuplicateSpecialty` when the name is taken.
    async fn insert(&self, specialty: Specialty) -> Result<Specialty, DoctorError>;
    async fn update(&self, specialty: Specialty) -> Result<Specialty, DoctorError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Specialty>, DoctorError>;
    async fn find_by_name(&self, name: &str) -> Result<Option<Specialty>, DoctorError>;
    /// Ordered by name.
    async fn list(&self) -> Result<Vec<Specialty>, DoctorError>;
    async fn delete(&self, id: Uuid) -> Result<bool, DoctorError>;
}

#[async_trait]
pub trait DoctorStore: Send + Sync {
    /// Fails with `DuplicateEmail` when the email is taken.
    async fn insert(&self, doctor: Doctor) -> Result<Doctor, DoctorError>;
    async fn update(&self, doctor: Doctor) -> Result<Doctor, DoctorError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Doctor>, DoctorError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<Doctor>, DoctorError>;
    /// Ordered by last name, then first name.
    async fn list(&self, specialty_id: Option<Uuid>, page: PageRequest) -> Result<Page<Doctor>, DoctorError>;
    async fn exists_with_specialty(&self, specialty_id: Uuid) -> Result<bool, DoctorError>;
    async fn delete(&self, id: Uuid) -> Result<bool, DoctorError>;
}

/// Slot persistence. `reserve` and `release` are the only writers of the
/// `reserved` flag and are atomic compare-and-set operations.
#[async_trait]
pub trait SlotStore: Send + Sync {
    /// Inserts unless the interval overlaps another slot of the same doctor.
    async fn create_slot(&self, slot: AvailabilitySlot) -> Result<AvailabilitySlot, DoctorError>;

    async fn find_slot(&self, slot_id: Uuid) -> Result<Option<AvailabilitySlot>, DoctorError>;

    /// `SlotNotFound` when the slot is missing or already reserved.
    async fn get_available_slot(&self, slot_id: Uuid) -> Result<AvailabilitySlot, DoctorError> {
        match self.find_slot(slot_id).await? {
            Some(slot) if !slot.reserved => Ok(slot),
            _ => Err(DoctorError::SlotNotFound),
        }
    }

    /// `false -> true`; `SlotAlreadyReserved` if another caller won.
    async fn reserve(&self, slot_id: Uuid, actor: &Actor) -> Result<AvailabilitySlot, DoctorError>;

    /// `true -> false`; `SlotNotReserved` if the slot is already free.
    async fn release(&self, slot_id: Uuid, actor: &Actor) -> Result<AvailabilitySlot, DoctorError>;

    /// Slots starting within `[start, end]`, ascending by start.
    async fn list_by_doctor_in_range(
        &self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<AvailabilitySlot>, DoctorError>;

    async fn exists_for_doctor(&self, doctor_id: Uuid) -> Result<bool, DoctorError>;

    /// Deletes only while unreserved: `SlotReserved` otherwise, `SlotNotFound` if missing.
    async fn delete_slot(&self, slot_id: Uuid) -> Result<(), DoctorError>;
}

/// The three doctor-side stores, wired for one backend.
#[derive(Clone)]
pub struct DoctorStores {
    pub specialties: Arc<dyn SpecialtyStore>,
    pub doctors: Arc<dyn DoctorStore>,
    pub slots: Arc<dyn SlotStore>,
}

impl DoctorStores {
    pub fn in_memory() -> Self {
        Self {
            specialties: Arc::new(memory::InMemorySpecialtyStore::default()),
            doctors: Arc::new(memory::InMemoryDoctorStore::default()),
            slots: Arc::new(memory::InMemorySlotStore::default()),
        }
    }

    pub fn supabase(client: Arc<SupabaseClient>) -> Self {
        Self {
            specialties: Arc::new(supabase::SupabaseSpecialtyStore::new(Arc::clone(&client))),
            doctors: Arc::new(supabase::SupabaseDoctorStore::new(Arc::clone(&client))),
            slots: Arc::new(supabase::SupabaseSlotStore::new(client)),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        match config.storage_backend {
            StorageBackend::Memory => Self::in_memory(),
            StorageBackend::Supabase => Self::supabase(Arc::new(SupabaseClient::new(config))),
        }
    }
}
