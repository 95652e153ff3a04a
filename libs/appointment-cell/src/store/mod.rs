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

use crate::models::{Appointment, AppointmentError, AppointmentStatus};

/// Appointments are never hard-deleted; only their status moves.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// `SlotAlreadyBooked` when another appointment already holds the slot.
    async fn create(&self, appointment: Appointment) -> Result<Appointment, AppointmentError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, AppointmentError>;
    /// Writes the status and audit fields; legality is the caller's business.
    async fn update_state(
        &self,
        id: Uuid,
        status: AppointmentStatus,
        actor: &Actor,
    ) -> Result<Appointment, AppointmentError>;
    /// Ordered by slot start, ascending.
    async fn list_by_patient(&self, patient_id: Uuid, page: PageRequest) -> Result<Page<Appointment>, AppointmentError>;
    /// Ordered by slot start, ascending.
    async fn list_by_doctor(&self, doctor_id: Uuid, page: PageRequest) -> Result<Page<Appointment>, AppointmentError>;
    /// Confirmed appointments starting within `[start, end]`.
    async fn list_confirmed_by_doctor_in_range(
        &self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, AppointmentError>;
    async fn list_all_by_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, AppointmentError>;
    async fn exists_for_slot(&self, slot_id: Uuid) -> Result<bool, AppointmentError>;
    async fn exists_for_doctor(&self, doctor_id: Uuid) -> Result<bool, AppointmentError>;
    async fn exists_for_patient(&self, patient_id: Uuid) -> Result<bool, AppointmentError>;
}

pub fn appointment_store_from_config(config: &AppConfig) -> Arc<dyn AppointmentStore> {
    match config.storage_backend {
        StorageBackend::Memory => Arc::new(memory::InMemoryAppointmentStore::default()),
        StorageBackend::Supabase => Arc::new(supabase::SupabaseAppointmentStore::new(Arc::new(
            SupabaseClient::new(config),
        ))),
    }
}
