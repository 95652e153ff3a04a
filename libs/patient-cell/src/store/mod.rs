pub mod memory;
pub mod supabase;

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use shared_config::{AppConfig, StorageBackend};
use shared_database::SupabaseClient;
use shared_models::pagination::{Page, PageRequest};

use crate::models::{Patient, PatientError};

#[async_trait]
pub trait PatientStore: Send + Sync {
    /// Fails with `DuplicateEmail` when the email is taken.
    async fn insert(&self, patient: Patient) -> Result<Patient, PatientError>;
    async fn update(&self, patient: Patient) -> Result<Patient, PatientError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Patient>, PatientError>;
    /// Case-insensitive match.
    async fn find_by_email(&self, email: &str) -> Result<Option<Patient>, PatientError>;
    /// Ordered by last name, then first name.
    async fn list(&self, page: PageRequest) -> Result<Page<Patient>, PatientError>;
    /// `false` when nothing was deleted.
    async fn delete(&self, id: Uuid) -> Result<bool, PatientError>;
}

pub fn patient_store_from_config(config: &AppConfig) -> Arc<dyn PatientStore> {
    match config.storage_backend {
        StorageBackend::Memory => Arc::new(memory::InMemoryPatientStore::default()),
        StorageBackend::Supabase => Arc::new(supabase::SupabasePatientStore::new(Arc::new(
            SupabaseClient::new(config),
        ))),
    }
}
