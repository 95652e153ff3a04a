use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use shared_models::pagination::{Page, PageRequest};

use crate::models::{Patient, PatientError};
use crate::store::PatientStore;

#[derive(Default)]
pub struct InMemoryPatientStore {
    rows: RwLock<HashMap<Uuid, Patient>>,
}

fn email_taken(rows: &HashMap<Uuid, Patient>, email: &str, except: Uuid) -> bool {
    rows.values()
        .any(|p| p.id != except && p.email.eq_ignore_ascii_case(email))
}

#[async_trait]
impl PatientStore for InMemoryPatientStore {
    async fn insert(&self, patient: Patient) -> Result<Patient, PatientError> {
        let mut rows = self.rows.write().await;
        if email_taken(&rows, &patient.email, patient.id) {
            return Err(PatientError::DuplicateEmail(patient.email));
        }
        rows.insert(patient.id, patient.clone());
        Ok(patient)
    }

    async fn update(&self, patient: Patient) -> Result<Patient, PatientError> {
        let mut rows = self.rows.write().await;
        if !rows.contains_key(&patient.id) {
            return Err(PatientError::NotFound);
        }
        if email_taken(&rows, &patient.email, patient.id) {
            return Err(PatientError::DuplicateEmail(patient.email));
        }
        rows.insert(patient.id, patient.clone());
        Ok(patient)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Patient>, PatientError> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Patient>, PatientError> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .find(|p| p.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list(&self, page: PageRequest) -> Result<Page<Patient>, PatientError> {
        let mut all: Vec<Patient> = self.rows.read().await.values().cloned().collect();
        all.sort_by(|a, b| {
            (a.last_name.as_str(), a.first_name.as_str()).cmp(&(b.last_name.as_str(), b.first_name.as_str()))
        });
        Ok(Page::from_sorted(all, page))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, PatientError> {
        Ok(self.rows.write().await.remove(&id).is_some())
    }
}
