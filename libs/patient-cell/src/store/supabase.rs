use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use shared_database::supabase::{prefer, PREFER_REPRESENTATION};
use shared_database::{ilike_literal, DbError, SupabaseClient};
use shared_models::pagination::{Page, PageRequest};

use crate::models::{Patient, PatientError};
use crate::store::PatientStore;

const PATIENTS: &str = "/rest/v1/patients";

#[derive(Debug, Serialize, Deserialize)]
struct PatientRow {
    id: Uuid,
    first_name: String,
    last_name: String,
    email: String,
    phone: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    updated_by: Option<String>,
}

impl From<PatientRow> for Patient {
    fn from(row: PatientRow) -> Self {
        Self {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            created_at: row.created_at,
            updated_at: row.updated_at,
            updated_by: row.updated_by,
        }
    }
}

impl From<&Patient> for PatientRow {
    fn from(p: &Patient) -> Self {
        Self {
            id: p.id,
            first_name: p.first_name.clone(),
            last_name: p.last_name.clone(),
            email: p.email.clone(),
            phone: p.phone.clone(),
            created_at: p.created_at,
            updated_at: p.updated_at,
            updated_by: p.updated_by.clone(),
        }
    }
}

fn to_body(patient: &Patient) -> Result<Value, PatientError> {
    serde_json::to_value(PatientRow::from(patient)).map_err(|e| PatientError::DatabaseError(e.to_string()))
}

pub struct SupabasePatientStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabasePatientStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl PatientStore for SupabasePatientStore {
    async fn insert(&self, patient: Patient) -> Result<Patient, PatientError> {
        let rows: Vec<PatientRow> = self
            .supabase
            .request_with_headers(Method::POST, PATIENTS, Some(to_body(&patient)?), Some(prefer(PREFER_REPRESENTATION)))
            .await
            .map_err(|e| match e {
                DbError::Conflict(_) => PatientError::DuplicateEmail(patient.email.clone()),
                other => other.into(),
            })?;
        rows.into_iter()
            .next()
            .map(Patient::from)
            .ok_or_else(|| PatientError::DatabaseError("Insert returned no rows".to_string()))
    }

    async fn update(&self, patient: Patient) -> Result<Patient, PatientError> {
        let path = format!("{}?id=eq.{}", PATIENTS, patient.id);
        let mut body = to_body(&patient)?;
        if let Some(fields) = body.as_object_mut() {
            fields.remove("id");
            fields.remove("created_at");
        }
        let rows: Vec<PatientRow> = self
            .supabase
            .request_with_headers(Method::PATCH, &path, Some(body), Some(prefer(PREFER_REPRESENTATION)))
            .await
            .map_err(|e| match e {
                DbError::Conflict(_) => PatientError::DuplicateEmail(patient.email.clone()),
                other => other.into(),
            })?;
        rows.into_iter().next().map(Patient::from).ok_or(PatientError::NotFound)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Patient>, PatientError> {
        let path = format!("{}?id=eq.{}&limit=1", PATIENTS, id);
        let rows: Vec<PatientRow> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(rows.into_iter().next().map(Patient::from))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Patient>, PatientError> {
        let path = format!("{}?email=ilike.{}&limit=1", PATIENTS, ilike_literal(email));
        let rows: Vec<PatientRow> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(rows
            .into_iter()
            .next()
            .map(Patient::from)
            .filter(|patient| patient.email.eq_ignore_ascii_case(email)))
    }

    async fn list(&self, page: PageRequest) -> Result<Page<Patient>, PatientError> {
        let path = format!(
            "{}?order=last_name.asc,first_name.asc&offset={}&limit={}",
            PATIENTS,
            page.skip(),
            page.size
        );
        let (rows, total) = self.supabase.request_counted::<PatientRow>(&path).await?;
        Ok(Page::new(rows.into_iter().map(Patient::from).collect(), total, page))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, PatientError> {
        let path = format!("{}?id=eq.{}", PATIENTS, id);
        let rows: Vec<Value> = self
            .supabase
            .request_with_headers(Method::DELETE, &path, None, Some(prefer(PREFER_REPRESENTATION)))
            .await
            .map_err(|e| match e {
                // foreign key from appointments
                DbError::Conflict(_) => PatientError::PatientInUse,
                other => other.into(),
            })?;
        Ok(!rows.is_empty())
    }
}
