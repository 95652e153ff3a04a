use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_database::supabase::{prefer, PREFER_REPRESENTATION};
use shared_database::{DbError, SupabaseClient};
use shared_models::auth::Actor;
use shared_models::pagination::{Page, PageRequest};

use crate::models::{Appointment, AppointmentError, AppointmentStatus};
use crate::store::AppointmentStore;

const APPOINTMENTS: &str = "/rest/v1/appointments";

fn ts(value: DateTime<Utc>) -> String {
    urlencoding::encode(&value.to_rfc3339_opts(SecondsFormat::Secs, true)).into_owned()
}

/// Table row. The slot interval is copied in so listings can order on it.
#[derive(Debug, Serialize, Deserialize)]
struct AppointmentRow {
    id: Uuid,
    doctor_id: Uuid,
    patient_id: Uuid,
    slot_id: Uuid,
    reason: Option<String>,
    status: AppointmentStatus,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    updated_by: Option<String>,
}

impl From<AppointmentRow> for Appointment {
    fn from(row: AppointmentRow) -> Self {
        Self {
            id: row.id,
            doctor_id: row.doctor_id,
            patient_id: row.patient_id,
            slot_id: row.slot_id,
            reason: row.reason,
            status: row.status,
            start_time: row.start_time,
            end_time: row.end_time,
            created_at: row.created_at,
            updated_at: row.updated_at,
            updated_by: row.updated_by,
        }
    }
}

impl From<&Appointment> for AppointmentRow {
    fn from(a: &Appointment) -> Self {
        Self {
            id: a.id,
            doctor_id: a.doctor_id,
            patient_id: a.patient_id,
            slot_id: a.slot_id,
            reason: a.reason.clone(),
            status: a.status,
            start_time: a.start_time,
            end_time: a.end_time,
            created_at: a.created_at,
            updated_at: a.updated_at,
            updated_by: a.updated_by.clone(),
        }
    }
}

pub struct SupabaseAppointmentStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseAppointmentStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    async fn select(&self, path: &str) -> Result<Vec<Appointment>, AppointmentError> {
        let rows: Vec<AppointmentRow> = self.supabase.request(Method::GET, path, None).await?;
        Ok(rows.into_iter().map(Appointment::from).collect())
    }

    async fn paged(&self, filter: String, page: PageRequest) -> Result<Page<Appointment>, AppointmentError> {
        let path = format!(
            "{}?{}&order=start_time.asc&offset={}&limit={}",
            APPOINTMENTS,
            filter,
            page.skip(),
            page.size
        );
        let (rows, total) = self.supabase.request_counted::<AppointmentRow>(&path).await?;
        Ok(Page::new(rows.into_iter().map(Appointment::from).collect(), total, page))
    }

    async fn any(&self, filter: String) -> Result<bool, AppointmentError> {
        let path = format!("{}?{}&select=id&limit=1", APPOINTMENTS, filter);
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(!rows.is_empty())
    }
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn create(&self, appointment: Appointment) -> Result<Appointment, AppointmentError> {
        let body = serde_json::to_value(AppointmentRow::from(&appointment))
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;
        let rows: Vec<AppointmentRow> = self
            .supabase
            .request_with_headers(Method::POST, APPOINTMENTS, Some(body), Some(prefer(PREFER_REPRESENTATION)))
            .await
            .map_err(|e| match e {
                // unique index on slot_id
                DbError::Conflict(_) => AppointmentError::SlotAlreadyBooked,
                other => other.into(),
            })?;
        rows.into_iter()
            .next()
            .map(Appointment::from)
            .ok_or_else(|| AppointmentError::DatabaseError("Insert returned no rows".to_string()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, AppointmentError> {
        let path = format!("{}?id=eq.{}&limit=1", APPOINTMENTS, id);
        Ok(self.select(&path).await?.into_iter().next())
    }

    async fn update_state(
        &self,
        id: Uuid,
        status: AppointmentStatus,
        actor: &Actor,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!("{}?id=eq.{}", APPOINTMENTS, id);
        let body = json!({
            "status": status,
            "updated_at": Utc::now(),
            "updated_by": actor.id(),
        });
        let rows: Vec<AppointmentRow> = self
            .supabase
            .request_with_headers(Method::PATCH, &path, Some(body), Some(prefer(PREFER_REPRESENTATION)))
            .await?;
        rows.into_iter()
            .next()
            .map(Appointment::from)
            .ok_or(AppointmentError::NotFound)
    }

    async fn list_by_patient(&self, patient_id: Uuid, page: PageRequest) -> Result<Page<Appointment>, AppointmentError> {
        self.paged(format!("patient_id=eq.{}", patient_id), page).await
    }

    async fn list_by_doctor(&self, doctor_id: Uuid, page: PageRequest) -> Result<Page<Appointment>, AppointmentError> {
        self.paged(format!("doctor_id=eq.{}", doctor_id), page).await
    }

    async fn list_confirmed_by_doctor_in_range(
        &self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!(
            "{}?doctor_id=eq.{}&status=eq.{}&start_time=gte.{}&start_time=lte.{}&order=start_time.asc",
            APPOINTMENTS,
            doctor_id,
            AppointmentStatus::Confirmed,
            ts(start),
            ts(end)
        );
        self.select(&path).await
    }

    async fn list_all_by_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!("{}?patient_id=eq.{}&order=start_time.asc", APPOINTMENTS, patient_id);
        self.select(&path).await
    }

    async fn exists_for_slot(&self, slot_id: Uuid) -> Result<bool, AppointmentError> {
        self.any(format!("slot_id=eq.{}", slot_id)).await
    }

    async fn exists_for_doctor(&self, doctor_id: Uuid) -> Result<bool, AppointmentError> {
        self.any(format!("doctor_id=eq.{}", doctor_id)).await
    }

    async fn exists_for_patient(&self, patient_id: Uuid) -> Result<bool, AppointmentError> {
        self.any(format!("patient_id=eq.{}", patient_id)).await
    }
}
