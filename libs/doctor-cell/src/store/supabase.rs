use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_database::supabase::{prefer, PREFER_REPRESENTATION};
use shared_database::{ilike_literal, DbError, SupabaseClient};
use shared_models::auth::Actor;
use shared_models::pagination::{Page, PageRequest};

use crate::models::{AvailabilitySlot, Doctor, DoctorError, Specialty};
use crate::store::{DoctorStore, SlotStore, SpecialtyStore};

const SPECIALTIES: &str = "/rest/v1/specialties";
const DOCTORS: &str = "/rest/v1/doctors";
const SLOTS: &str = "/rest/v1/availability_slots";

pub(crate) fn ts(value: DateTime<Utc>) -> String {
    urlencoding::encode(&value.to_rfc3339_opts(SecondsFormat::Secs, true)).into_owned()
}

fn first<T>(rows: Vec<T>) -> Option<T> {
    rows.into_iter().next()
}

// ==============================================================================
// ROWS
// ==============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct SpecialtyRow {
    id: Uuid,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    updated_by: Option<String>,
}

impl From<SpecialtyRow> for Specialty {
    fn from(row: SpecialtyRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
            updated_at: row.updated_at,
            updated_by: row.updated_by,
        }
    }
}

impl From<&Specialty> for SpecialtyRow {
    fn from(s: &Specialty) -> Self {
        Self {
            id: s.id,
            name: s.name.clone(),
            created_at: s.created_at,
            updated_at: s.updated_at,
            updated_by: s.updated_by.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct DoctorRow {
    id: Uuid,
    first_name: String,
    last_name: String,
    email: String,
    specialty_id: Uuid,
    profile_image_url: Option<String>,
    biography: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    updated_by: Option<String>,
}

impl From<DoctorRow> for Doctor {
    fn from(row: DoctorRow) -> Self {
        Self {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            specialty_id: row.specialty_id,
            profile_image_url: row.profile_image_url,
            biography: row.biography,
            created_at: row.created_at,
            updated_at: row.updated_at,
            updated_by: row.updated_by,
        }
    }
}

impl From<&Doctor> for DoctorRow {
    fn from(d: &Doctor) -> Self {
        Self {
            id: d.id,
            first_name: d.first_name.clone(),
            last_name: d.last_name.clone(),
            email: d.email.clone(),
            specialty_id: d.specialty_id,
            profile_image_url: d.profile_image_url.clone(),
            biography: d.biography.clone(),
            created_at: d.created_at,
            updated_at: d.updated_at,
            updated_by: d.updated_by.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SlotRow {
    id: Uuid,
    doctor_id: Uuid,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    reserved: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    updated_by: Option<String>,
}

impl From<SlotRow> for AvailabilitySlot {
    fn from(row: SlotRow) -> Self {
        Self {
            id: row.id,
            doctor_id: row.doctor_id,
            start_time: row.start_time,
            end_time: row.end_time,
            reserved: row.reserved,
            created_at: row.created_at,
            updated_at: row.updated_at,
            updated_by: row.updated_by,
        }
    }
}

impl From<&AvailabilitySlot> for SlotRow {
    fn from(s: &AvailabilitySlot) -> Self {
        Self {
            id: s.id,
            doctor_id: s.doctor_id,
            start_time: s.start_time,
            end_time: s.end_time,
            reserved: s.reserved,
            created_at: s.created_at,
            updated_at: s.updated_at,
            updated_by: s.updated_by.clone(),
        }
    }
}

fn to_body<T: Serialize>(row: &T) -> Result<Value, DoctorError> {
    serde_json::to_value(row).map_err(|e| DoctorError::DatabaseError(e.to_string()))
}

// ==============================================================================
// SPECIALTIES
// ==============================================================================

pub struct SupabaseSpecialtyStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseSpecialtyStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl SpecialtyStore for SupabaseSpecialtyStore {
    async fn insert(&self, specialty: Specialty) -> Result<Specialty, DoctorError> {
        let body = to_body(&SpecialtyRow::from(&specialty))?;
        let rows: Vec<SpecialtyRow> = self
            .supabase
            .request_with_headers(Method::POST, SPECIALTIES, Some(body), Some(prefer(PREFER_REPRESENTATION)))
            .await
            .map_err(|e| match e {
                DbError::Conflict(_) => DoctorError::DuplicateSpecialty(specialty.name.clone()),
                other => other.into(),
            })?;
        first(rows)
            .map(Specialty::from)
            .ok_or_else(|| DoctorError::DatabaseError("Insert returned no rows".to_string()))
    }

    async fn update(&self, specialty: Specialty) -> Result<Specialty, DoctorError> {
        let path = format!("{}?id=eq.{}", SPECIALTIES, specialty.id);
        let body = json!({
            "name": specialty.name,
            "updated_at": specialty.updated_at,
            "updated_by": specialty.updated_by,
        });
        let rows: Vec<SpecialtyRow> = self
            .supabase
            .request_with_headers(Method::PATCH, &path, Some(body), Some(prefer(PREFER_REPRESENTATION)))
            .await
            .map_err(|e| match e {
                DbError::Conflict(_) => DoctorError::DuplicateSpecialty(specialty.name.clone()),
                other => other.into(),
            })?;
        first(rows).map(Specialty::from).ok_or(DoctorError::SpecialtyNotFound)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Specialty>, DoctorError> {
        let path = format!("{}?id=eq.{}&limit=1", SPECIALTIES, id);
        let rows: Vec<SpecialtyRow> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(first(rows).map(Specialty::from))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Specialty>, DoctorError> {
        let path = format!("{}?name=ilike.{}&limit=1", SPECIALTIES, ilike_literal(name));
        let rows: Vec<SpecialtyRow> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(first(rows)
            .map(Specialty::from)
            .filter(|specialty| specialty.name.to_lowercase() == name.to_lowercase()))
    }

    async fn list(&self) -> Result<Vec<Specialty>, DoctorError> {
        let path = format!("{}?order=name.asc", SPECIALTIES);
        let rows: Vec<SpecialtyRow> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(rows.into_iter().map(Specialty::from).collect())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DoctorError> {
        let path = format!("{}?id=eq.{}", SPECIALTIES, id);
        let rows: Vec<Value> = self
            .supabase
            .request_with_headers(Method::DELETE, &path, None, Some(prefer(PREFER_REPRESENTATION)))
            .await
            .map_err(|e| match e {
                DbError::Conflict(_) => DoctorError::SpecialtyInUse,
                other => other.into(),
            })?;
        Ok(!rows.is_empty())
    }
}

// ==============================================================================
// DOCTORS
// ==============================================================================

pub struct SupabaseDoctorStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseDoctorStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl DoctorStore for SupabaseDoctorStore {
    async fn insert(&self, doctor: Doctor) -> Result<Doctor, DoctorError> {
        let body = to_body(&DoctorRow::from(&doctor))?;
        let rows: Vec<DoctorRow> = self
            .supabase
            .request_with_headers(Method::POST, DOCTORS, Some(body), Some(prefer(PREFER_REPRESENTATION)))
            .await
            .map_err(|e| match e {
                DbError::Conflict(_) => DoctorError::DuplicateEmail(doctor.email.clone()),
                other => other.into(),
            })?;
        first(rows)
            .map(Doctor::from)
            .ok_or_else(|| DoctorError::DatabaseError("Insert returned no rows".to_string()))
    }

    async fn update(&self, doctor: Doctor) -> Result<Doctor, DoctorError> {
        let path = format!("{}?id=eq.{}", DOCTORS, doctor.id);
        let mut body = to_body(&DoctorRow::from(&doctor))?;
        if let Some(fields) = body.as_object_mut() {
            fields.remove("id");
            fields.remove("created_at");
        }
        let rows: Vec<DoctorRow> = self
            .supabase
            .request_with_headers(Method::PATCH, &path, Some(body), Some(prefer(PREFER_REPRESENTATION)))
            .await
            .map_err(|e| match e {
                DbError::Conflict(_) => DoctorError::DuplicateEmail(doctor.email.clone()),
                other => other.into(),
            })?;
        first(rows).map(Doctor::from).ok_or(DoctorError::NotFound)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Doctor>, DoctorError> {
        let path = format!("{}?id=eq.{}&limit=1", DOCTORS, id);
        let rows: Vec<DoctorRow> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(first(rows).map(Doctor::from))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Doctor>, DoctorError> {
        let path = format!("{}?email=ilike.{}&limit=1", DOCTORS, ilike_literal(email));
        let rows: Vec<DoctorRow> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(first(rows)
            .map(Doctor::from)
            .filter(|doctor| doctor.email.eq_ignore_ascii_case(email)))
    }

    async fn list(&self, specialty_id: Option<Uuid>, page: PageRequest) -> Result<Page<Doctor>, DoctorError> {
        let mut path = format!(
            "{}?order=last_name.asc,first_name.asc&offset={}&limit={}",
            DOCTORS,
            page.skip(),
            page.size
        );
        if let Some(specialty_id) = specialty_id {
            path.push_str(&format!("&specialty_id=eq.{}", specialty_id));
        }

        let (rows, total) = self.supabase.request_counted::<DoctorRow>(&path).await?;
        Ok(Page::new(rows.into_iter().map(Doctor::from).collect(), total, page))
    }

    async fn exists_with_specialty(&self, specialty_id: Uuid) -> Result<bool, DoctorError> {
        let path = format!("{}?specialty_id=eq.{}&select=id&limit=1", DOCTORS, specialty_id);
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(!rows.is_empty())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DoctorError> {
        let path = format!("{}?id=eq.{}", DOCTORS, id);
        let rows: Vec<Value> = self
            .supabase
            .request_with_headers(Method::DELETE, &path, None, Some(prefer(PREFER_REPRESENTATION)))
            .await
            .map_err(|e| match e {
                DbError::Conflict(_) => DoctorError::DoctorInUse,
                other => other.into(),
            })?;
        Ok(!rows.is_empty())
    }
}

// ==============================================================================
// SLOTS
// ==============================================================================

/// Reserve and release are single conditional PATCHes
/// (`reserved=is.false` / `reserved=is.true`); an empty representation means
/// another request got there first.
pub struct SupabaseSlotStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseSlotStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    async fn flip_reserved(
        &self,
        slot_id: Uuid,
        from: bool,
        actor: &Actor,
    ) -> Result<Option<AvailabilitySlot>, DoctorError> {
        let path = format!("{}?id=eq.{}&reserved=is.{}", SLOTS, slot_id, from);
        let body = json!({
            "reserved": !from,
            "updated_at": Utc::now(),
            "updated_by": actor.id(),
        });
        let rows: Vec<SlotRow> = self
            .supabase
            .request_with_headers(Method::PATCH, &path, Some(body), Some(prefer(PREFER_REPRESENTATION)))
            .await?;
        Ok(first(rows).map(AvailabilitySlot::from))
    }
}

#[async_trait]
impl SlotStore for SupabaseSlotStore {
    async fn create_slot(&self, slot: AvailabilitySlot) -> Result<AvailabilitySlot, DoctorError> {
        let overlap_path = format!(
            "{}?doctor_id=eq.{}&start_time=lt.{}&end_time=gt.{}&select=id&limit=1",
            SLOTS,
            slot.doctor_id,
            ts(slot.end_time),
            ts(slot.start_time)
        );
        let overlapping: Vec<Value> = self.supabase.request(Method::GET, &overlap_path, None).await?;
        if !overlapping.is_empty() {
            return Err(DoctorError::SlotOverlap);
        }

        let body = to_body(&SlotRow::from(&slot))?;
        let rows: Vec<SlotRow> = self
            .supabase
            .request_with_headers(Method::POST, SLOTS, Some(body), Some(prefer(PREFER_REPRESENTATION)))
            .await
            .map_err(|e| match e {
                // exclusion constraint caught a concurrent insert
                DbError::Conflict(_) => DoctorError::SlotOverlap,
                other => other.into(),
            })?;
        first(rows)
            .map(AvailabilitySlot::from)
            .ok_or_else(|| DoctorError::DatabaseError("Insert returned no rows".to_string()))
    }

    async fn find_slot(&self, slot_id: Uuid) -> Result<Option<AvailabilitySlot>, DoctorError> {
        let path = format!("{}?id=eq.{}&limit=1", SLOTS, slot_id);
        let rows: Vec<SlotRow> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(first(rows).map(AvailabilitySlot::from))
    }

    async fn reserve(&self, slot_id: Uuid, actor: &Actor) -> Result<AvailabilitySlot, DoctorError> {
        if let Some(slot) = self.flip_reserved(slot_id, false, actor).await? {
            debug!("Slot {} reserved", slot_id);
            return Ok(slot);
        }
        match self.find_slot(slot_id).await? {
            Some(_) => {
                warn!("Slot {} was already reserved", slot_id);
                Err(DoctorError::SlotAlreadyReserved)
            }
            None => Err(DoctorError::SlotNotFound),
        }
    }

    async fn release(&self, slot_id: Uuid, actor: &Actor) -> Result<AvailabilitySlot, DoctorError> {
        if let Some(slot) = self.flip_reserved(slot_id, true, actor).await? {
            debug!("Slot {} released", slot_id);
            return Ok(slot);
        }
        match self.find_slot(slot_id).await? {
            Some(_) => Err(DoctorError::SlotNotReserved),
            None => Err(DoctorError::SlotNotFound),
        }
    }

    async fn list_by_doctor_in_range(
        &self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<AvailabilitySlot>, DoctorError> {
        let path = format!(
            "{}?doctor_id=eq.{}&start_time=gte.{}&start_time=lte.{}&order=start_time.asc",
            SLOTS,
            doctor_id,
            ts(start),
            ts(end)
        );
        let rows: Vec<SlotRow> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(rows.into_iter().map(AvailabilitySlot::from).collect())
    }

    async fn exists_for_doctor(&self, doctor_id: Uuid) -> Result<bool, DoctorError> {
        let path = format!("{}?doctor_id=eq.{}&select=id&limit=1", SLOTS, doctor_id);
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(!rows.is_empty())
    }

    async fn delete_slot(&self, slot_id: Uuid) -> Result<(), DoctorError> {
        let path = format!("{}?id=eq.{}&reserved=is.false", SLOTS, slot_id);
        let rows: Vec<Value> = self
            .supabase
            .request_with_headers(Method::DELETE, &path, None, Some(prefer(PREFER_REPRESENTATION)))
            .await
            .map_err(|e| match e {
                DbError::Conflict(_) => DoctorError::SlotInUse,
                other => other.into(),
            })?;
        if !rows.is_empty() {
            return Ok(());
        }
        match self.find_slot(slot_id).await? {
            Some(_) => Err(DoctorError::SlotReserved),
            None => Err(DoctorError::SlotNotFound),
        }
    }
}
