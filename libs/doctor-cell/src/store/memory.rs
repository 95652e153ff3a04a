use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use shared_models::auth::Actor;
use shared_models::pagination::{Page, PageRequest};

use crate::models::{AvailabilitySlot, Doctor, DoctorError, Specialty};
use crate::store::{DoctorStore, SlotStore, SpecialtyStore};

#[derive(Default)]
pub struct InMemorySpecialtyStore {
    rows: RwLock<HashMap<Uuid, Specialty>>,
}

fn name_taken(rows: &HashMap<Uuid, Specialty>, name: &str, except: Uuid) -> bool {
    rows.values()
        .any(|s| s.id != except && s.name.eq_ignore_ascii_case(name))
}

#[async_trait]
impl SpecialtyStore for InMemorySpecialtyStore {
    async fn insert(&self, specialty: Specialty) -> Result<Specialty, DoctorError> {
        let mut rows = self.rows.write().await;
        if name_taken(&rows, &specialty.name, specialty.id) {
            return Err(DoctorError::DuplicateSpecialty(specialty.name));
        }
        rows.insert(specialty.id, specialty.clone());
        Ok(specialty)
    }

    async fn update(&self, specialty: Specialty) -> Result<Specialty, DoctorError> {
        let mut rows = self.rows.write().await;
        if !rows.contains_key(&specialty.id) {
            return Err(DoctorError::SpecialtyNotFound);
        }
        if name_taken(&rows, &specialty.name, specialty.id) {
            return Err(DoctorError::DuplicateSpecialty(specialty.name));
        }
        rows.insert(specialty.id, specialty.clone());
        Ok(specialty)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Specialty>, DoctorError> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Specialty>, DoctorError> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Specialty>, DoctorError> {
        let mut all: Vec<Specialty> = self.rows.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DoctorError> {
        Ok(self.rows.write().await.remove(&id).is_some())
    }
}

#[derive(Default)]
pub struct InMemoryDoctorStore {
    rows: RwLock<HashMap<Uuid, Doctor>>,
}

fn email_taken(rows: &HashMap<Uuid, Doctor>, email: &str, except: Uuid) -> bool {
    rows.values()
        .any(|d| d.id != except && d.email.eq_ignore_ascii_case(email))
}

#[async_trait]
impl DoctorStore for InMemoryDoctorStore {
    async fn insert(&self, doctor: Doctor) -> Result<Doctor, DoctorError> {
        let mut rows = self.rows.write().await;
        if email_taken(&rows, &doctor.email, doctor.id) {
            return Err(DoctorError::DuplicateEmail(doctor.email));
        }
        rows.insert(doctor.id, doctor.clone());
        Ok(doctor)
    }

    async fn update(&self, doctor: Doctor) -> Result<Doctor, DoctorError> {
        let mut rows = self.rows.write().await;
        if !rows.contains_key(&doctor.id) {
            return Err(DoctorError::NotFound);
        }
        if email_taken(&rows, &doctor.email, doctor.id) {
            return Err(DoctorError::DuplicateEmail(doctor.email));
        }
        rows.insert(doctor.id, doctor.clone());
        Ok(doctor)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Doctor>, DoctorError> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Doctor>, DoctorError> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .find(|d| d.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list(&self, specialty_id: Option<Uuid>, page: PageRequest) -> Result<Page<Doctor>, DoctorError> {
        let mut matching: Vec<Doctor> = self
            .rows
            .read()
            .await
            .values()
            .filter(|d| specialty_id.map_or(true, |s| d.specialty_id == s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            (a.last_name.as_str(), a.first_name.as_str()).cmp(&(b.last_name.as_str(), b.first_name.as_str()))
        });
        Ok(Page::from_sorted(matching, page))
    }

    async fn exists_with_specialty(&self, specialty_id: Uuid) -> Result<bool, DoctorError> {
        Ok(self.rows.read().await.values().any(|d| d.specialty_id == specialty_id))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DoctorError> {
        Ok(self.rows.write().await.remove(&id).is_some())
    }
}

/// Slots behind one lock: the overlap check and the insert, and every
/// reserve/release compare-and-set, happen under the write guard.
#[derive(Default)]
pub struct InMemorySlotStore {
    rows: RwLock<HashMap<Uuid, AvailabilitySlot>>,
}

#[async_trait]
impl SlotStore for InMemorySlotStore {
    async fn create_slot(&self, slot: AvailabilitySlot) -> Result<AvailabilitySlot, DoctorError> {
        let mut rows = self.rows.write().await;
        let overlapping = rows
            .values()
            .any(|s| s.doctor_id == slot.doctor_id && s.overlaps(slot.start_time, slot.end_time));
        if overlapping {
            return Err(DoctorError::SlotOverlap);
        }
        rows.insert(slot.id, slot.clone());
        Ok(slot)
    }

    async fn find_slot(&self, slot_id: Uuid) -> Result<Option<AvailabilitySlot>, DoctorError> {
        Ok(self.rows.read().await.get(&slot_id).cloned())
    }

    async fn reserve(&self, slot_id: Uuid, actor: &Actor) -> Result<AvailabilitySlot, DoctorError> {
        let mut rows = self.rows.write().await;
        let slot = rows.get_mut(&slot_id).ok_or(DoctorError::SlotNotFound)?;
        if slot.reserved {
            return Err(DoctorError::SlotAlreadyReserved);
        }
        slot.reserved = true;
        slot.updated_at = Utc::now();
        slot.updated_by = actor.to_audit();
        Ok(slot.clone())
    }

    async fn release(&self, slot_id: Uuid, actor: &Actor) -> Result<AvailabilitySlot, DoctorError> {
        let mut rows = self.rows.write().await;
        let slot = rows.get_mut(&slot_id).ok_or(DoctorError::SlotNotFound)?;
        if !slot.reserved {
            return Err(DoctorError::SlotNotReserved);
        }
        slot.reserved = false;
        slot.updated_at = Utc::now();
        slot.updated_by = actor.to_audit();
        Ok(slot.clone())
    }

    async fn list_by_doctor_in_range(
        &self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<AvailabilitySlot>, DoctorError> {
        let mut slots: Vec<AvailabilitySlot> = self
            .rows
            .read()
            .await
            .values()
            .filter(|s| s.doctor_id == doctor_id && s.start_time >= start && s.start_time <= end)
            .cloned()
            .collect();
        slots.sort_by_key(|s| s.start_time);
        Ok(slots)
    }

    async fn exists_for_doctor(&self, doctor_id: Uuid) -> Result<bool, DoctorError> {
        Ok(self.rows.read().await.values().any(|s| s.doctor_id == doctor_id))
    }

    async fn delete_slot(&self, slot_id: Uuid) -> Result<(), DoctorError> {
        let mut rows = self.rows.write().await;
        match rows.get(&slot_id) {
            None => Err(DoctorError::SlotNotFound),
            Some(slot) if slot.reserved => Err(DoctorError::SlotReserved),
            Some(_) => {
                rows.remove(&slot_id);
                Ok(())
            }
        }
    }
}
