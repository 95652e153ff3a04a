use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use shared_models::auth::Actor;
use shared_models::pagination::{Page, PageRequest};

use crate::models::{Appointment, AppointmentError, AppointmentStatus};
use crate::store::AppointmentStore;

/// The slot uniqueness check and the insert share one write guard.
#[derive(Default)]
pub struct InMemoryAppointmentStore {
    rows: RwLock<HashMap<Uuid, Appointment>>,
}

impl InMemoryAppointmentStore {
    async fn sorted_where(&self, keep: impl Fn(&Appointment) -> bool) -> Vec<Appointment> {
        let mut matching: Vec<Appointment> = self
            .rows
            .read()
            .await
            .values()
            .filter(|a| keep(a))
            .cloned()
            .collect();
        matching.sort_by_key(|a| (a.start_time, a.id));
        matching
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn create(&self, appointment: Appointment) -> Result<Appointment, AppointmentError> {
        let mut rows = self.rows.write().await;
        if rows.values().any(|a| a.slot_id == appointment.slot_id) {
            return Err(AppointmentError::SlotAlreadyBooked);
        }
        rows.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, AppointmentError> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn update_state(
        &self,
        id: Uuid,
        status: AppointmentStatus,
        actor: &Actor,
    ) -> Result<Appointment, AppointmentError> {
        let mut rows = self.rows.write().await;
        let appointment = rows.get_mut(&id).ok_or(AppointmentError::NotFound)?;
        appointment.status = status;
        appointment.updated_at = Utc::now();
        appointment.updated_by = actor.to_audit();
        Ok(appointment.clone())
    }

    async fn list_by_patient(&self, patient_id: Uuid, page: PageRequest) -> Result<Page<Appointment>, AppointmentError> {
        let all = self.sorted_where(|a| a.patient_id == patient_id).await;
        Ok(Page::from_sorted(all, page))
    }

    async fn list_by_doctor(&self, doctor_id: Uuid, page: PageRequest) -> Result<Page<Appointment>, AppointmentError> {
        let all = self.sorted_where(|a| a.doctor_id == doctor_id).await;
        Ok(Page::from_sorted(all, page))
    }

    async fn list_confirmed_by_doctor_in_range(
        &self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        Ok(self
            .sorted_where(|a| {
                a.doctor_id == doctor_id
                    && a.status == AppointmentStatus::Confirmed
                    && a.start_time >= start
                    && a.start_time <= end
            })
            .await)
    }

    async fn list_all_by_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        Ok(self.sorted_where(|a| a.patient_id == patient_id).await)
    }

    async fn exists_for_slot(&self, slot_id: Uuid) -> Result<bool, AppointmentError> {
        Ok(self.rows.read().await.values().any(|a| a.slot_id == slot_id))
    }

    async fn exists_for_doctor(&self, doctor_id: Uuid) -> Result<bool, AppointmentError> {
        Ok(self.rows.read().await.values().any(|a| a.doctor_id == doctor_id))
    }

    async fn exists_for_patient(&self, patient_id: Uuid) -> Result<bool, AppointmentError> {
        Ok(self.rows.read().await.values().any(|a| a.patient_id == patient_id))
    }
}
