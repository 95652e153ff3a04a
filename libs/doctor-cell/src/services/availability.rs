use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, SubsecRound, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_models::auth::Actor;

use crate::models::{AvailabilitySlot, DoctorError};
use crate::references::AppointmentReferences;
use crate::state::DoctorCellState;
use crate::store::{DoctorStore, SlotStore};

/// Slot lifecycle on top of the slot store: creation rules, the atomic
/// reserve/release pair, range listings and guarded deletion.
#[derive(Clone)]
pub struct AvailabilityService {
    slots: Arc<dyn SlotStore>,
    doctors: Arc<dyn DoctorStore>,
    appointments: Arc<dyn AppointmentReferences>,
}

impl AvailabilityService {
    pub fn new(state: &DoctorCellState) -> Self {
        Self {
            slots: Arc::clone(&state.stores.slots),
            doctors: Arc::clone(&state.stores.doctors),
            appointments: Arc::clone(&state.appointments),
        }
    }

    /// Create a slot for a doctor
    pub async fn create_slot(
        &self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        actor: &Actor,
    ) -> Result<AvailabilitySlot, DoctorError> {
        debug!("Creating slot for doctor {}: {} - {}", doctor_id, start, end);

        let (start, end) = (start.trunc_subsecs(0), end.trunc_subsecs(0));
        if start >= end {
            return Err(DoctorError::InvalidInterval);
        }

        if self.doctors.find_by_id(doctor_id).await?.is_none() {
            return Err(DoctorError::NotFound);
        }

        let now = Utc::now();
        let slot = self
            .slots
            .create_slot(AvailabilitySlot {
                id: Uuid::new_v4(),
                doctor_id,
                start_time: start,
                end_time: end,
                reserved: false,
                created_at: now,
                updated_at: now,
                updated_by: actor.to_audit(),
            })
            .await?;

        info!("Slot {} created for doctor {}", slot.id, doctor_id);
        Ok(slot)
    }

    /// A slot that can still be booked; missing and reserved look the same
    pub async fn get_available_slot(&self, slot_id: Uuid) -> Result<AvailabilitySlot, DoctorError> {
        self.slots.get_available_slot(slot_id).await
    }

    /// A slot regardless of its reserved flag
    pub async fn find_slot(&self, slot_id: Uuid) -> Result<AvailabilitySlot, DoctorError> {
        self.slots.find_slot(slot_id).await?.ok_or(DoctorError::SlotNotFound)
    }

    pub async fn reserve(&self, slot_id: Uuid, actor: &Actor) -> Result<AvailabilitySlot, DoctorError> {
        self.slots.reserve(slot_id, actor).await
    }

    pub async fn release(&self, slot_id: Uuid, actor: &Actor) -> Result<AvailabilitySlot, DoctorError> {
        self.slots.release(slot_id, actor).await
    }

    /// Slots of an existing doctor starting within `[start, end]`
    pub async fn list_by_doctor_in_range(
        &self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<AvailabilitySlot>, DoctorError> {
        if self.doctors.find_by_id(doctor_id).await?.is_none() {
            return Err(DoctorError::NotFound);
        }
        self.slots.list_by_doctor_in_range(doctor_id, start, end).await
    }

    /// Whole-day listing: from the start of `start_date` to 23:59:59 of
    /// `end_date`, or of `start_date` when no end is given
    pub async fn list_for_dates(
        &self,
        doctor_id: Uuid,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<AvailabilitySlot>, DoctorError> {
        let (start, end) = day_range(start_date, end_date)?;
        self.list_by_doctor_in_range(doctor_id, start, end).await
    }

    /// Delete an unreserved slot no appointment has ever referenced
    pub async fn delete_slot(&self, slot_id: Uuid) -> Result<(), DoctorError> {
        let slot = self.find_slot(slot_id).await?;
        if slot.reserved {
            return Err(DoctorError::SlotReserved);
        }

        if self.appointments.slot_is_referenced(slot_id).await? {
            warn!("Refusing to delete slot {} referenced by an appointment", slot_id);
            return Err(DoctorError::SlotInUse);
        }

        self.slots.delete_slot(slot_id).await?;
        info!("Slot {} deleted", slot_id);
        Ok(())
    }
}

pub fn day_range(
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
) -> Result<(DateTime<Utc>, DateTime<Utc>), DoctorError> {
    let end_date = end_date.unwrap_or(start_date);
    if end_date < start_date {
        return Err(DoctorError::ValidationError(
            "endDate must not be before startDate".to_string(),
        ));
    }

    let last_second = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
    let start = start_date.and_time(NaiveTime::MIN).and_utc();
    let end = end_date.and_time(last_second).and_utc();
    Ok((start, end))
}
