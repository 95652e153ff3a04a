use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use doctor_cell::AvailabilityService;
use notification_cell::Notifier;
use patient_cell::PatientService;
use shared_database::with_retry;
use shared_models::auth::Actor;

use crate::models::{Appointment, AppointmentError, AppointmentStatus, CANCELLATION_NOTICE_HOURS};
use crate::services::clock::Clock;
use crate::services::lifecycle;
use crate::services::locks::SlotLockRegistry;
use crate::services::notices;
use crate::state::AppointmentCellState;
use crate::store::AppointmentStore;

/// Whole hours between `now` and the slot start, truncated toward zero, must
/// be at least the notice period.
pub fn check_cancellation_window(start: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), AppointmentError> {
    let remaining_hours = (start - now).num_hours();
    if remaining_hours < CANCELLATION_NOTICE_HOURS {
        return Err(AppointmentError::CancellationWindowClosed { remaining_hours });
    }
    Ok(())
}

pub struct CancellationService {
    store: Arc<dyn AppointmentStore>,
    slots: AvailabilityService,
    patients: PatientService,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    locks: Arc<SlotLockRegistry>,
    retry_attempts: u32,
}

impl CancellationService {
    pub fn new(state: &AppointmentCellState) -> Self {
        Self {
            store: Arc::clone(&state.store),
            slots: AvailabilityService::new(&state.doctors),
            patients: PatientService::new(&state.patients),
            notifier: Arc::clone(&state.notifier),
            clock: Arc::clone(&state.clock),
            locks: Arc::clone(&state.locks),
            retry_attempts: state.config.store_retry_attempts,
        }
    }

    #[instrument(skip(self, actor))]
    pub async fn cancel_appointment(&self, appointment_id: Uuid, actor: &Actor) -> Result<Appointment, AppointmentError> {
        debug!("Cancelling appointment: {}", appointment_id);

        let slot_id = self.load(appointment_id).await?.slot_id;

        let cancelled = {
            let _slot_guard = self.locks.lock(slot_id).await;

            // re-read under the lock so a concurrent cancellation is seen
            let appointment = self.load(appointment_id).await?;
            lifecycle::ensure_transition(appointment.status, AppointmentStatus::Cancelled)?;

            if let Err(e) = check_cancellation_window(appointment.start_time, self.clock.now()) {
                warn!("Cancellation of appointment {} refused: {}", appointment_id, e);
                return Err(e);
            }

            let cancelled = self
                .store
                .update_state(appointment_id, AppointmentStatus::Cancelled, actor)
                .await?;

            if let Err(e) = self.slots.release(slot_id, actor).await {
                error!("Could not release slot {} for appointment {}: {}", slot_id, appointment_id, e);
                self.restore(appointment_id, actor).await;
                return Err(e.into());
            }

            cancelled
        };

        info!("Appointment {} cancelled successfully", appointment_id);

        match self.patients.get_patient(cancelled.patient_id).await {
            Ok(patient) => {
                let notice = notices::booking_cancelled(&cancelled, &patient);
                notices::dispatch(Arc::clone(&self.notifier), patient, notice);
            }
            Err(e) => warn!("Skipping cancellation notice for {}: {}", appointment_id, e),
        }

        Ok(cancelled)
    }

    async fn load(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        with_retry("load appointment", self.retry_attempts, || self.store.find_by_id(appointment_id))
            .await?
            .ok_or(AppointmentError::NotFound)
    }

    async fn restore(&self, appointment_id: Uuid, actor: &Actor) {
        if let Err(e) = self
            .store
            .update_state(appointment_id, AppointmentStatus::Confirmed, actor)
            .await
        {
            error!("Appointment {} left cancelled with its slot still reserved: {}", appointment_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{Duration, TimeZone};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 3, 10, 9, 0, 0).unwrap()
    }

    #[test]
    fn exactly_one_day_ahead_is_allowed() {
        assert!(check_cancellation_window(start(), start() - Duration::hours(24)).is_ok());
        assert!(check_cancellation_window(start(), start() - Duration::days(30)).is_ok());
    }

    #[test]
    fn partial_hours_are_truncated() {
        let now = start() - Duration::hours(24) + Duration::minutes(1);
        assert_matches!(
            check_cancellation_window(start(), now),
            Err(AppointmentError::CancellationWindowClosed { remaining_hours: 23 })
        );
    }

    #[test]
    fn past_appointments_cannot_be_cancelled() {
        let now = start() + Duration::hours(2);
        assert_matches!(
            check_cancellation_window(start(), now),
            Err(AppointmentError::CancellationWindowClosed { remaining_hours: -2 })
        );
    }
}
