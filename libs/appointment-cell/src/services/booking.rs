use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use doctor_cell::{AvailabilityService, AvailabilitySlot, DoctorService};
use notification_cell::Notifier;
use patient_cell::PatientService;
use shared_database::with_retry;
use shared_models::auth::Actor;

use crate::models::{Appointment, AppointmentError, AppointmentStatus, CreateAppointmentRequest};
use crate::services::clock::Clock;
use crate::services::locks::SlotLockRegistry;
use crate::services::notices;
use crate::state::AppointmentCellState;
use crate::store::AppointmentStore;

/// Books a slot for a patient. Availability is checked once up front and again
/// under the slot's lock, together with the reservation and the appointment
/// insert; the confirmation notification is sent after the lock is released.
pub struct BookingService {
    store: Arc<dyn AppointmentStore>,
    doctors: DoctorService,
    patients: PatientService,
    slots: AvailabilityService,
    notifier: Arc<dyn Notifier>,
    locks: Arc<SlotLockRegistry>,
    clock: Arc<dyn Clock>,
    retry_attempts: u32,
}

impl BookingService {
    pub fn new(state: &AppointmentCellState) -> Self {
        Self {
            store: Arc::clone(&state.store),
            doctors: DoctorService::new(&state.doctors),
            patients: PatientService::new(&state.patients),
            slots: AvailabilityService::new(&state.doctors),
            notifier: Arc::clone(&state.notifier),
            locks: Arc::clone(&state.locks),
            clock: Arc::clone(&state.clock),
            retry_attempts: state.config.store_retry_attempts,
        }
    }

    #[instrument(skip(self, request, actor), fields(doctor_id = %request.doctor_id, slot_id = %request.slot_id))]
    pub async fn book_appointment(
        &self,
        request: CreateAppointmentRequest,
        actor: &Actor,
    ) -> Result<Appointment, AppointmentError> {
        info!("Booking appointment for patient {}", request.patient_id);

        let doctor = with_retry("load doctor", self.retry_attempts, || {
            self.doctors.get_doctor(request.doctor_id)
        })
        .await?;

        let patient = with_retry("load patient", self.retry_attempts, || {
            self.patients.get_patient(request.patient_id)
        })
        .await?;

        // a slot that is already gone is reported as not available
        let slot = self.available_slot(request.slot_id).await?;
        if slot.doctor_id != doctor.id {
            warn!("Slot {} belongs to doctor {}, not {}", slot.id, slot.doctor_id, doctor.id);
            return Err(AppointmentError::SlotDoctorMismatch);
        }

        let appointment = {
            let _slot_guard = self.locks.lock(request.slot_id).await;

            // available a moment ago, so a miss here means another booking won
            let slot = match self.available_slot(request.slot_id).await {
                Ok(slot) => slot,
                Err(AppointmentError::SlotNotAvailable) => {
                    warn!("Slot {} was booked concurrently", request.slot_id);
                    return Err(AppointmentError::SlotAlreadyBooked);
                }
                Err(e) => return Err(e),
            };

            // a slot freed by cancellation still carries its appointment
            let taken = with_retry("check slot history", self.retry_attempts, || {
                self.store.exists_for_slot(slot.id)
            })
            .await?;
            if taken {
                warn!("Slot {} already has an appointment", slot.id);
                return Err(AppointmentError::SlotAlreadyBooked);
            }

            // single CAS; a lost response must not be replayed as a second reservation
            self.slots.reserve(slot.id, actor).await.map_err(|e| {
                warn!("Could not reserve slot {}: {}", slot.id, e);
                AppointmentError::from(e)
            })?;

            let now = self.clock.now();
            let pending = Appointment {
                id: Uuid::new_v4(),
                doctor_id: doctor.id,
                patient_id: patient.id,
                slot_id: slot.id,
                reason: request.reason.clone().filter(|r| !r.trim().is_empty()),
                status: AppointmentStatus::Confirmed,
                start_time: slot.start_time,
                end_time: slot.end_time,
                created_at: now,
                updated_at: now,
                updated_by: actor.to_audit(),
            };

            match self.insert(pending).await {
                Ok(appointment) => appointment,
                Err(e) => {
                    self.compensate(slot.id, actor).await;
                    return Err(e);
                }
            }
        };

        info!("Appointment {} confirmed for slot {}", appointment.id, appointment.slot_id);

        let notice = notices::booking_confirmed(&appointment, &doctor, &patient);
        notices::dispatch(Arc::clone(&self.notifier), patient, notice);

        Ok(appointment)
    }

    async fn available_slot(&self, slot_id: Uuid) -> Result<AvailabilitySlot, AppointmentError> {
        with_retry("load slot", self.retry_attempts, || self.slots.get_available_slot(slot_id))
            .await
            .map_err(AppointmentError::from)
    }

    /// Inserts with retry. A retry that trips the slot uniqueness check is
    /// resolved by looking for the row the earlier attempt may have written.
    async fn insert(&self, appointment: Appointment) -> Result<Appointment, AppointmentError> {
        let id = appointment.id;
        let result = with_retry("insert appointment", self.retry_attempts, || {
            self.store.create(appointment.clone())
        })
        .await;

        match result {
            Err(AppointmentError::SlotAlreadyBooked) => match self.store.find_by_id(id).await {
                Ok(Some(existing)) => {
                    debug!("Appointment {} was written by an earlier attempt", id);
                    Ok(existing)
                }
                _ => Err(AppointmentError::SlotAlreadyBooked),
            },
            other => other,
        }
    }

    async fn compensate(&self, slot_id: Uuid, actor: &Actor) {
        match self.slots.release(slot_id, actor).await {
            Ok(_) => info!("Released slot {} after failed booking", slot_id),
            Err(e) => error!("Slot {} stays reserved after failed booking: {}", slot_id, e),
        }
    }
}
