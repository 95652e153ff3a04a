#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use appointment_cell::store::memory::InMemoryAppointmentStore;
use appointment_cell::store::AppointmentStore;
use appointment_cell::{
    Appointment, AppointmentCellState, AppointmentReferenceCheck, BookingService, Clock, CreateAppointmentRequest,
    FixedClock,
};
use doctor_cell::{
    AvailabilityService, AvailabilitySlot, Doctor, DoctorCellState, DoctorRequest, DoctorService, DoctorStores,
    SpecialtyRequest, SpecialtyService,
};
use notification_cell::testing::RecordingNotifier;
use notification_cell::Notifier;
use patient_cell::store::memory::InMemoryPatientStore;
use patient_cell::{Patient, PatientCellState, PatientRequest, PatientService};
use shared_config::AppConfig;
use shared_models::auth::Actor;
use shared_utils::test_utils::TestConfig;

pub fn clinic_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 3, 1, 8, 0, 0).unwrap()
}

/// A fully wired in-memory clinic with one specialty, one doctor and one patient.
pub struct Clinic {
    pub state: Arc<AppointmentCellState>,
    pub notifier: Arc<RecordingNotifier>,
    pub clock: Arc<FixedClock>,
    pub doctor: Doctor,
    pub patient: Patient,
}

impl Clinic {
    pub async fn new() -> Self {
        Self::build(TestConfig::default().to_app_config(), Arc::new(RecordingNotifier::new())).await
    }

    pub async fn with_notifier(notifier: RecordingNotifier) -> Self {
        Self::build(TestConfig::default().to_app_config(), Arc::new(notifier)).await
    }

    pub async fn with_config(config: AppConfig) -> Self {
        Self::build(config, Arc::new(RecordingNotifier::new())).await
    }

    pub async fn with_store(store: Arc<dyn AppointmentStore>) -> Self {
        let recorder = Arc::new(RecordingNotifier::new());
        Self::assemble(TestConfig::default().to_app_config(), recorder.clone(), recorder, store).await
    }

    /// Wires a real notifier; `notifier` then records nothing.
    pub async fn with_live_notifier(live: Arc<dyn Notifier>) -> Self {
        let store = Arc::new(InMemoryAppointmentStore::default());
        Self::assemble(TestConfig::default().to_app_config(), Arc::new(RecordingNotifier::new()), live, store).await
    }

    async fn build(config: AppConfig, notifier: Arc<RecordingNotifier>) -> Self {
        let store = Arc::new(InMemoryAppointmentStore::default());
        Self::assemble(config, notifier.clone(), notifier, store).await
    }

    async fn assemble(
        config: AppConfig,
        notifier: Arc<RecordingNotifier>,
        active: Arc<dyn Notifier>,
        store: Arc<dyn AppointmentStore>,
    ) -> Self {
        let config = Arc::new(config);
        let references = Arc::new(AppointmentReferenceCheck::new(Arc::clone(&store)));

        let doctors = Arc::new(DoctorCellState::new(
            Arc::clone(&config),
            DoctorStores::in_memory(),
            references.clone(),
        ));
        let patients = Arc::new(PatientCellState::new(
            Arc::clone(&config),
            Arc::new(InMemoryPatientStore::default()),
            references,
        ));

        let clock = Arc::new(FixedClock::new(clinic_now()));
        let state = Arc::new(
            AppointmentCellState::new(config, store, Arc::clone(&doctors), Arc::clone(&patients), active)
                .with_clock(clock.clone()),
        );

        let specialty = SpecialtyService::new(&doctors)
            .create_specialty(
                SpecialtyRequest {
                    name: "Cardiologia".to_string(),
                },
                &Actor::system(),
            )
            .await
            .unwrap();

        let doctor = DoctorService::new(&doctors)
            .create_doctor(
                DoctorRequest {
                    first_name: "Ana".to_string(),
                    last_name: "Lopez".to_string(),
                    email: "ana.lopez@clinic.example".to_string(),
                    specialty_id: specialty.id,
                    profile_image_url: None,
                    biography: None,
                },
                &Actor::system(),
            )
            .await
            .unwrap();

        let patient = PatientService::new(&patients)
            .create_patient(
                PatientRequest {
                    first_name: "Marta".to_string(),
                    last_name: "Ruiz".to_string(),
                    email: "marta@example.com".to_string(),
                    phone: Some("600123456".to_string()),
                },
                &Actor::system(),
            )
            .await
            .unwrap();

        Self {
            state,
            notifier,
            clock,
            doctor,
            patient,
        }
    }

    pub fn slots(&self) -> AvailabilityService {
        AvailabilityService::new(&self.state.doctors)
    }

    /// A half-hour slot of the clinic doctor starting `hours` after the clock.
    pub async fn slot_in(&self, hours: i64) -> AvailabilitySlot {
        self.slot_for(self.doctor.id, self.clock.now() + Duration::hours(hours)).await
    }

    pub async fn slot_for(&self, doctor_id: uuid::Uuid, start: DateTime<Utc>) -> AvailabilitySlot {
        self.slots()
            .create_slot(doctor_id, start, start + Duration::minutes(30), &Actor::system())
            .await
            .unwrap()
    }

    pub async fn second_doctor(&self) -> Doctor {
        DoctorService::new(&self.state.doctors)
            .create_doctor(
                DoctorRequest {
                    first_name: "Luis".to_string(),
                    last_name: "Garcia".to_string(),
                    email: "luis.garcia@clinic.example".to_string(),
                    specialty_id: self.doctor.specialty_id,
                    profile_image_url: None,
                    biography: None,
                },
                &Actor::system(),
            )
            .await
            .unwrap()
    }

    pub fn request_for(&self, slot: &AvailabilitySlot) -> CreateAppointmentRequest {
        CreateAppointmentRequest {
            doctor_id: slot.doctor_id,
            patient_id: self.patient.id,
            slot_id: slot.id,
            reason: Some("Revision anual".to_string()),
        }
    }

    pub async fn book(&self, slot: &AvailabilitySlot) -> Appointment {
        BookingService::new(&self.state)
            .book_appointment(self.request_for(slot), &Actor::user(self.patient.id.to_string()))
            .await
            .unwrap()
    }

    pub fn patient_actor(&self) -> Actor {
        Actor::user(self.patient.id.to_string())
    }
}
