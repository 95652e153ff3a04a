mod common;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration as StdDuration, Instant};

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::store::memory::InMemoryAppointmentStore;
use appointment_cell::store::AppointmentStore;
use appointment_cell::{Appointment, AppointmentError, AppointmentStatus, BookingService, CancellationService};
use common::Clinic;
use notification_cell::services::email::EmailNotifier;
use notification_cell::services::gateway::GatewayClient;
use notification_cell::testing::RecordingNotifier;
use notification_cell::NotificationChannel;
use shared_models::auth::Actor;
use shared_models::pagination::{Page, PageRequest};

#[tokio::test]
async fn booking_reserves_the_slot_and_notifies_the_patient() {
    let clinic = Clinic::new().await;
    let slot = clinic.slot_in(48).await;

    let appointment = clinic.book(&slot).await;

    assert_eq!(appointment.status, AppointmentStatus::Confirmed);
    assert_eq!(appointment.slot_id, slot.id);
    assert_eq!(appointment.start_time, slot.start_time);
    assert_eq!(appointment.end_time, slot.end_time);
    assert_eq!(appointment.updated_by, Some(clinic.patient.id.to_string()));
    assert_eq!(appointment.created_at, common::clinic_now());
    assert_eq!(appointment.updated_at, common::clinic_now());
    assert!(clinic.slots().find_slot(slot.id).await.unwrap().reserved);

    let sent = clinic.notifier.wait_for(1).await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient, "marta@example.com");
    assert_eq!(sent[0].subject, "Appointment confirmed");
    assert!(sent[0].body.contains("Ana Lopez"));
    assert!(sent[0].body.contains(&appointment.id.to_string()));
}

#[tokio::test]
async fn blank_reason_is_stored_as_none() {
    let clinic = Clinic::new().await;
    let slot = clinic.slot_in(48).await;
    let mut request = clinic.request_for(&slot);
    request.reason = Some("   ".to_string());

    let appointment = BookingService::new(&clinic.state)
        .book_appointment(request, &clinic.patient_actor())
        .await
        .unwrap();
    assert_eq!(appointment.reason, None);
}

#[tokio::test]
async fn unknown_references_are_not_found() {
    let clinic = Clinic::new().await;
    let slot = clinic.slot_in(48).await;
    let service = BookingService::new(&clinic.state);

    let mut request = clinic.request_for(&slot);
    request.doctor_id = Uuid::new_v4();
    assert_matches!(
        service.book_appointment(request, &Actor::system()).await,
        Err(AppointmentError::DoctorNotFound)
    );

    let mut request = clinic.request_for(&slot);
    request.patient_id = Uuid::new_v4();
    assert_matches!(
        service.book_appointment(request, &Actor::system()).await,
        Err(AppointmentError::PatientNotFound)
    );

    let mut request = clinic.request_for(&slot);
    request.slot_id = Uuid::new_v4();
    assert_matches!(
        service.book_appointment(request, &Actor::system()).await,
        Err(AppointmentError::SlotNotAvailable)
    );

    assert!(clinic.notifier.sent().await.is_empty());
}

#[tokio::test]
async fn slot_of_another_doctor_is_rejected_untouched() {
    let clinic = Clinic::new().await;
    let other = clinic.second_doctor().await;
    let foreign_slot = clinic.slot_for(other.id, common::clinic_now() + chrono::Duration::hours(48)).await;

    let mut request = clinic.request_for(&foreign_slot);
    request.doctor_id = clinic.doctor.id;

    let result = BookingService::new(&clinic.state)
        .book_appointment(request, &Actor::system())
        .await;

    assert_matches!(result, Err(AppointmentError::SlotDoctorMismatch));
    assert!(!clinic.slots().find_slot(foreign_slot.id).await.unwrap().reserved);
}

#[tokio::test]
async fn a_booked_slot_is_no_longer_available() {
    let clinic = Clinic::new().await;
    let slot = clinic.slot_in(48).await;
    clinic.book(&slot).await;

    let second = BookingService::new(&clinic.state)
        .book_appointment(clinic.request_for(&slot), &clinic.patient_actor())
        .await;
    assert_matches!(second, Err(AppointmentError::SlotNotAvailable));
    assert!(clinic.state.store.exists_for_slot(slot.id).await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_bookings_of_one_slot_produce_one_appointment() {
    let clinic = Clinic::new().await;
    let slot = clinic.slot_in(48).await;

    let mut handles = Vec::new();
    for _ in 0..16 {
        let state = Arc::clone(&clinic.state);
        let request = clinic.request_for(&slot);
        handles.push(tokio::spawn(async move {
            BookingService::new(&state).book_appointment(request, &Actor::system()).await
        }));
    }

    let mut booked = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => booked += 1,
            Err(e) => assert_matches!(e, AppointmentError::SlotNotAvailable | AppointmentError::SlotAlreadyBooked),
        }
    }

    assert_eq!(booked, 1);
    let all = clinic.state.store.list_all_by_patient(clinic.patient.id).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(clinic.notifier.wait_for(1).await.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn loser_of_a_simultaneous_booking_gets_a_conflict() {
    let clinic = Clinic::new().await;
    let slot = clinic.slot_in(48).await;

    // both contenders pass the availability check and queue on the slot lock
    let held = clinic.state.locks.lock(slot.id).await;
    let contenders: Vec<_> = (0..2)
        .map(|_| {
            let state = Arc::clone(&clinic.state);
            let request = clinic.request_for(&slot);
            tokio::spawn(async move { BookingService::new(&state).book_appointment(request, &Actor::system()).await })
        })
        .collect();
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    drop(held);

    let mut outcomes = Vec::new();
    for contender in contenders {
        outcomes.push(contender.await.unwrap());
    }

    assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .any(|o| matches!(o, Err(AppointmentError::SlotAlreadyBooked))));
    assert_eq!(clinic.state.store.list_all_by_patient(clinic.patient.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn notification_failure_does_not_fail_the_booking() {
    let clinic = Clinic::with_notifier(RecordingNotifier::failing()).await;
    let slot = clinic.slot_in(48).await;

    let appointment = clinic.book(&slot).await;
    assert_eq!(appointment.status, AppointmentStatus::Confirmed);
}

#[tokio::test]
async fn booking_answers_before_a_slow_gateway_does() {
    let gateway = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(202).set_delay(StdDuration::from_secs(5)))
        .mount(&gateway)
        .await;

    let email = EmailNotifier::new(Some(GatewayClient::new(format!("{}/messages", gateway.uri()))));
    let clinic = Clinic::with_live_notifier(Arc::new(email)).await;
    let slot = clinic.slot_in(48).await;

    let started = Instant::now();
    let appointment = clinic.book(&slot).await;

    assert!(started.elapsed() < StdDuration::from_secs(2), "booking waited {:?}", started.elapsed());
    assert_eq!(appointment.status, AppointmentStatus::Confirmed);
    assert!(clinic.slots().find_slot(slot.id).await.unwrap().reserved);
}

#[tokio::test]
async fn sms_channel_uses_the_patient_phone() {
    let clinic = Clinic::with_notifier(RecordingNotifier::with_channel(NotificationChannel::Sms)).await;
    let slot = clinic.slot_in(48).await;

    clinic.book(&slot).await;
    let sent = clinic.notifier.wait_for(1).await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient, "600123456");
}

// ==============================================================================
// STORE FAILURES
// ==============================================================================

#[derive(Clone, Copy)]
enum CreateFault {
    /// Inserts behave normally; only counted.
    None,
    /// Every insert fails permanently.
    Broken,
    /// The first insert fails before writing.
    DropsFirst,
    /// The first insert is written but its response is lost.
    LosesFirstResponse,
}

struct FaultyStore {
    inner: InMemoryAppointmentStore,
    fault: CreateFault,
    creates: AtomicU32,
}

impl FaultyStore {
    fn new(fault: CreateFault) -> Self {
        Self {
            inner: InMemoryAppointmentStore::default(),
            fault,
            creates: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl AppointmentStore for FaultyStore {
    async fn create(&self, appointment: Appointment) -> Result<Appointment, AppointmentError> {
        let attempt = self.creates.fetch_add(1, Ordering::SeqCst);
        match self.fault {
            CreateFault::Broken => Err(AppointmentError::DatabaseError("disk full".to_string())),
            CreateFault::DropsFirst if attempt == 0 => Err(AppointmentError::Unavailable("reset".to_string())),
            CreateFault::LosesFirstResponse if attempt == 0 => {
                self.inner.create(appointment).await?;
                Err(AppointmentError::Unavailable("timed out".to_string()))
            }
            _ => self.inner.create(appointment).await,
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, AppointmentError> {
        self.inner.find_by_id(id).await
    }

    async fn update_state(
        &self,
        id: Uuid,
        status: AppointmentStatus,
        actor: &Actor,
    ) -> Result<Appointment, AppointmentError> {
        self.inner.update_state(id, status, actor).await
    }

    async fn list_by_patient(&self, patient_id: Uuid, page: PageRequest) -> Result<Page<Appointment>, AppointmentError> {
        self.inner.list_by_patient(patient_id, page).await
    }

    async fn list_by_doctor(&self, doctor_id: Uuid, page: PageRequest) -> Result<Page<Appointment>, AppointmentError> {
        self.inner.list_by_doctor(doctor_id, page).await
    }

    async fn list_confirmed_by_doctor_in_range(
        &self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        self.inner.list_confirmed_by_doctor_in_range(doctor_id, start, end).await
    }

    async fn list_all_by_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        self.inner.list_all_by_patient(patient_id).await
    }

    async fn exists_for_slot(&self, slot_id: Uuid) -> Result<bool, AppointmentError> {
        self.inner.exists_for_slot(slot_id).await
    }

    async fn exists_for_doctor(&self, doctor_id: Uuid) -> Result<bool, AppointmentError> {
        self.inner.exists_for_doctor(doctor_id).await
    }

    async fn exists_for_patient(&self, patient_id: Uuid) -> Result<bool, AppointmentError> {
        self.inner.exists_for_patient(patient_id).await
    }
}

#[tokio::test]
async fn failed_insert_releases_the_slot() {
    let clinic = Clinic::with_store(Arc::new(FaultyStore::new(CreateFault::Broken))).await;
    let slot = clinic.slot_in(48).await;

    let result = BookingService::new(&clinic.state)
        .book_appointment(clinic.request_for(&slot), &Actor::system())
        .await;

    assert_matches!(result, Err(AppointmentError::DatabaseError(_)));
    assert!(!clinic.slots().find_slot(slot.id).await.unwrap().reserved);
    assert!(clinic.notifier.sent().await.is_empty());
}

#[tokio::test]
async fn transient_insert_failure_is_retried() {
    let store = Arc::new(FaultyStore::new(CreateFault::DropsFirst));
    let clinic = Clinic::with_store(store.clone()).await;
    let slot = clinic.slot_in(48).await;

    let appointment = clinic.book(&slot).await;

    assert_eq!(store.creates.load(Ordering::SeqCst), 2);
    assert_eq!(appointment.slot_id, slot.id);
    assert!(clinic.slots().find_slot(slot.id).await.unwrap().reserved);
}

#[tokio::test]
async fn lost_insert_response_is_recovered_without_a_duplicate() {
    let store = Arc::new(FaultyStore::new(CreateFault::LosesFirstResponse));
    let clinic = Clinic::with_store(store.clone()).await;
    let slot = clinic.slot_in(48).await;

    let appointment = clinic.book(&slot).await;

    let stored = clinic.state.store.list_all_by_patient(clinic.patient.id).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, appointment.id);
    assert!(clinic.slots().find_slot(slot.id).await.unwrap().reserved);
}

#[tokio::test]
async fn slot_freed_by_cancellation_is_refused_without_a_reservation() {
    let store = Arc::new(FaultyStore::new(CreateFault::None));
    let clinic = Clinic::with_store(store.clone()).await;
    let slot = clinic.slot_in(48).await;
    let appointment = clinic.book(&slot).await;
    CancellationService::new(&clinic.state)
        .cancel_appointment(appointment.id, &Actor::system())
        .await
        .unwrap();
    let released = clinic.slots().find_slot(slot.id).await.unwrap();

    let rebook = BookingService::new(&clinic.state)
        .book_appointment(clinic.request_for(&slot), &clinic.patient_actor())
        .await;

    assert_matches!(rebook, Err(AppointmentError::SlotAlreadyBooked));
    assert_eq!(store.creates.load(Ordering::SeqCst), 1);
    let after = clinic.slots().find_slot(slot.id).await.unwrap();
    assert!(!after.reserved);
    assert_eq!(after.updated_at, released.updated_at);
}
