mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::Duration;

use appointment_cell::{
    AppointmentError, AppointmentService, AppointmentStatus, BookingService, CancellationService,
};
use common::Clinic;
use shared_models::auth::Actor;

#[tokio::test]
async fn cancelling_well_ahead_frees_the_slot() {
    let clinic = Clinic::new().await;
    let slot = clinic.slot_in(30).await;
    let appointment = clinic.book(&slot).await;

    let cancelled = CancellationService::new(&clinic.state)
        .cancel_appointment(appointment.id, &clinic.patient_actor())
        .await
        .unwrap();

    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
    assert_eq!(cancelled.updated_by, Some(clinic.patient.id.to_string()));
    assert!(!clinic.slots().find_slot(slot.id).await.unwrap().reserved);

    let sent = clinic.notifier.wait_for(2).await;
    assert_eq!(sent.len(), 2);
    let notice = sent.iter().find(|n| n.subject == "Appointment cancelled").unwrap();
    assert_eq!(notice.recipient, "marta@example.com");
}

#[tokio::test]
async fn exactly_one_day_of_notice_is_enough() {
    let clinic = Clinic::new().await;
    let slot = clinic.slot_in(24).await;
    let appointment = clinic.book(&slot).await;

    let result = CancellationService::new(&clinic.state)
        .cancel_appointment(appointment.id, &Actor::system())
        .await;
    assert_matches!(result, Ok(a) if a.status == AppointmentStatus::Cancelled);
}

#[tokio::test]
async fn one_minute_short_of_a_day_is_refused_without_side_effects() {
    let clinic = Clinic::new().await;
    let slot = clinic.slot_in(24).await;
    let appointment = clinic.book(&slot).await;
    clinic.clock.advance(Duration::minutes(1));

    let result = CancellationService::new(&clinic.state)
        .cancel_appointment(appointment.id, &clinic.patient_actor())
        .await;

    assert_matches!(result, Err(AppointmentError::CancellationWindowClosed { remaining_hours: 23 }));

    let stored = AppointmentService::new(&clinic.state).get_appointment(appointment.id).await.unwrap();
    assert_eq!(stored.status, AppointmentStatus::Confirmed);
    assert!(clinic.slots().find_slot(slot.id).await.unwrap().reserved);
    assert_eq!(clinic.notifier.wait_for(1).await.len(), 1);
}

#[tokio::test]
async fn past_appointments_report_negative_hours() {
    let clinic = Clinic::new().await;
    let slot = clinic.slot_in(2).await;
    let appointment = clinic.book(&slot).await;
    clinic.clock.advance(Duration::hours(5));

    let result = CancellationService::new(&clinic.state)
        .cancel_appointment(appointment.id, &Actor::system())
        .await;
    assert_matches!(result, Err(AppointmentError::CancellationWindowClosed { remaining_hours: -3 }));
}

#[tokio::test]
async fn cancelled_is_terminal() {
    let clinic = Clinic::new().await;
    let slot = clinic.slot_in(48).await;
    let appointment = clinic.book(&slot).await;
    let service = CancellationService::new(&clinic.state);

    service.cancel_appointment(appointment.id, &Actor::system()).await.unwrap();
    assert_matches!(
        service.cancel_appointment(appointment.id, &Actor::system()).await,
        Err(AppointmentError::AlreadyCancelled)
    );
    assert_matches!(
        AppointmentService::new(&clinic.state)
            .mark_completed(appointment.id, &Actor::system())
            .await,
        Err(AppointmentError::AlreadyCancelled)
    );
}

#[tokio::test]
async fn completed_is_terminal() {
    let clinic = Clinic::new().await;
    let slot = clinic.slot_in(48).await;
    let appointment = clinic.book(&slot).await;

    let completed = AppointmentService::new(&clinic.state)
        .mark_completed(appointment.id, &Actor::system())
        .await
        .unwrap();
    assert_eq!(completed.status, AppointmentStatus::Completed);

    assert_matches!(
        CancellationService::new(&clinic.state)
            .cancel_appointment(appointment.id, &Actor::system())
            .await,
        Err(AppointmentError::AlreadyCompleted)
    );
    assert!(clinic.slots().find_slot(slot.id).await.unwrap().reserved);
}

#[tokio::test]
async fn unknown_appointment_is_not_found() {
    let clinic = Clinic::new().await;
    assert_matches!(
        CancellationService::new(&clinic.state)
            .cancel_appointment(uuid::Uuid::new_v4(), &Actor::system())
            .await,
        Err(AppointmentError::NotFound)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_cancellations_release_the_slot_once() {
    let clinic = Clinic::new().await;
    let slot = clinic.slot_in(72).await;
    let appointment = clinic.book(&slot).await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let state = Arc::clone(&clinic.state);
        handles.push(tokio::spawn(async move {
            CancellationService::new(&state)
                .cancel_appointment(appointment.id, &Actor::system())
                .await
        }));
    }

    let mut cancelled = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => cancelled += 1,
            Err(e) => assert_matches!(e, AppointmentError::AlreadyCancelled),
        }
    }

    assert_eq!(cancelled, 1);
    assert!(!clinic.slots().find_slot(slot.id).await.unwrap().reserved);
}

#[tokio::test]
async fn a_cancelled_slot_keeps_its_single_appointment() {
    let clinic = Clinic::new().await;
    let slot = clinic.slot_in(48).await;
    let appointment = clinic.book(&slot).await;
    CancellationService::new(&clinic.state)
        .cancel_appointment(appointment.id, &Actor::system())
        .await
        .unwrap();

    let rebook = BookingService::new(&clinic.state)
        .book_appointment(clinic.request_for(&slot), &clinic.patient_actor())
        .await;

    assert_matches!(rebook, Err(AppointmentError::SlotAlreadyBooked));
    assert!(!clinic.slots().find_slot(slot.id).await.unwrap().reserved);
}
