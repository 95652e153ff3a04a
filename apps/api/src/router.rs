use std::sync::Arc;

use axum::{routing::get, Router};
use tracing::info;

use appointment_cell::router::appointment_routes;
use appointment_cell::{appointment_store_from_config, AppointmentCellState, AppointmentReferenceCheck};
use doctor_cell::router::{doctor_routes, specialty_routes};
use doctor_cell::{DoctorCellState, DoctorStores};
use notification_cell::notifier_from_config;
use patient_cell::router::patient_routes;
use patient_cell::{patient_store_from_config, PatientCellState};
use shared_config::AppConfig;

/// Wires every cell over the configured backend. The appointment store is
/// built first so doctor and patient deletions can consult it.
pub fn create_router(config: Arc<AppConfig>) -> Router {
    info!("Using {:?} storage", config.storage_backend);

    let appointment_store = appointment_store_from_config(&config);
    let references = Arc::new(AppointmentReferenceCheck::new(Arc::clone(&appointment_store)));

    let doctors = Arc::new(DoctorCellState::new(
        Arc::clone(&config),
        DoctorStores::from_config(&config),
        references.clone(),
    ));
    let patients = Arc::new(PatientCellState::new(
        Arc::clone(&config),
        patient_store_from_config(&config),
        references,
    ));
    let appointments = Arc::new(AppointmentCellState::new(
        Arc::clone(&config),
        appointment_store,
        Arc::clone(&doctors),
        Arc::clone(&patients),
        notifier_from_config(&config),
    ));

    let api = Router::new()
        .nest("/especialidades", specialty_routes(Arc::clone(&doctors)))
        .nest("/doctores", doctor_routes(doctors))
        .nest("/pacientes", patient_routes(patients))
        .merge(appointment_routes(appointments));

    Router::new()
        .route("/", get(|| async { "Medical appointments API is running!" }))
        .nest("/api/v1", api)
}
