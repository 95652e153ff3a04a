use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::state::AppointmentCellState;

/// Appointment and report routes with their full paths, ready to be merged
/// next to the nested doctor and patient routers.
pub fn appointment_routes(state: Arc<AppointmentCellState>) -> Router {
    Router::new()
        .route("/citas", post(handlers::book_appointment))
        .route(
            "/citas/{id}",
            get(handlers::get_appointment).patch(handlers::update_appointment_status),
        )
        .route("/doctores/{id}/citas", get(handlers::list_doctor_appointments))
        .route("/doctores/{id}/agenda", get(handlers::doctor_agenda))
        .route("/pacientes/{id}/citas", get(handlers::list_patient_appointments))
        .route("/reportes/citas-csv", post(handlers::request_patient_report))
        .route("/reportes/estado/{id}", get(handlers::report_status))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}
