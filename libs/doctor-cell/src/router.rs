use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::state::DoctorCellState;

pub fn specialty_routes(state: Arc<DoctorCellState>) -> Router {
    let public_routes = Router::new()
        .route("/", get(handlers::list_specialties))
        .route("/{id}", get(handlers::get_specialty));

    let protected_routes = Router::new()
        .route("/", post(handlers::create_specialty))
        .route("/{id}", put(handlers::update_specialty))
        .route("/{id}", delete(handlers::delete_specialty))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

pub fn doctor_routes(state: Arc<DoctorCellState>) -> Router {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/", get(handlers::list_doctors))
        .route("/{id}", get(handlers::get_doctor))
        .route("/{id}/disponibilidades", get(handlers::list_doctor_slots));

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        .route("/", post(handlers::create_doctor))
        .route("/{id}", put(handlers::update_doctor))
        .route("/{id}", delete(handlers::delete_doctor))
        .route("/{id}/disponibilidades", post(handlers::create_slot))
        .route("/disponibilidades/{id}", delete(handlers::delete_slot))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
