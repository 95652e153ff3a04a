use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::{Actor, User};
use shared_models::error::AppError;
use shared_models::pagination::PageParams;

use crate::models::{PatientListQuery, PatientRequest};
use crate::services::PatientService;
use crate::state::PatientCellState;

fn require_admin(user: &User, action: &str) -> Result<(), AppError> {
    if !user.is_admin() {
        return Err(AppError::AccessDenied(format!("Only administrators can {}", action)));
    }
    Ok(())
}

pub fn require_self_or_admin(user: &User, patient_id: Uuid) -> Result<(), AppError> {
    if !user.is(patient_id) && !user.is_admin() {
        return Err(AppError::AccessDenied("Not authorized to access this patient".to_string()));
    }
    Ok(())
}

#[axum::debug_handler]
pub async fn list_patients(
    State(state): State<Arc<PatientCellState>>,
    Extension(user): Extension<User>,
    WithRejection(Query(query), _): WithRejection<Query<PatientListQuery>, AppError>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user, "list patients")?;
    let page = PageParams {
        offset: query.offset,
        limit: query.limit,
    }
    .validate()?;

    let patients = PatientService::new(&state).list_patients(page).await?;
    Ok(Json(json!(patients)))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(state): State<Arc<PatientCellState>>,
    Extension(user): Extension<User>,
    WithRejection(Path(patient_id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<Value>, AppError> {
    require_self_or_admin(&user, patient_id)?;
    let patient = PatientService::new(&state).get_patient(patient_id).await?;
    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn create_patient(
    State(state): State<Arc<PatientCellState>>,
    Extension(user): Extension<User>,
    WithRejection(Json(request), _): WithRejection<Json<PatientRequest>, AppError>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_admin(&user, "register patients")?;
    request.validate()?;

    let patient = PatientService::new(&state)
        .create_patient(request, &Actor::from(&user))
        .await?;

    Ok((StatusCode::CREATED, Json(json!(patient))))
}

#[axum::debug_handler]
pub async fn update_patient(
    State(state): State<Arc<PatientCellState>>,
    Extension(user): Extension<User>,
    WithRejection(Path(patient_id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(request), _): WithRejection<Json<PatientRequest>, AppError>,
) -> Result<Json<Value>, AppError> {
    require_self_or_admin(&user, patient_id)?;
    request.validate()?;

    let patient = PatientService::new(&state)
        .update_patient(patient_id, request, &Actor::from(&user))
        .await?;

    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn delete_patient(
    State(state): State<Arc<PatientCellState>>,
    Extension(user): Extension<User>,
    WithRejection(Path(patient_id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<StatusCode, AppError> {
    require_admin(&user, "delete patients")?;
    PatientService::new(&state).delete_patient(patient_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
