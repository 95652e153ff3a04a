// libs/doctor-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::{Actor, User, ROLE_DOCTOR};
use shared_models::error::AppError;
use shared_models::pagination::PageParams;

use crate::models::{CreateSlotRequest, DoctorListQuery, DoctorRequest, SlotRangeQuery, SpecialtyRequest};
use crate::services::{AvailabilityService, DoctorService, SpecialtyService};
use crate::state::DoctorCellState;

fn require_admin(user: &User, action: &str) -> Result<(), AppError> {
    if !user.is_admin() {
        return Err(AppError::AccessDenied(format!("Only administrators can {}", action)));
    }
    Ok(())
}

/// Doctors manage their own slots; admins manage anyone's.
fn require_doctor_or_admin(user: &User, doctor_id: Uuid) -> Result<(), AppError> {
    let is_owner = user.has_role(ROLE_DOCTOR) && user.is(doctor_id);
    if !is_owner && !user.is_admin() {
        return Err(AppError::AccessDenied("Not authorized to manage this doctor's schedule".to_string()));
    }
    Ok(())
}

// ==============================================================================
// SPECIALTIES
// ==============================================================================

#[axum::debug_handler]
pub async fn list_specialties(
    State(state): State<Arc<DoctorCellState>>,
) -> Result<Json<Value>, AppError> {
    let specialties = SpecialtyService::new(&state).list_specialties().await?;
    Ok(Json(json!(specialties)))
}

#[axum::debug_handler]
pub async fn get_specialty(
    State(state): State<Arc<DoctorCellState>>,
    WithRejection(Path(specialty_id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<Value>, AppError> {
    let specialty = SpecialtyService::new(&state).get_specialty(specialty_id).await?;
    Ok(Json(json!(specialty)))
}

#[axum::debug_handler]
pub async fn create_specialty(
    State(state): State<Arc<DoctorCellState>>,
    Extension(user): Extension<User>,
    WithRejection(Json(request), _): WithRejection<Json<SpecialtyRequest>, AppError>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_admin(&user, "create specialties")?;
    request.validate()?;

    let specialty = SpecialtyService::new(&state)
        .create_specialty(request, &Actor::from(&user))
        .await?;

    Ok((StatusCode::CREATED, Json(json!(specialty))))
}

#[axum::debug_handler]
pub async fn update_specialty(
    State(state): State<Arc<DoctorCellState>>,
    Extension(user): Extension<User>,
    WithRejection(Path(specialty_id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(request), _): WithRejection<Json<SpecialtyRequest>, AppError>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user, "update specialties")?;
    request.validate()?;

    let specialty = SpecialtyService::new(&state)
        .update_specialty(specialty_id, request, &Actor::from(&user))
        .await?;

    Ok(Json(json!(specialty)))
}

#[axum::debug_handler]
pub async fn delete_specialty(
    State(state): State<Arc<DoctorCellState>>,
    Extension(user): Extension<User>,
    WithRejection(Path(specialty_id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<StatusCode, AppError> {
    require_admin(&user, "delete specialties")?;
    SpecialtyService::new(&state).delete_specialty(specialty_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ==============================================================================
// DOCTORS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<Arc<DoctorCellState>>,
    WithRejection(Query(query), _): WithRejection<Query<DoctorListQuery>, AppError>,
) -> Result<Json<Value>, AppError> {
    let page = PageParams {
        offset: query.offset,
        limit: query.limit,
    }
    .validate()?;

    let doctors = DoctorService::new(&state)
        .list_doctors(query.specialty_id, page)
        .await?;

    Ok(Json(json!(doctors)))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<Arc<DoctorCellState>>,
    WithRejection(Path(doctor_id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<Value>, AppError> {
    let doctor = DoctorService::new(&state).get_doctor(doctor_id).await?;
    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn create_doctor(
    State(state): State<Arc<DoctorCellState>>,
    Extension(user): Extension<User>,
    WithRejection(Json(request), _): WithRejection<Json<DoctorRequest>, AppError>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_admin(&user, "register doctors")?;
    request.validate()?;

    let doctor = DoctorService::new(&state)
        .create_doctor(request, &Actor::from(&user))
        .await?;

    Ok((StatusCode::CREATED, Json(json!(doctor))))
}

#[axum::debug_handler]
pub async fn update_doctor(
    State(state): State<Arc<DoctorCellState>>,
    Extension(user): Extension<User>,
    WithRejection(Path(doctor_id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(request), _): WithRejection<Json<DoctorRequest>, AppError>,
) -> Result<Json<Value>, AppError> {
    require_doctor_or_admin(&user, doctor_id)?;
    request.validate()?;

    let doctor = DoctorService::new(&state)
        .update_doctor(doctor_id, request, &Actor::from(&user))
        .await?;

    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn delete_doctor(
    State(state): State<Arc<DoctorCellState>>,
    Extension(user): Extension<User>,
    WithRejection(Path(doctor_id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<StatusCode, AppError> {
    require_admin(&user, "delete doctors")?;
    DoctorService::new(&state).delete_doctor(doctor_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ==============================================================================
// AVAILABILITY SLOTS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_doctor_slots(
    State(state): State<Arc<DoctorCellState>>,
    WithRejection(Path(doctor_id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Query(query), _): WithRejection<Query<SlotRangeQuery>, AppError>,
) -> Result<Json<Value>, AppError> {
    let slots = AvailabilityService::new(&state)
        .list_for_dates(doctor_id, query.start_date, query.end_date)
        .await?;
    Ok(Json(json!(slots)))
}

#[axum::debug_handler]
pub async fn create_slot(
    State(state): State<Arc<DoctorCellState>>,
    Extension(user): Extension<User>,
    WithRejection(Path(doctor_id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(request), _): WithRejection<Json<CreateSlotRequest>, AppError>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_doctor_or_admin(&user, doctor_id)?;

    if request.doctor_id.is_some_and(|body_doctor| body_doctor != doctor_id) {
        return Err(AppError::BadRequest(
            "doctorId in the body does not match the doctor in the path".to_string(),
        ));
    }

    let slot = AvailabilityService::new(&state)
        .create_slot(doctor_id, request.start_time, request.end_time, &Actor::from(&user))
        .await?;

    Ok((StatusCode::CREATED, Json(json!(slot))))
}

#[axum::debug_handler]
pub async fn delete_slot(
    State(state): State<Arc<DoctorCellState>>,
    Extension(user): Extension<User>,
    WithRejection(Path(slot_id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<StatusCode, AppError> {
    let service = AvailabilityService::new(&state);

    let slot = service.find_slot(slot_id).await?;
    require_doctor_or_admin(&user, slot.doctor_id)?;

    service.delete_slot(slot_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
