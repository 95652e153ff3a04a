use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    Json,
};
use axum_extra::extract::WithRejection;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use patient_cell::handlers::require_self_or_admin;
use shared_models::auth::{Actor, User, ROLE_DOCTOR};
use shared_models::error::AppError;
use shared_models::pagination::{PageParams, PageRequest};

use crate::models::{
    AgendaQuery, AppointmentError, AppointmentListQuery, AppointmentStatus, CreateAppointmentRequest, ReportQuery,
    UpdateAppointmentStatusRequest,
};
use crate::services::{AppointmentService, BookingService, CancellationService, ReportService};
use crate::state::AppointmentCellState;

fn require_doctor_or_admin(user: &User, doctor_id: Uuid) -> Result<(), AppError> {
    let is_owner = user.has_role(ROLE_DOCTOR) && user.is(doctor_id);
    if !is_owner && !user.is_admin() {
        return Err(AppError::AccessDenied("Not authorized to view this doctor's appointments".to_string()));
    }
    Ok(())
}

fn page_of(query: &AppointmentListQuery) -> Result<PageRequest, AppError> {
    PageParams {
        offset: query.offset,
        limit: query.limit,
    }
    .validate()
}

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppointmentCellState>>,
    Extension(user): Extension<User>,
    WithRejection(Json(request), _): WithRejection<Json<CreateAppointmentRequest>, AppError>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_self_or_admin(&user, request.patient_id)?;
    request.validate()?;

    let appointment = BookingService::new(&state)
        .book_appointment(request, &Actor::from(&user))
        .await?;

    Ok((StatusCode::CREATED, Json(json!(appointment))))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppointmentCellState>>,
    Extension(user): Extension<User>,
    WithRejection(Path(appointment_id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<Value>, AppError> {
    let appointment = AppointmentService::new(&state).get_appointment(appointment_id).await?;

    if !appointment.involves_user(&user) && !user.is_admin() {
        return Err(AppError::AccessDenied("Not authorized to view this appointment".to_string()));
    }

    Ok(Json(json!(appointment)))
}

/// Only cancellation can be requested here.
#[axum::debug_handler]
pub async fn update_appointment_status(
    State(state): State<Arc<AppointmentCellState>>,
    Extension(user): Extension<User>,
    WithRejection(Path(appointment_id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(request), _): WithRejection<Json<UpdateAppointmentStatusRequest>, AppError>,
) -> Result<Json<Value>, AppError> {
    if request.status != AppointmentStatus::Cancelled {
        return Err(AppointmentError::UnsupportedStatus(request.status).into());
    }

    let appointment = AppointmentService::new(&state).get_appointment(appointment_id).await?;
    if !appointment.involves_user(&user) && !user.is_admin() {
        return Err(AppError::AccessDenied("Not authorized to cancel this appointment".to_string()));
    }

    let cancelled = CancellationService::new(&state)
        .cancel_appointment(appointment_id, &Actor::from(&user))
        .await?;

    Ok(Json(json!(cancelled)))
}

// ==============================================================================
// LISTINGS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_doctor_appointments(
    State(state): State<Arc<AppointmentCellState>>,
    Extension(user): Extension<User>,
    WithRejection(Path(doctor_id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Query(query), _): WithRejection<Query<AppointmentListQuery>, AppError>,
) -> Result<Json<Value>, AppError> {
    require_doctor_or_admin(&user, doctor_id)?;
    let page = page_of(&query)?;

    let appointments = AppointmentService::new(&state).list_for_doctor(doctor_id, page).await?;
    Ok(Json(json!(appointments)))
}

#[axum::debug_handler]
pub async fn doctor_agenda(
    State(state): State<Arc<AppointmentCellState>>,
    Extension(user): Extension<User>,
    WithRejection(Path(doctor_id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Query(query), _): WithRejection<Query<AgendaQuery>, AppError>,
) -> Result<Json<Value>, AppError> {
    require_doctor_or_admin(&user, doctor_id)?;

    let agenda = AppointmentService::new(&state)
        .doctor_agenda(doctor_id, query.start, query.end)
        .await?;
    Ok(Json(json!(agenda)))
}

/// Plain list body; the paging totals travel in response headers.
#[axum::debug_handler]
pub async fn list_patient_appointments(
    State(state): State<Arc<AppointmentCellState>>,
    Extension(user): Extension<User>,
    WithRejection(Path(patient_id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Query(query), _): WithRejection<Query<AppointmentListQuery>, AppError>,
) -> Result<(HeaderMap, Json<Value>), AppError> {
    require_self_or_admin(&user, patient_id)?;
    let page = page_of(&query)?;

    let appointments = AppointmentService::new(&state).list_for_patient(patient_id, page).await?;
    debug!(
        "Patient {} has {} appointments",
        patient_id, appointments.metadata.total_elements
    );

    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static("x-total-count"),
        HeaderValue::from(appointments.metadata.total_elements),
    );
    headers.insert(
        HeaderName::from_static("x-total-pages"),
        HeaderValue::from(appointments.metadata.total_pages),
    );
    headers.insert(
        HeaderName::from_static("x-current-page"),
        HeaderValue::from(appointments.metadata.current_page),
    );

    Ok((headers, Json(json!(appointments.content))))
}

// ==============================================================================
// REPORTS
// ==============================================================================

#[axum::debug_handler]
pub async fn request_patient_report(
    State(state): State<Arc<AppointmentCellState>>,
    Extension(user): Extension<User>,
    WithRejection(Query(query), _): WithRejection<Query<ReportQuery>, AppError>,
) -> Result<(StatusCode, HeaderMap, Json<Value>), AppError> {
    require_self_or_admin(&user, query.patient_id)?;

    let job = ReportService::new(&state).request_patient_report(query.patient_id).await?;

    let location = format!("/api/v1/reportes/estado/{}", job.id);
    let mut headers = HeaderMap::new();
    headers.insert(
        header::LOCATION,
        HeaderValue::from_str(&location).map_err(|e| AppError::Internal(e.to_string()))?,
    );

    Ok((StatusCode::ACCEPTED, headers, Json(json!(job))))
}

#[axum::debug_handler]
pub async fn report_status(
    State(state): State<Arc<AppointmentCellState>>,
    WithRejection(Path(job_id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<Value>, AppError> {
    let job = ReportService::new(&state).job_status(job_id).await?;
    Ok(Json(json!(job)))
}
