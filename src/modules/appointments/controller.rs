use abroadly_core::{AppError, permissions};
use abroadly_models::{AppointmentId, UserRole};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;

use crate::metrics;
use crate::middleware::auth::{AuthUser, RequireAppointmentsReadAll};
use crate::modules::appointments::model::{
    AppointmentFilterParams, AppointmentStatus, AppointmentWithParties, BookAppointmentDto,
    PaginatedAppointmentsResponse, UpdateAppointmentStatusDto,
};
use crate::modules::appointments::service::AppointmentService;
use crate::modules::dashboard::service::DashboardService;
use crate::state::AppState;
use crate::utils::email::{BookingEmail, EmailService};
use crate::validator::ValidatedJson;

#[utoipa::path(
    post,
    path = "/api/appointments",
    request_body = BookAppointmentDto,
    responses(
        (status = 201, description = "Appointment booked", body = AppointmentWithParties),
        (status = 400, description = "Time is in the past or not an available slot"),
        (status = 403, description = "Only students can book"),
        (status = 404, description = "Consultant not found"),
        (status = 409, description = "Slot is no longer available")
    ),
    tag = "Appointments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn book_appointment(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<BookAppointmentDto>,
) -> Result<(StatusCode, Json<AppointmentWithParties>), AppError> {
    if auth_user.role() != Some(UserRole::Student) {
        return Err(AppError::forbidden("Only students can book appointments"));
    }

    let booked = AppointmentService::book(&state.db, auth_user.user_id()?, dto).await?;
    let appointment = &booked.appointment;

    metrics::track_appointment_booked(appointment.mode.as_str());
    EmailService::spawn_booking_confirmation(
        state.email_config.clone(),
        BookingEmail {
            student_name: booked.student_name.clone(),
            student_email: booked.student_email.clone(),
            consultant_name: booked.consultant_name.clone(),
            starts_at: appointment.starts_at,
            mode: appointment.mode.as_str().to_string(),
            awaiting_payment: appointment.status == AppointmentStatus::Pending,
        },
    );
    DashboardService::invalidate_cache(&state).await;

    Ok((StatusCode::CREATED, Json(booked)))
}

#[utoipa::path(
    get,
    path = "/api/appointments/me",
    responses(
        (status = 200, description = "Bookings made by or with the caller", body = Vec<AppointmentWithParties>)
    ),
    tag = "Appointments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn my_appointments(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<Vec<AppointmentWithParties>>, AppError> {
    let appointments = AppointmentService::list_for_user(&state.db, auth_user.user_id()?).await?;
    Ok(Json(appointments))
}

#[utoipa::path(
    get,
    path = "/api/appointments",
    params(AppointmentFilterParams),
    responses(
        (status = 200, description = "All appointments", body = PaginatedAppointmentsResponse),
        (status = 403, description = "Forbidden - requires appointments:read_all permission")
    ),
    tag = "Appointments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn list_appointments(
    State(state): State<AppState>,
    RequireAppointmentsReadAll(_auth_user): RequireAppointmentsReadAll,
    Query(filters): Query<AppointmentFilterParams>,
) -> Result<Json<PaginatedAppointmentsResponse>, AppError> {
    let appointments = AppointmentService::list_appointments(&state.db, filters).await?;
    Ok(Json(appointments))
}

#[utoipa::path(
    get,
    path = "/api/appointments/{id}",
    params(("id" = String, Path, description = "Appointment ID")),
    responses(
        (status = 200, description = "Appointment", body = AppointmentWithParties),
        (status = 404, description = "Appointment not found")
    ),
    tag = "Appointments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_appointment(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<AppointmentId>,
) -> Result<Json<AppointmentWithParties>, AppError> {
    let is_admin = auth_user.has_permission(permissions::APPOINTMENTS_READ_ALL);
    let appointment =
        AppointmentService::get_appointment(&state.db, auth_user.user_id()?, is_admin, id).await?;
    Ok(Json(appointment))
}

#[utoipa::path(
    patch,
    path = "/api/appointments/{id}/status",
    params(("id" = String, Path, description = "Appointment ID")),
    request_body = UpdateAppointmentStatusDto,
    responses(
        (status = 200, description = "Status changed", body = AppointmentWithParties),
        (status = 400, description = "Transition not allowed"),
        (status = 403, description = "Caller may not make this transition"),
        (status = 404, description = "Appointment not found")
    ),
    tag = "Appointments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn update_status(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<AppointmentId>,
    ValidatedJson(dto): ValidatedJson<UpdateAppointmentStatusDto>,
) -> Result<Json<AppointmentWithParties>, AppError> {
    let is_admin = auth_user.has_permission(permissions::APPOINTMENTS_READ_ALL);
    let appointment =
        AppointmentService::update_status(&state.db, auth_user.user_id()?, is_admin, id, dto)
            .await?;
    DashboardService::invalidate_cache(&state).await;
    Ok(Json(appointment))
}
