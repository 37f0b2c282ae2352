use abroadly_core::{AppError, PaginationMeta};
use abroadly_models::{AppointmentId, ConsultantId, UserId};
use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument};

use crate::modules::appointments::model::{
    APPOINTMENT_COLUMNS, Appointment, AppointmentFilterParams, AppointmentStatus,
    AppointmentWithParties, BookAppointmentDto, PaginatedAppointmentsResponse,
    UpdateAppointmentStatusDto,
};
use crate::modules::appointments::transitions::{self, Actor, TransitionError};
use crate::modules::consultants::model::{CONSULTANT_COLUMNS, Consultant};
use crate::modules::consultants::service::ConsultantService;
use crate::modules::consultants::slots::{self, Window};

/// Select list for [`AppointmentWithParties`]; aliases `a`, `c`, `su`, `cu`.
pub(crate) fn with_parties_select() -> String {
    format!(
        "SELECT {APPOINTMENT_COLUMNS},
                su.first_name || ' ' || su.last_name AS student_name,
                su.email AS student_email,
                cu.first_name || ' ' || cu.last_name AS consultant_name
         FROM appointments a
         JOIN users su ON su.id = a.student_id
         JOIN consultants c ON c.id = a.consultant_id
         JOIN users cu ON cu.id = c.user_id"
    )
}

fn not_found() -> AppError {
    AppError::not_found(anyhow::anyhow!("Appointment not found"))
}

pub struct AppointmentService;

impl AppointmentService {
    /// Books a slot. The consultant row is locked for the duration of the
    /// overlap check so two concurrent bookings cannot take the same slot.
    #[instrument(skip(db, dto), fields(consultant_id = %dto.consultant_id))]
    pub async fn book(
        db: &PgPool,
        student_id: UserId,
        dto: BookAppointmentDto,
    ) -> Result<AppointmentWithParties, AppError> {
        if dto.starts_at <= Utc::now() {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Appointment must start in the future"
            )));
        }

        let mut tx = db.begin().await?;

        let consultant = sqlx::query_as::<_, Consultant>(&format!(
            "SELECT {CONSULTANT_COLUMNS} FROM consultants c WHERE c.id = $1 FOR UPDATE"
        ))
        .bind(dto.consultant_id)
        .fetch_optional(&mut *tx)
        .await?
        .filter(|c| c.is_active)
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Consultant not found")))?;

        if consultant.user_id == student_id {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "You cannot book an appointment with yourself"
            )));
        }

        let windows: Vec<Window> = ConsultantService::load_rules(&mut tx, consultant.id)
            .await?
            .iter()
            .filter_map(Window::from_rule)
            .collect();

        let slot = slots::slot_at(&windows, consultant.slot_minutes, dto.starts_at).ok_or_else(
            || AppError::bad_request(anyhow::anyhow!("Requested time is not an available slot")),
        )?;

        let busy =
            ConsultantService::busy_intervals(&mut tx, consultant.id, slot.starts_at, slot.ends_at)
                .await?;
        if !busy.is_empty() {
            return Err(AppError::conflict(anyhow::anyhow!(
                "Slot is no longer available"
            )));
        }

        let status = if consultant.fee_cents == 0 {
            AppointmentStatus::Confirmed
        } else {
            AppointmentStatus::Pending
        };

        let appointment_id = sqlx::query_scalar::<_, AppointmentId>(
            r#"
            INSERT INTO appointments
                (student_id, consultant_id, starts_at, ends_at, mode, status, notes, fee_cents, currency)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(student_id)
        .bind(consultant.id)
        .bind(slot.starts_at)
        .bind(slot.ends_at)
        .bind(dto.mode)
        .bind(status)
        .bind(&dto.notes)
        .bind(consultant.fee_cents)
        .bind(&consultant.currency)
        .fetch_one(&mut *tx)
        .await?;

        let appointment = Self::fetch(&mut tx, appointment_id).await?;
        tx.commit().await?;

        info!(
            appointment_id = %appointment_id,
            status = appointment.appointment.status.as_str(),
            "Appointment booked"
        );
        Ok(appointment)
    }

    async fn fetch(
        conn: &mut PgConnection,
        id: AppointmentId,
    ) -> Result<AppointmentWithParties, AppError> {
        sqlx::query_as::<_, AppointmentWithParties>(&format!(
            "{} WHERE a.id = $1",
            with_parties_select()
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(not_found)
    }

    /// Students get their bookings; consultants get the bookings made with them.
    #[instrument(skip(db))]
    pub async fn list_for_user(
        db: &PgPool,
        user_id: UserId,
    ) -> Result<Vec<AppointmentWithParties>, AppError> {
        let appointments = sqlx::query_as::<_, AppointmentWithParties>(&format!(
            "{} WHERE a.student_id = $1 OR c.user_id = $1 ORDER BY a.starts_at DESC",
            with_parties_select()
        ))
        .bind(user_id)
        .fetch_all(db)
        .await?;

        Ok(appointments)
    }

    #[instrument(skip(db))]
    pub async fn list_appointments(
        db: &PgPool,
        filters: AppointmentFilterParams,
    ) -> Result<PaginatedAppointmentsResponse, AppError> {
        let where_clause = r#"
            WHERE ($1::uuid IS NULL OR a.consultant_id = $1)
              AND ($2::uuid IS NULL OR a.student_id = $2)
              AND ($3::appointment_status IS NULL OR a.status = $3)
              AND ($4::timestamptz IS NULL OR a.starts_at >= $4)
              AND ($5::timestamptz IS NULL OR a.starts_at < $5)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM appointments a {where_clause}"
        ))
        .bind(filters.consultant_id)
        .bind(filters.student_id)
        .bind(filters.status)
        .bind(filters.from)
        .bind(filters.to)
        .fetch_one(db)
        .await?;

        let appointments = sqlx::query_as::<_, AppointmentWithParties>(&format!(
            "{} {where_clause} ORDER BY a.starts_at DESC LIMIT $6 OFFSET $7",
            with_parties_select()
        ))
        .bind(filters.consultant_id)
        .bind(filters.student_id)
        .bind(filters.status)
        .bind(filters.from)
        .bind(filters.to)
        .bind(filters.pagination.limit())
        .bind(filters.pagination.offset())
        .fetch_all(db)
        .await?;

        Ok(PaginatedAppointmentsResponse {
            data: appointments,
            meta: PaginationMeta::new(total, &filters.pagination),
        })
    }

    async fn consultant_user(
        conn: &mut PgConnection,
        id: ConsultantId,
    ) -> Result<UserId, AppError> {
        let user_id =
            sqlx::query_scalar::<_, UserId>("SELECT user_id FROM consultants WHERE id = $1")
                .bind(id)
                .fetch_one(conn)
                .await?;
        Ok(user_id)
    }

    fn actor_for(
        appointment: &Appointment,
        consultant_user: UserId,
        caller: UserId,
        is_admin: bool,
    ) -> Option<Actor> {
        if is_admin {
            Some(Actor::Admin)
        } else if consultant_user == caller {
            Some(Actor::Consultant)
        } else if appointment.student_id == caller {
            Some(Actor::Student)
        } else {
            None
        }
    }

    /// Visible to both parties and to admins; anyone else gets 404.
    #[instrument(skip(db))]
    pub async fn get_appointment(
        db: &PgPool,
        caller: UserId,
        is_admin: bool,
        id: AppointmentId,
    ) -> Result<AppointmentWithParties, AppError> {
        let mut conn = db.acquire().await?;
        let appointment = Self::fetch(&mut conn, id).await?;
        let consultant_user =
            Self::consultant_user(&mut conn, appointment.appointment.consultant_id).await?;

        Self::actor_for(&appointment.appointment, consultant_user, caller, is_admin)
            .ok_or_else(not_found)?;

        Ok(appointment)
    }

    #[instrument(skip(db, dto), fields(status = dto.status.as_str()))]
    pub async fn update_status(
        db: &PgPool,
        caller: UserId,
        is_admin: bool,
        id: AppointmentId,
        dto: UpdateAppointmentStatusDto,
    ) -> Result<AppointmentWithParties, AppError> {
        let mut tx = db.begin().await?;

        let appointment = sqlx::query_as::<_, Appointment>(&format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments a WHERE a.id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(not_found)?;

        let consultant_user = Self::consultant_user(&mut tx, appointment.consultant_id).await?;
        let actor = Self::actor_for(&appointment, consultant_user, caller, is_admin)
            .ok_or_else(not_found)?;

        if dto.meeting_link.is_some() && actor == Actor::Student {
            return Err(AppError::forbidden(
                "Only the consultant can set a meeting link",
            ));
        }

        if dto.status != appointment.status {
            transitions::check_transition(
                appointment.status,
                dto.status,
                actor,
                appointment.starts_at,
                Utc::now(),
            )
            .map_err(|e| match e {
                TransitionError::Invalid(msg) => AppError::bad_request(anyhow::anyhow!(msg)),
                TransitionError::Forbidden(msg) => AppError::forbidden(msg),
            })?;
        } else if dto.meeting_link.is_none() {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Appointment is already {}",
                dto.status.as_str()
            )));
        }

        let cancellation_reason = if dto.status == AppointmentStatus::Cancelled {
            dto.cancellation_reason.as_deref()
        } else {
            None
        };

        sqlx::query(
            r#"
            UPDATE appointments
            SET status = $2,
                cancellation_reason = COALESCE($3, cancellation_reason),
                meeting_link = COALESCE($4, meeting_link),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(dto.status)
        .bind(cancellation_reason)
        .bind(&dto.meeting_link)
        .execute(&mut *tx)
        .await?;

        let updated = Self::fetch(&mut tx, id).await?;
        tx.commit().await?;

        info!(
            appointment_id = %id,
            from = appointment.status.as_str(),
            to = dto.status.as_str(),
            "Appointment status changed"
        );
        Ok(updated)
    }
}
