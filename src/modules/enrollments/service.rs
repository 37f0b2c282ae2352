use abroadly_core::{AppError, PaginationMeta};
use abroadly_models::{CourseId, EnrollmentId, UserId};
use sqlx::PgPool;
use tracing::instrument;

use crate::modules::courses::model::{COURSE_COLUMNS, Course};
use crate::modules::enrollments::model::{
    ENROLLMENT_COLUMNS, Enrollment, EnrollmentFilterParams, EnrollmentStatus,
    EnrollmentWithCourse, PaginatedEnrollmentsResponse,
};

/// Select list for [`EnrollmentWithCourse`]; expects aliases `e`, `c`, `u`.
pub(crate) const ENROLLMENT_WITH_COURSE_SELECT: &str = r#"
    SELECT e.id, e.user_id, e.course_id, e.status, e.progress, e.enrolled_at,
           e.completed_at, e.updated_at,
           c.title AS course_title, c.slug AS course_slug,
           u.first_name || ' ' || u.last_name AS student_name, u.email AS student_email
    FROM enrollments e
    JOIN courses c ON c.id = e.course_id
    JOIN users u ON u.id = e.user_id
"#;

pub struct EnrollmentService;

impl EnrollmentService {
    /// Enrolls `user_id` in a published course. Free courses start active,
    /// paid ones wait for payment. A cancelled enrollment is reactivated.
    #[instrument(skip(db))]
    pub async fn enroll(
        db: &PgPool,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Enrollment, AppError> {
        let mut tx = db.begin().await?;

        let course = sqlx::query_as::<_, Course>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1 AND is_published = TRUE"
        ))
        .bind(course_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Course not found")))?;

        let status = if course.is_free() {
            EnrollmentStatus::Active
        } else {
            EnrollmentStatus::PendingPayment
        };

        let existing = sqlx::query_as::<_, Enrollment>(&format!(
            "SELECT {ENROLLMENT_COLUMNS} FROM enrollments
             WHERE user_id = $1 AND course_id = $2
             FOR UPDATE"
        ))
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(&mut *tx)
        .await?;

        let enrollment = match existing {
            Some(e) if e.status != EnrollmentStatus::Cancelled => {
                return Err(AppError::conflict(anyhow::anyhow!(
                    "Already enrolled in this course"
                )));
            }
            Some(e) => {
                sqlx::query_as::<_, Enrollment>(&format!(
                    "UPDATE enrollments
                     SET status = $2, progress = 0, enrolled_at = NOW(), completed_at = NULL,
                         updated_at = NOW()
                     WHERE id = $1
                     RETURNING {ENROLLMENT_COLUMNS}"
                ))
                .bind(e.id)
                .bind(status)
                .fetch_one(&mut *tx)
                .await?
            }
            None => sqlx::query_as::<_, Enrollment>(&format!(
                "INSERT INTO enrollments (user_id, course_id, status)
                 VALUES ($1, $2, $3)
                 RETURNING {ENROLLMENT_COLUMNS}"
            ))
            .bind(user_id)
            .bind(course_id)
            .bind(status)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e
                    && db_err.is_unique_violation()
                {
                    return AppError::conflict(anyhow::anyhow!("Already enrolled in this course"));
                }
                AppError::from(e)
            })?,
        };

        tx.commit().await?;

        Ok(enrollment)
    }

    #[instrument(skip(db))]
    pub async fn list_for_user(
        db: &PgPool,
        user_id: UserId,
    ) -> Result<Vec<EnrollmentWithCourse>, AppError> {
        let enrollments = sqlx::query_as::<_, EnrollmentWithCourse>(&format!(
            "{ENROLLMENT_WITH_COURSE_SELECT} WHERE e.user_id = $1 ORDER BY e.enrolled_at DESC"
        ))
        .bind(user_id)
        .fetch_all(db)
        .await?;

        Ok(enrollments)
    }

    #[instrument(skip(db))]
    pub async fn list_enrollments(
        db: &PgPool,
        filters: EnrollmentFilterParams,
    ) -> Result<PaginatedEnrollmentsResponse, AppError> {
        let where_clause = r#"
            WHERE ($1::uuid IS NULL OR e.course_id = $1)
              AND ($2::uuid IS NULL OR e.user_id = $2)
              AND ($3::enrollment_status IS NULL OR e.status = $3)
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM enrollments e {where_clause}"
        ))
        .bind(filters.course_id)
        .bind(filters.user_id)
        .bind(filters.status)
        .fetch_one(db)
        .await?;

        let enrollments = sqlx::query_as::<_, EnrollmentWithCourse>(&format!(
            "{ENROLLMENT_WITH_COURSE_SELECT} {where_clause}
             ORDER BY e.enrolled_at DESC
             LIMIT $4 OFFSET $5"
        ))
        .bind(filters.course_id)
        .bind(filters.user_id)
        .bind(filters.status)
        .bind(filters.pagination.limit())
        .bind(filters.pagination.offset())
        .fetch_all(db)
        .await?;

        Ok(PaginatedEnrollmentsResponse {
            data: enrollments,
            meta: PaginationMeta::new(total, &filters.pagination),
        })
    }

    async fn lock_owned(
        tx: &mut sqlx::PgConnection,
        user_id: UserId,
        id: EnrollmentId,
    ) -> Result<Enrollment, AppError> {
        let enrollment = sqlx::query_as::<_, Enrollment>(&format!(
            "SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Enrollment not found")))?;

        if enrollment.user_id != user_id {
            return Err(AppError::forbidden("You can only modify your own enrollments"));
        }

        Ok(enrollment)
    }

    /// Progress only moves forward; reaching 100 completes the enrollment.
    #[instrument(skip(db))]
    pub async fn update_progress(
        db: &PgPool,
        user_id: UserId,
        id: EnrollmentId,
        progress: i32,
    ) -> Result<Enrollment, AppError> {
        let mut tx = db.begin().await?;
        let enrollment = Self::lock_owned(&mut tx, user_id, id).await?;

        if enrollment.status != EnrollmentStatus::Active {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Only active enrollments can record progress"
            )));
        }

        if progress < enrollment.progress {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Progress cannot decrease (currently {}%)",
                enrollment.progress
            )));
        }

        let updated = sqlx::query_as::<_, Enrollment>(&format!(
            "UPDATE enrollments
             SET progress = $2,
                 status = CASE WHEN $2 >= 100 THEN 'completed'::enrollment_status ELSE status END,
                 completed_at = CASE WHEN $2 >= 100 THEN NOW() ELSE completed_at END,
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {ENROLLMENT_COLUMNS}"
        ))
        .bind(id)
        .bind(progress)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(updated)
    }

    #[instrument(skip(db))]
    pub async fn cancel(
        db: &PgPool,
        user_id: UserId,
        id: EnrollmentId,
    ) -> Result<Enrollment, AppError> {
        let mut tx = db.begin().await?;
        let enrollment = Self::lock_owned(&mut tx, user_id, id).await?;

        match enrollment.status {
            EnrollmentStatus::Completed => {
                return Err(AppError::bad_request(anyhow::anyhow!(
                    "Completed enrollments cannot be cancelled"
                )));
            }
            EnrollmentStatus::Cancelled => {
                return Err(AppError::bad_request(anyhow::anyhow!(
                    "Enrollment is already cancelled"
                )));
            }
            EnrollmentStatus::Active | EnrollmentStatus::PendingPayment => {}
        }

        let cancelled = sqlx::query_as::<_, Enrollment>(&format!(
            "UPDATE enrollments SET status = 'cancelled', updated_at = NOW()
             WHERE id = $1
             RETURNING {ENROLLMENT_COLUMNS}"
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(cancelled)
    }
}
