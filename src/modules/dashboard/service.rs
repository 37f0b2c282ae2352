use abroadly_core::AppError;
use abroadly_models::UserId;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use sqlx::{FromRow, PgPool};
use tracing::{instrument, warn};

use crate::metrics;
use crate::modules::appointments::model::AppointmentWithParties;
use crate::modules::appointments::service::with_parties_select;
use crate::modules::dashboard::growth;
use crate::modules::dashboard::model::{
    DashboardGrowth, DashboardStats, DashboardTotals, RecentEnrollment, StudentDashboard,
    TrendsResponse, UpcomingAppointment,
};
use crate::modules::enrollments::model::EnrollmentWithCourse;
use crate::modules::enrollments::service::ENROLLMENT_WITH_COURSE_SELECT;
use crate::state::AppState;

const FEED_SIZE: i64 = 5;

#[derive(Debug, FromRow)]
struct GrowthRow {
    students_current: i64,
    students_previous: i64,
    enrollments_current: i64,
    enrollments_previous: i64,
    revenue_current: i64,
    revenue_previous: i64,
}

#[derive(Debug, FromRow)]
struct StudentEnrollmentRow {
    total: i64,
    active: i64,
    completed: i64,
    average_progress: f64,
}

#[derive(Debug, FromRow)]
struct StudentAttemptRow {
    submitted: i64,
    best_percentage: Option<f64>,
}

fn start_of(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

pub struct DashboardService;

impl DashboardService {
    async fn totals(db: &PgPool) -> Result<DashboardTotals, AppError> {
        let totals = sqlx::query_as::<_, DashboardTotals>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users WHERE role = 'student') AS students,
                (SELECT COUNT(*) FROM users WHERE role = 'consultant') AS consultants,
                (SELECT COUNT(*) FROM courses) AS courses,
                (SELECT COUNT(*) FROM courses WHERE is_published) AS published_courses,
                (SELECT COUNT(*) FROM enrollments) AS enrollments,
                (SELECT COUNT(*) FROM enrollments WHERE status = 'active') AS active_enrollments,
                (SELECT COUNT(*) FROM appointments
                  WHERE status IN ('pending', 'confirmed') AND starts_at > NOW())
                    AS upcoming_appointments,
                (SELECT COUNT(*) FROM tests) AS tests,
                (SELECT COUNT(*) FROM test_attempts WHERE status <> 'in_progress')
                    AS submitted_attempts,
                (SELECT COALESCE(SUM(amount_cents), 0)::bigint FROM payments
                  WHERE status = 'succeeded') AS revenue_cents
            "#,
        )
        .fetch_one(db)
        .await?;

        Ok(totals)
    }

    async fn growth(db: &PgPool, today: NaiveDate) -> Result<DashboardGrowth, AppError> {
        let (previous, current, next) = growth::month_bounds(today);

        let row = sqlx::query_as::<_, GrowthRow>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users
                  WHERE role = 'student' AND created_at >= $2 AND created_at < $3)
                    AS students_current,
                (SELECT COUNT(*) FROM users
                  WHERE role = 'student' AND created_at >= $1 AND created_at < $2)
                    AS students_previous,
                (SELECT COUNT(*) FROM enrollments WHERE enrolled_at >= $2 AND enrolled_at < $3)
                    AS enrollments_current,
                (SELECT COUNT(*) FROM enrollments WHERE enrolled_at >= $1 AND enrolled_at < $2)
                    AS enrollments_previous,
                (SELECT COALESCE(SUM(amount_cents), 0)::bigint FROM payments
                  WHERE status = 'succeeded' AND created_at >= $2 AND created_at < $3)
                    AS revenue_current,
                (SELECT COALESCE(SUM(amount_cents), 0)::bigint FROM payments
                  WHERE status = 'succeeded' AND created_at >= $1 AND created_at < $2)
                    AS revenue_previous
            "#,
        )
        .bind(start_of(previous))
        .bind(start_of(current))
        .bind(start_of(next))
        .fetch_one(db)
        .await?;

        Ok(DashboardGrowth {
            new_students: growth::growth(row.students_current, row.students_previous),
            new_enrollments: growth::growth(row.enrollments_current, row.enrollments_previous),
            revenue_cents: growth::growth(row.revenue_current, row.revenue_previous),
        })
    }

    async fn recent_enrollments(db: &PgPool) -> Result<Vec<RecentEnrollment>, AppError> {
        let rows = sqlx::query_as::<_, EnrollmentWithCourse>(&format!(
            "{ENROLLMENT_WITH_COURSE_SELECT} ORDER BY e.enrolled_at DESC LIMIT $1"
        ))
        .bind(FEED_SIZE)
        .fetch_all(db)
        .await?;

        Ok(rows.into_iter().map(RecentEnrollment::from).collect())
    }

    async fn upcoming_appointments(db: &PgPool) -> Result<Vec<UpcomingAppointment>, AppError> {
        let rows = sqlx::query_as::<_, AppointmentWithParties>(&format!(
            "{} WHERE a.status IN ('pending', 'confirmed') AND a.starts_at > NOW()
             ORDER BY a.starts_at
             LIMIT $1",
            with_parties_select()
        ))
        .bind(FEED_SIZE)
        .fetch_all(db)
        .await?;

        Ok(rows.into_iter().map(UpcomingAppointment::from).collect())
    }

    /// Runs the aggregate queries concurrently.
    #[instrument(skip(db))]
    pub async fn compute_stats(db: &PgPool) -> Result<DashboardStats, AppError> {
        let now = Utc::now();
        let (totals, growth, recent_enrollments, upcoming_appointments) = tokio::try_join!(
            Self::totals(db),
            Self::growth(db, now.date_naive()),
            Self::recent_enrollments(db),
            Self::upcoming_appointments(db),
        )?;

        Ok(DashboardStats {
            totals,
            growth,
            recent_enrollments,
            upcoming_appointments,
            generated_at: now,
        })
    }

    /// Admin stats, served from Redis when a fresh copy exists.
    #[instrument(skip(state))]
    pub async fn get_stats(state: &AppState) -> Result<DashboardStats, AppError> {
        let key = state.cache_keys.dashboard_stats();

        if let Some(cache) = &state.cache {
            let cached = cache.get::<DashboardStats>(&key).await;
            metrics::track_cache_lookup(cached.is_some());
            if let Some(stats) = cached {
                return Ok(stats);
            }
        }

        let stats = Self::compute_stats(&state.db).await?;

        if let Some(cache) = &state.cache
            && let Err(e) = cache.set(&key, &stats).await
        {
            warn!(error = %e, "Failed to cache dashboard stats");
        }

        Ok(stats)
    }

    /// Monthly enrollments and revenue for the last `months` months.
    #[instrument(skip(db))]
    pub async fn compute_trends(db: &PgPool, months: u32) -> Result<TrendsResponse, AppError> {
        let month_list = growth::trailing_months(Utc::now().date_naive(), months);
        let Some(&first) = month_list.first() else {
            return Ok(TrendsResponse {
                months,
                points: Vec::new(),
            });
        };
        let since = start_of(first);

        let (enrollments, revenue) = tokio::try_join!(
            sqlx::query_as::<_, (NaiveDate, i64)>(
                "SELECT date_trunc('month', enrolled_at AT TIME ZONE 'UTC')::date AS month,
                        COUNT(*)
                 FROM enrollments
                 WHERE enrolled_at >= $1
                 GROUP BY month",
            )
            .bind(since)
            .fetch_all(db),
            sqlx::query_as::<_, (NaiveDate, i64)>(
                "SELECT date_trunc('month', created_at AT TIME ZONE 'UTC')::date AS month,
                        COALESCE(SUM(amount_cents), 0)::bigint
                 FROM payments
                 WHERE status = 'succeeded' AND created_at >= $1
                 GROUP BY month",
            )
            .bind(since)
            .fetch_all(db),
        )?;

        Ok(TrendsResponse {
            months,
            points: growth::fill_months(&month_list, &enrollments, &revenue),
        })
    }

    #[instrument(skip(state))]
    pub async fn get_trends(state: &AppState, months: u32) -> Result<TrendsResponse, AppError> {
        let key = state.cache_keys.dashboard_trends(months);

        if let Some(cache) = &state.cache {
            let cached = cache.get::<TrendsResponse>(&key).await;
            metrics::track_cache_lookup(cached.is_some());
            if let Some(trends) = cached {
                return Ok(trends);
            }
        }

        let trends = Self::compute_trends(&state.db, months).await?;

        if let Some(cache) = &state.cache
            && let Err(e) = cache.set(&key, &trends).await
        {
            warn!(error = %e, "Failed to cache dashboard trends");
        }

        Ok(trends)
    }

    #[instrument(skip(db))]
    pub async fn student_dashboard(
        db: &PgPool,
        user_id: UserId,
    ) -> Result<StudentDashboard, AppError> {
        let enrollments = sqlx::query_as::<_, StudentEnrollmentRow>(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE status = 'active') AS active,
                   COUNT(*) FILTER (WHERE status = 'completed') AS completed,
                   COALESCE(AVG(progress) FILTER (WHERE status <> 'cancelled'), 0)::float8
                       AS average_progress
            FROM enrollments
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(db);

        let attempts = sqlx::query_as::<_, StudentAttemptRow>(
            r#"
            SELECT COUNT(*) AS submitted, MAX(percentage) AS best_percentage
            FROM test_attempts
            WHERE user_id = $1 AND status <> 'in_progress'
            "#,
        )
        .bind(user_id)
        .fetch_one(db);

        let next_appointment_sql = format!(
            "{} WHERE (a.student_id = $1 OR c.user_id = $1)
               AND a.status IN ('pending', 'confirmed')
               AND a.starts_at > NOW()
             ORDER BY a.starts_at
             LIMIT 1",
            with_parties_select()
        );
        let next_appointment = sqlx::query_as::<_, AppointmentWithParties>(&next_appointment_sql)
            .bind(user_id)
            .fetch_optional(db);

        let (enrollments, attempts, next_appointment) =
            tokio::try_join!(enrollments, attempts, next_appointment)?;

        Ok(StudentDashboard {
            enrollments_total: enrollments.total,
            enrollments_active: enrollments.active,
            enrollments_completed: enrollments.completed,
            average_progress: (enrollments.average_progress * 10.0).round() / 10.0,
            attempts_submitted: attempts.submitted,
            best_percentage: attempts.best_percentage,
            next_appointment: next_appointment.map(UpcomingAppointment::from),
        })
    }

    /// Drops every cached dashboard entry. Failures are logged, not returned.
    pub async fn invalidate_cache(state: &AppState) {
        let Some(cache) = &state.cache else {
            return;
        };
        if let Err(e) = cache
            .invalidate_pattern(&state.cache_keys.dashboard_pattern())
            .await
        {
            warn!(error = %e, "Failed to invalidate dashboard cache");
        }
    }
}
