//! Dashboard response shapes.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::appointments::AppointmentWithParties;
use crate::enrollments::EnrollmentWithCourse;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct DashboardTotals {
    pub students: i64,
    pub consultants: i64,
    pub courses: i64,
    pub published_courses: i64,
    pub enrollments: i64,
    pub active_enrollments: i64,
    pub upcoming_appointments: i64,
    pub tests: i64,
    pub submitted_attempts: i64,
    pub revenue_cents: i64,
}

/// Current calendar month against the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Growth {
    pub current: i64,
    pub previous: i64,
    /// Percent change rounded to one decimal
    pub change_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DashboardGrowth {
    pub new_students: Growth,
    pub new_enrollments: Growth,
    pub revenue_cents: Growth,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DashboardStats {
    pub totals: DashboardTotals,
    pub growth: DashboardGrowth,
    pub recent_enrollments: Vec<RecentEnrollment>,
    pub upcoming_appointments: Vec<UpcomingAppointment>,
    pub generated_at: DateTime<Utc>,
}

/// Slim enrollment entry for the dashboard feed.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecentEnrollment {
    pub id: crate::ids::EnrollmentId,
    pub student_name: String,
    pub course_title: String,
    pub status: crate::enrollments::EnrollmentStatus,
    pub enrolled_at: DateTime<Utc>,
}

impl From<EnrollmentWithCourse> for RecentEnrollment {
    fn from(e: EnrollmentWithCourse) -> Self {
        Self {
            id: e.enrollment.id,
            student_name: e.student_name,
            course_title: e.course_title,
            status: e.enrollment.status,
            enrolled_at: e.enrollment.enrolled_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpcomingAppointment {
    pub id: crate::ids::AppointmentId,
    pub student_name: String,
    pub consultant_name: String,
    pub starts_at: DateTime<Utc>,
    pub status: crate::appointments::AppointmentStatus,
}

impl From<AppointmentWithParties> for UpcomingAppointment {
    fn from(a: AppointmentWithParties) -> Self {
        Self {
            id: a.appointment.id,
            student_name: a.student_name,
            consultant_name: a.consultant_name,
            starts_at: a.appointment.starts_at,
            status: a.appointment.status,
        }
    }
}

fn default_months() -> u32 {
    6
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema, IntoParams)]
pub struct TrendQuery {
    #[validate(range(min = 1, max = 24))]
    #[serde(default = "default_months")]
    pub months: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TrendPoint {
    /// First day of the month
    pub month: NaiveDate,
    pub enrollments: i64,
    pub revenue_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TrendsResponse {
    pub months: u32,
    pub points: Vec<TrendPoint>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StudentDashboard {
    pub enrollments_total: i64,
    pub enrollments_active: i64,
    pub enrollments_completed: i64,
    pub average_progress: f64,
    pub attempts_submitted: i64,
    pub best_percentage: Option<f64>,
    pub next_appointment: Option<UpcomingAppointment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trend_query_default_and_bounds() {
        let q: TrendQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(q.months, 6);
        assert!(q.validate().is_ok());
        assert!(TrendQuery { months: 0 }.validate().is_err());
        assert!(TrendQuery { months: 25 }.validate().is_err());
    }
}
