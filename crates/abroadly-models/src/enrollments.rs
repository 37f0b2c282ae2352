//! Enrollment models and DTOs.

use abroadly_core::serde::deserialize_optional_uuid;
use abroadly_core::{PaginationMeta, PaginationParams};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::ids::{CourseId, EnrollmentId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "enrollment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    PendingPayment,
    Active,
    Completed,
    Cancelled,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingPayment => "pending_payment",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub status: EnrollmentStatus,
    /// Percentage complete, 0 to 100
    pub progress: i32,
    pub enrolled_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

pub const ENROLLMENT_COLUMNS: &str =
    "id, user_id, course_id, status, progress, enrolled_at, completed_at, updated_at";

/// Enrollment joined with course and student details for listings.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct EnrollmentWithCourse {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub enrollment: Enrollment,
    pub course_title: String,
    pub course_slug: String,
    pub student_name: String,
    pub student_email: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateEnrollmentDto {
    pub course_id: CourseId,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateProgressDto {
    #[validate(range(min = 0, max = 100))]
    pub progress: i32,
}

#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct EnrollmentFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub course_id: Option<Uuid>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub user_id: Option<Uuid>,
    pub status: Option<EnrollmentStatus>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginatedEnrollmentsResponse {
    pub data: Vec<EnrollmentWithCourse>,
    pub meta: PaginationMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&EnrollmentStatus::PendingPayment).unwrap(),
            r#""pending_payment""#
        );
    }

    #[test]
    fn test_progress_bounds() {
        assert!(UpdateProgressDto { progress: 0 }.validate().is_ok());
        assert!(UpdateProgressDto { progress: 100 }.validate().is_ok());
        assert!(UpdateProgressDto { progress: 101 }.validate().is_err());
        assert!(UpdateProgressDto { progress: -1 }.validate().is_err());
    }
}
