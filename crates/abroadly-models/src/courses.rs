//! Course catalog models and DTOs.

use abroadly_core::serde::{deserialize_optional_bool, deserialize_optional_string};
use abroadly_core::{PaginationMeta, PaginationParams};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::ids::CourseId;
use crate::value_types::Slug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "course_level", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CourseLevel {
    Foundation,
    Undergraduate,
    Postgraduate,
    Diploma,
    Language,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Course {
    pub id: CourseId,
    pub title: String,
    pub slug: Slug,
    pub description: Option<String>,
    pub country: String,
    pub university: Option<String>,
    pub level: CourseLevel,
    pub duration_weeks: Option<i32>,
    /// Fee in the smallest currency unit (cents, paise)
    pub fee_cents: i64,
    pub currency: String,
    pub intake: Option<String>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Course {
    pub fn is_free(&self) -> bool {
        self.fee_cents == 0
    }
}

pub const COURSE_COLUMNS: &str = "id, title, slug, description, country, university, level, \
     duration_weeks, fee_cents, currency, intake, is_published, created_at, updated_at";

/// Course row with its enrollment counts, for the admin list.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct CourseWithStats {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub course: Course,
    pub enrollment_count: i64,
    pub active_enrollment_count: i64,
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCourseDto {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    /// Generated from the title when omitted
    pub slug: Option<Slug>,
    pub description: Option<String>,
    #[validate(length(min = 2, max = 100))]
    pub country: String,
    #[validate(length(max = 200))]
    pub university: Option<String>,
    pub level: CourseLevel,
    #[validate(range(min = 1, max = 520))]
    pub duration_weeks: Option<i32>,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub fee_cents: i64,
    #[validate(length(equal = 3))]
    #[serde(default = "default_currency")]
    #[schema(example = "USD")]
    pub currency: String,
    #[validate(length(max = 50))]
    #[schema(example = "September 2025")]
    pub intake: Option<String>,
    #[serde(default)]
    pub is_published: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateCourseDto {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub slug: Option<Slug>,
    pub description: Option<String>,
    #[validate(length(min = 2, max = 100))]
    pub country: Option<String>,
    #[validate(length(max = 200))]
    pub university: Option<String>,
    pub level: Option<CourseLevel>,
    #[validate(range(min = 1, max = 520))]
    pub duration_weeks: Option<i32>,
    #[validate(range(min = 0))]
    pub fee_cents: Option<i64>,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
    #[validate(length(max = 50))]
    pub intake: Option<String>,
    pub is_published: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct CourseFilterParams {
    /// Matches title, university or description
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub search: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub country: Option<String>,
    pub level: Option<CourseLevel>,
    /// Ignored on the public catalog, which only lists published courses
    #[serde(default, deserialize_with = "deserialize_optional_bool")]
    pub is_published: Option<bool>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginatedCoursesResponse {
    pub data: Vec<Course>,
    pub meta: PaginationMeta,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginatedCoursesWithStatsResponse {
    pub data: Vec<CourseWithStats>,
    pub meta: PaginationMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_course_defaults() {
        let dto: CreateCourseDto = serde_json::from_str(
            r#"{"title":"MSc Computer Science","country":"UK","level":"postgraduate"}"#,
        )
        .unwrap();
        assert_eq!(dto.currency, "USD");
        assert_eq!(dto.fee_cents, 0);
        assert!(!dto.is_published);
        assert!(dto.slug.is_none());
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn test_create_course_rejects_negative_fee() {
        let dto: CreateCourseDto = serde_json::from_str(
            r#"{"title":"X","country":"UK","level":"diploma","fee_cents":-1}"#,
        )
        .unwrap();
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_unknown_level_rejected() {
        assert!(serde_json::from_str::<CourseLevel>(r#""phd""#).is_err());
    }
}
