//! Consultant profiles and weekly availability.

use abroadly_core::PaginationMeta;
use abroadly_core::PaginationParams;
use abroadly_core::serde::deserialize_optional_string;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::ids::{AvailabilityRuleId, ConsultantId, UserId};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Consultant {
    pub id: ConsultantId,
    pub user_id: UserId,
    pub headline: String,
    pub bio: Option<String>,
    pub specializations: Vec<String>,
    pub countries: Vec<String>,
    pub languages: Vec<String>,
    pub fee_cents: i64,
    pub currency: String,
    /// Length of one bookable slot
    pub slot_minutes: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const CONSULTANT_COLUMNS: &str = "c.id, c.user_id, c.headline, c.bio, c.specializations, \
     c.countries, c.languages, c.fee_cents, c.currency, c.slot_minutes, c.is_active, \
     c.created_at, c.updated_at";

/// Consultant profile with the linked user's public details.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct ConsultantProfile {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub consultant: Consultant,
    pub first_name: String,
    pub last_name: String,
}

fn default_slot_minutes() -> i32 {
    30
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateConsultantDto {
    /// Existing user that becomes a consultant
    pub user_id: UserId,
    #[validate(length(min = 1, max = 200))]
    pub headline: String,
    pub bio: Option<String>,
    #[serde(default)]
    pub specializations: Vec<String>,
    #[serde(default)]
    pub countries: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub fee_cents: i64,
    #[validate(length(equal = 3))]
    #[serde(default = "default_currency")]
    pub currency: String,
    #[validate(range(min = 15, max = 240))]
    #[serde(default = "default_slot_minutes")]
    pub slot_minutes: i32,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateConsultantDto {
    #[validate(length(min = 1, max = 200))]
    pub headline: Option<String>,
    pub bio: Option<String>,
    pub specializations: Option<Vec<String>>,
    pub countries: Option<Vec<String>>,
    pub languages: Option<Vec<String>>,
    #[validate(range(min = 0))]
    pub fee_cents: Option<i64>,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
    #[validate(range(min = 15, max = 240))]
    pub slot_minutes: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct ConsultantFilterParams {
    /// Consultants advising on this destination country
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub country: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginatedConsultantsResponse {
    pub data: Vec<ConsultantProfile>,
    pub meta: PaginationMeta,
}

// ============================================================================
// Availability
// ============================================================================

/// One weekly window. Times are `HH:MM` in UTC.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AvailabilityRule {
    pub id: AvailabilityRuleId,
    pub consultant_id: ConsultantId,
    /// 0 = Sunday through 6 = Saturday
    pub weekday: i16,
    #[schema(example = "09:00")]
    pub start_time: String,
    #[schema(example = "17:00")]
    pub end_time: String,
}

fn validate_hhmm(value: &str) -> Result<(), ValidationError> {
    parse_hhmm(value)
        .map(|_| ())
        .ok_or_else(|| ValidationError::new("time_format"))
}

/// Converts `HH:MM` (00:00 to 23:59) to minutes after midnight.
pub fn parse_hhmm(value: &str) -> Option<u32> {
    let (h, m) = value.split_once(':')?;
    if h.len() != 2 || m.len() != 2 {
        return None;
    }
    let hours: u32 = h.parse().ok()?;
    let minutes: u32 = m.parse().ok()?;
    (hours < 24 && minutes < 60).then_some(hours * 60 + minutes)
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct AvailabilityRuleInput {
    #[validate(range(min = 0, max = 6))]
    pub weekday: i16,
    #[validate(custom(function = "validate_hhmm", message = "must be HH:MM"))]
    #[schema(example = "09:00")]
    pub start_time: String,
    #[validate(custom(function = "validate_hhmm", message = "must be HH:MM"))]
    #[schema(example = "17:00")]
    pub end_time: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SetAvailabilityDto {
    #[validate(length(max = 50), nested)]
    pub rules: Vec<AvailabilityRuleInput>,
}

#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct SlotQuery {
    /// First day, inclusive (YYYY-MM-DD)
    pub from: NaiveDate,
    /// Last day, inclusive (YYYY-MM-DD)
    pub to: NaiveDate,
}

/// A bookable `[starts_at, ends_at)` interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Slot {
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SlotsResponse {
    pub consultant_id: ConsultantId,
    pub slot_minutes: i32,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub slots: Vec<Slot>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hhmm() {
        assert_eq!(parse_hhmm("00:00"), Some(0));
        assert_eq!(parse_hhmm("09:30"), Some(570));
        assert_eq!(parse_hhmm("23:59"), Some(1439));
        assert_eq!(parse_hhmm("24:00"), None);
        assert_eq!(parse_hhmm("9:30"), None);
        assert_eq!(parse_hhmm("09:60"), None);
        assert_eq!(parse_hhmm("ab:cd"), None);
    }

    fn rule(start: &str, end: &str) -> AvailabilityRuleInput {
        AvailabilityRuleInput {
            weekday: 1,
            start_time: start.to_string(),
            end_time: end.to_string(),
        }
    }

    #[test]
    fn test_set_availability_validates_each_rule() {
        let ok = SetAvailabilityDto {
            rules: vec![rule("09:00", "12:00")],
        };
        assert!(ok.validate().is_ok());

        let bad = SetAvailabilityDto {
            rules: vec![rule("09:00", "12:00"), rule("9am", "12:00")],
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_set_availability_caps_rule_count() {
        let dto = SetAvailabilityDto {
            rules: (0..51).map(|_| rule("09:00", "10:00")).collect(),
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_availability_input_validation() {
        let ok = AvailabilityRuleInput {
            weekday: 1,
            start_time: "09:00".into(),
            end_time: "12:00".into(),
        };
        assert!(ok.validate().is_ok());

        let bad_day = AvailabilityRuleInput { weekday: 7, ..ok.clone() };
        assert!(bad_day.validate().is_err());

        let bad_time = AvailabilityRuleInput {
            end_time: "25:00".into(),
            ..ok
        };
        assert!(bad_time.validate().is_err());
    }

    #[test]
    fn test_slot_minutes_bounds() {
        let dto: CreateConsultantDto = serde_json::from_str(&format!(
            r#"{{"user_id":"{}","headline":"UK admissions","slot_minutes":10}}"#,
            UserId::new()
        ))
        .unwrap();
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_slot_query_parses_dates() {
        let q: SlotQuery = serde_json::from_str(r#"{"from":"2025-03-01","to":"2025-03-07"}"#).unwrap();
        assert_eq!(q.to.signed_duration_since(q.from).num_days(), 6);
    }
}
