//! Appointment booking models and DTOs.

use abroadly_core::serde::deserialize_optional_uuid;
use abroadly_core::{PaginationMeta, PaginationParams};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::ids::{AppointmentId, ConsultantId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "appointment_mode", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AppointmentMode {
    Video,
    InPerson,
    Phone,
}

impl AppointmentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::InPerson => "in_person",
            Self::Phone => "phone",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "appointment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::NoShow => "no_show",
        }
    }

    /// Pending and confirmed appointments hold their slot.
    pub fn blocks_slot(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Appointment {
    pub id: AppointmentId,
    pub student_id: UserId,
    pub consultant_id: ConsultantId,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub mode: AppointmentMode,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub meeting_link: Option<String>,
    pub cancellation_reason: Option<String>,
    pub fee_cents: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const APPOINTMENT_COLUMNS: &str = "a.id, a.student_id, a.consultant_id, a.starts_at, \
     a.ends_at, a.mode, a.status, a.notes, a.meeting_link, a.cancellation_reason, a.fee_cents, \
     a.currency, a.created_at, a.updated_at";

/// Appointment with both parties' names for listings.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct AppointmentWithParties {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub appointment: Appointment,
    pub student_name: String,
    pub student_email: String,
    pub consultant_name: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct BookAppointmentDto {
    pub consultant_id: ConsultantId,
    pub starts_at: DateTime<Utc>,
    pub mode: AppointmentMode,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateAppointmentStatusDto {
    pub status: AppointmentStatus,
    #[validate(length(max = 1000))]
    pub cancellation_reason: Option<String>,
    #[validate(url)]
    pub meeting_link: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct AppointmentFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub consultant_id: Option<Uuid>,
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub student_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    /// Appointments starting at or after this instant
    pub from: Option<DateTime<Utc>>,
    /// Appointments starting before this instant
    pub to: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginatedAppointmentsResponse {
    pub data: Vec<AppointmentWithParties>,
    pub meta: PaginationMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocks_slot() {
        assert!(AppointmentStatus::Pending.blocks_slot());
        assert!(AppointmentStatus::Confirmed.blocks_slot());
        assert!(!AppointmentStatus::Cancelled.blocks_slot());
        assert!(!AppointmentStatus::NoShow.blocks_slot());
    }

    #[test]
    fn test_mode_serde() {
        assert_eq!(
            serde_json::to_string(&AppointmentMode::InPerson).unwrap(),
            r#""in_person""#
        );
        assert_eq!(
            serde_json::from_str::<AppointmentStatus>(r#""no_show""#).unwrap(),
            AppointmentStatus::NoShow
        );
    }

    #[test]
    fn test_meeting_link_must_be_url() {
        let dto = UpdateAppointmentStatusDto {
            status: AppointmentStatus::Confirmed,
            cancellation_reason: None,
            meeting_link: Some("not a url".into()),
        };
        assert!(dto.validate().is_err());
    }
}
