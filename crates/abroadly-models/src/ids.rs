//! Strongly-typed ID newtypes for domain entities.
//!
//! Each entity gets its own wrapper around `Uuid` so a `CourseId` can never
//! be passed where a `UserId` is expected. The wrappers are transparent for
//! SQLx and serde, which means they bind, decode, and travel over JSON and
//! path parameters exactly like a bare UUID.
//!
//! ```ignore
//! use abroadly_models::ids::{CourseId, UserId};
//!
//! fn enroll(user: UserId, course: CourseId) { /* ... */ }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

macro_rules! define_id {
    ($($(#[$meta:meta])* $name:ident),+ $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(
                Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
                Serialize, Deserialize, ToSchema, sqlx::Type,
            )]
            #[serde(transparent)]
            #[sqlx(transparent)]
            #[schema(value_type = String, format = "uuid")]
            pub struct $name(pub Uuid);

            impl $name {
                #[inline]
                pub fn new() -> Self {
                    Self(Uuid::new_v4())
                }

                #[inline]
                pub const fn from_u128(v: u128) -> Self {
                    Self(Uuid::from_u128(v))
                }

                #[inline]
                pub const fn into_inner(self) -> Uuid {
                    self.0
                }
            }

            impl Default for $name {
                fn default() -> Self {
                    Self::new()
                }
            }

            impl fmt::Debug for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}({})", stringify!($name), self.0)
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    fmt::Display::fmt(&self.0, f)
                }
            }

            impl From<Uuid> for $name {
                #[inline]
                fn from(uuid: Uuid) -> Self {
                    Self(uuid)
                }
            }

            impl From<$name> for Uuid {
                #[inline]
                fn from(id: $name) -> Uuid {
                    id.0
                }
            }

            impl std::str::FromStr for $name {
                type Err = uuid::Error;

                fn from_str(s: &str) -> Result<Self, Self::Err> {
                    Uuid::parse_str(s).map(Self)
                }
            }
        )+
    };
}

define_id!(
    UserId,
    CourseId,
    EnrollmentId,
    TestId,
    SectionId,
    QuestionId,
    AttemptId,
    /// Consultant profile ID (distinct from the consultant's user ID).
    ConsultantId,
    AvailabilityRuleId,
    AppointmentId,
    PaymentId,
    PageId,
    MenuId,
    MenuItemId,
    ContentBlockId,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_ids_are_random() {
        assert_ne!(CourseId::new(), CourseId::new());
    }

    #[test]
    fn test_debug_includes_type_name() {
        let id = UserId::from_u128(0x12345678_1234_1234_1234_123456789abc);
        assert_eq!(
            format!("{id:?}"),
            "UserId(12345678-1234-1234-1234-123456789abc)"
        );
        assert_eq!(id.to_string(), "12345678-1234-1234-1234-123456789abc");
    }

    #[test]
    fn test_from_str() {
        let id: AttemptId = "12345678-1234-1234-1234-123456789abc".parse().unwrap();
        assert_eq!(id, AttemptId::from_u128(0x12345678_1234_1234_1234_123456789abc));
        assert!("not-a-uuid".parse::<AttemptId>().is_err());
    }

    #[test]
    fn test_serde_is_transparent() {
        let uuid = Uuid::new_v4();
        let id = PaymentId::from(uuid);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{uuid}\""));
        let back: PaymentId = serde_json::from_str(&json).unwrap();
        assert_eq!(back.into_inner(), uuid);
    }
}
