//! Validated string value types.
//!
//! - [`Email`]: trimmed, lowercased, syntactically valid address
//! - [`PhoneNumber`]: 7 to 15 digits with optional formatting
//! - [`Slug`]: URL segment made of `[a-z0-9-]`
//!
//! All three deserialize with validation, so a malformed value in a request
//! body is rejected before a handler runs. Values decoded from the database
//! are trusted.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use validator::ValidateEmail;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueTypeError {
    InvalidEmail(String),
    InvalidPhoneNumber(String),
    InvalidSlug(String),
}

impl std::error::Error for ValueTypeError {}

impl fmt::Display for ValueTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEmail(msg) => write!(f, "Invalid email: {msg}"),
            Self::InvalidPhoneNumber(msg) => write!(f, "Invalid phone number: {msg}"),
            Self::InvalidSlug(msg) => write!(f, "Invalid slug: {msg}"),
        }
    }
}

/// Shared plumbing for a `String` newtype whose constructor is `Self::new`.
macro_rules! string_value {
    ($name:ident) => {
        impl $name {
            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            #[inline]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = ValueTypeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> String {
                value.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Self::new(s).map_err(serde::de::Error::custom)
            }
        }
    };
}

// ============================================================================
// Email
// ============================================================================

/// A validated, lowercased email address.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, ToSchema, sqlx::Type)]
#[sqlx(transparent)]
#[schema(value_type = String, format = "email", example = "student@example.com")]
pub struct Email(String);

impl Email {
    pub fn new(email: impl Into<String>) -> Result<Self, ValueTypeError> {
        let email = email.into().trim().to_lowercase();
        if email.is_empty() {
            return Err(ValueTypeError::InvalidEmail("email cannot be empty".into()));
        }
        if !email.validate_email() {
            return Err(ValueTypeError::InvalidEmail(format!(
                "'{email}' is not a valid email address"
            )));
        }
        Ok(Self(email))
    }

    pub fn domain(&self) -> &str {
        self.0.split('@').nth(1).unwrap_or("")
    }
}

string_value!(Email);

// ============================================================================
// PhoneNumber
// ============================================================================

/// A phone number in international or local format.
///
/// Accepts digits, spaces, dashes, parentheses and a single leading `+`,
/// with 7 to 15 digits in total (E.164 bounds).
#[derive(Clone, PartialEq, Eq, Hash, Serialize, ToSchema, sqlx::Type)]
#[sqlx(transparent)]
#[schema(value_type = String, example = "+91 98765 43210")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    const MIN_DIGITS: usize = 7;
    const MAX_DIGITS: usize = 15;

    pub fn new(phone: impl Into<String>) -> Result<Self, ValueTypeError> {
        let phone = phone.into().trim().to_string();

        if phone.is_empty() {
            return Err(ValueTypeError::InvalidPhoneNumber(
                "phone number cannot be empty".into(),
            ));
        }

        let allowed = |c: char| c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')' | ' ');
        if !phone.chars().all(allowed) {
            return Err(ValueTypeError::InvalidPhoneNumber(format!(
                "'{phone}' contains invalid characters"
            )));
        }
        if phone.chars().skip(1).any(|c| c == '+') {
            return Err(ValueTypeError::InvalidPhoneNumber(
                "+ can only appear at the start".into(),
            ));
        }

        let digits = phone.chars().filter(char::is_ascii_digit).count();
        if !(Self::MIN_DIGITS..=Self::MAX_DIGITS).contains(&digits) {
            return Err(ValueTypeError::InvalidPhoneNumber(format!(
                "expected {} to {} digits, got {digits}",
                Self::MIN_DIGITS,
                Self::MAX_DIGITS
            )));
        }

        Ok(Self(phone))
    }

    /// Digits with a leading `+` when one was given.
    pub fn to_e164(&self) -> String {
        let digits: String = self.0.chars().filter(char::is_ascii_digit).collect();
        if self.0.starts_with('+') {
            format!("+{digits}")
        } else {
            digits
        }
    }
}

string_value!(PhoneNumber);

// ============================================================================
// Slug
// ============================================================================

/// A URL-safe identifier used by courses and CMS pages.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, ToSchema, sqlx::Type)]
#[sqlx(transparent)]
#[schema(value_type = String, example = "msc-data-science-uk")]
pub struct Slug(String);

impl Slug {
    pub const MAX_LEN: usize = 200;

    pub fn new(slug: impl Into<String>) -> Result<Self, ValueTypeError> {
        let slug = slug.into();
        if slug.is_empty() || slug.len() > Self::MAX_LEN {
            return Err(ValueTypeError::InvalidSlug(format!(
                "must be 1 to {} characters",
                Self::MAX_LEN
            )));
        }
        if !slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(ValueTypeError::InvalidSlug(format!(
                "'{slug}' may only contain lowercase letters, digits and dashes"
            )));
        }
        if slug.starts_with('-') || slug.ends_with('-') {
            return Err(ValueTypeError::InvalidSlug(format!(
                "'{slug}' cannot start or end with a dash"
            )));
        }
        Ok(Self(slug))
    }

    /// Derives a slug from free text such as a title.
    ///
    /// Non-alphanumeric runs collapse into a single dash. Returns `None` when
    /// nothing usable remains.
    pub fn from_title(title: &str) -> Option<Self> {
        let mut out = String::with_capacity(title.len());
        for c in title.chars().flat_map(char::to_lowercase) {
            if c.is_ascii_alphanumeric() {
                out.push(c);
            } else if !out.is_empty() && !out.ends_with('-') {
                out.push('-');
            }
        }
        out.truncate(Self::MAX_LEN);
        let trimmed = out.trim_matches('-');
        Self::new(trimmed).ok()
    }
}

string_value!(Slug);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_is_normalized() {
        let email = Email::new("  Student@Example.COM ").unwrap();
        assert_eq!(email.as_str(), "student@example.com");
        assert_eq!(email.domain(), "example.com");
    }

    #[test]
    fn test_email_invalid() {
        assert!(Email::new("").is_err());
        assert!(Email::new("not-an-email").is_err());
        assert!(Email::new("a@").is_err());
    }

    #[test]
    fn test_email_deserialize_validates() {
        assert!(serde_json::from_str::<Email>(r#""ok@example.com""#).is_ok());
        assert!(serde_json::from_str::<Email>(r#""nope""#).is_err());
    }

    #[test]
    fn test_phone_valid_formats() {
        assert!(PhoneNumber::new("+1 (555) 123-4567").is_ok());
        assert!(PhoneNumber::new("9876543210").is_ok());
        assert_eq!(
            PhoneNumber::new("+91 98765-43210").unwrap().to_e164(),
            "+919876543210"
        );
    }

    #[test]
    fn test_phone_invalid() {
        assert!(PhoneNumber::new("12345").is_err());
        assert!(PhoneNumber::new("1234567890123456").is_err());
        assert!(PhoneNumber::new("555-CALL-NOW").is_err());
        assert!(PhoneNumber::new("1+5551234567").is_err());
    }

    #[test]
    fn test_slug_rules() {
        assert!(Slug::new("ielts-prep-2025").is_ok());
        assert!(Slug::new("About-Us").is_err());
        assert!(Slug::new("-leading").is_err());
        assert!(Slug::new("with space").is_err());
        assert!(Slug::new("").is_err());
    }

    #[test]
    fn test_slug_from_title() {
        assert_eq!(
            Slug::from_title("MSc Data Science (UK): 2025!").unwrap().as_str(),
            "msc-data-science-uk-2025"
        );
        assert_eq!(Slug::from_title("  Hello   World  ").unwrap().as_str(), "hello-world");
        assert!(Slug::from_title("!!!").is_none());
    }
}
