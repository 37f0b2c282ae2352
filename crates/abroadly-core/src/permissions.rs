//! Permission constants for the Abroadly API.
//!
//! Permissions are derived from a user's role when a token is issued and
//! carried in the JWT claims. Handlers check them through the
//! `require_permission!` extractors instead of comparing roles directly.
//!
//! # Example
//!
//! ```ignore
//! use abroadly_core::permissions;
//!
//! if auth_user.has_permission(permissions::COURSES_MANAGE) {
//!     // Include drafts
//! }
//! ```

// =============================================================================
// Users permissions
// =============================================================================

/// Permission to list, create, update and delete any user
pub const USERS_MANAGE: &str = "users:manage";

// =============================================================================
// Catalog permissions
// =============================================================================

/// Permission to manage courses, including unpublished drafts
pub const COURSES_MANAGE: &str = "courses:manage";
/// Permission to read enrollments of every user
pub const ENROLLMENTS_READ_ALL: &str = "enrollments:read_all";

// =============================================================================
// Test prep permissions
// =============================================================================

/// Permission to author tests, sections and questions
pub const TESTS_MANAGE: &str = "tests:manage";
/// Permission to review any user's attempts
pub const ATTEMPTS_READ_ALL: &str = "attempts:read_all";

// =============================================================================
// Consulting permissions
// =============================================================================

/// Permission to create and edit consultant profiles
pub const CONSULTANTS_MANAGE: &str = "consultants:manage";
/// Permission to edit one's own weekly availability
pub const AVAILABILITY_MANAGE: &str = "availability:manage";
/// Permission to confirm, complete and mark no-shows on appointments
pub const APPOINTMENTS_MANAGE: &str = "appointments:manage";
/// Permission to list every appointment
pub const APPOINTMENTS_READ_ALL: &str = "appointments:read_all";

// =============================================================================
// Payments permissions
// =============================================================================

/// Permission to list every payment
pub const PAYMENTS_READ_ALL: &str = "payments:read_all";

// =============================================================================
// CMS & dashboard permissions
// =============================================================================

pub const CMS_MANAGE: &str = "cms:manage";
pub const DASHBOARD_VIEW: &str = "dashboard:view";

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_CONSULTANT: &str = "consultant";
pub const ROLE_STUDENT: &str = "student";

const ADMIN_PERMISSIONS: &[&str] = &[
    USERS_MANAGE,
    COURSES_MANAGE,
    ENROLLMENTS_READ_ALL,
    TESTS_MANAGE,
    ATTEMPTS_READ_ALL,
    CONSULTANTS_MANAGE,
    AVAILABILITY_MANAGE,
    APPOINTMENTS_MANAGE,
    APPOINTMENTS_READ_ALL,
    PAYMENTS_READ_ALL,
    CMS_MANAGE,
    DASHBOARD_VIEW,
];

const CONSULTANT_PERMISSIONS: &[&str] = &[AVAILABILITY_MANAGE, APPOINTMENTS_MANAGE];

/// Returns the permissions granted to a role name.
///
/// Students carry no elevated permissions; everything they can do is scoped
/// to resources they own. Unknown roles get nothing.
pub fn for_role(role: &str) -> Vec<String> {
    let granted: &[&str] = match role {
        ROLE_ADMIN => ADMIN_PERMISSIONS,
        ROLE_CONSULTANT => CONSULTANT_PERMISSIONS,
        _ => &[],
    };
    granted.iter().map(|p| (*p).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_has_every_permission() {
        let perms = for_role(ROLE_ADMIN);
        assert_eq!(perms.len(), ADMIN_PERMISSIONS.len());
        assert!(perms.iter().any(|p| p == DASHBOARD_VIEW));
        assert!(perms.iter().any(|p| p == PAYMENTS_READ_ALL));
    }

    #[test]
    fn test_consultant_permissions() {
        let perms = for_role(ROLE_CONSULTANT);
        assert!(perms.contains(&APPOINTMENTS_MANAGE.to_string()));
        assert!(perms.contains(&AVAILABILITY_MANAGE.to_string()));
        assert!(!perms.contains(&COURSES_MANAGE.to_string()));
    }

    #[test]
    fn test_student_and_unknown_roles_have_none() {
        assert!(for_role(ROLE_STUDENT).is_empty());
        assert!(for_role("superuser").is_empty());
    }

    #[test]
    fn test_permission_format() {
        for perm in ADMIN_PERMISSIONS {
            let (resource, action) = perm.split_once(':').unwrap();
            assert!(!resource.is_empty() && !action.is_empty());
        }
    }
}
