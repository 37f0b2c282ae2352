//! Admin account creation.

use abroadly_core::hash_password;
use abroadly_models::{Email, UserId, UserRole};
use sqlx::PgPool;

pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Inserts an active admin. Fails when the email is already registered.
pub async fn create_admin(
    db: &PgPool,
    first_name: &str,
    last_name: &str,
    email: &str,
    password: &str,
) -> CliResult<UserId> {
    let email = Email::new(email)?;
    if password.len() < 8 {
        return Err("Password must be at least 8 characters".into());
    }

    let password_hash =
        hash_password(password).map_err(|e| format!("Failed to hash password: {}", e.error))?;

    let user_id = sqlx::query_scalar::<_, UserId>(
        "INSERT INTO users (first_name, last_name, email, password_hash, role)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (email) DO NOTHING
         RETURNING id",
    )
    .bind(first_name.trim())
    .bind(last_name.trim())
    .bind(&email)
    .bind(&password_hash)
    .bind(UserRole::Admin)
    .fetch_optional(db)
    .await?;

    user_id.ok_or_else(|| "User with this email already exists".into())
}
