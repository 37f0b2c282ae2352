use abroadly_core::{AppError, PaginationMeta, hash_password, verify_password};
use abroadly_models::UserId;
use sqlx::PgPool;
use tracing::instrument;

use crate::modules::users::model::{
    ChangePasswordDto, CreateUserDto, PaginatedUsersResponse, USER_COLUMNS, UpdateProfileDto,
    UpdateUserDto, User, UserFilterParams, UserRole,
};

pub struct UserService;

fn email_taken(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e
        && db_err.is_unique_violation()
    {
        return AppError::bad_request(anyhow::anyhow!("Email already exists"));
    }
    AppError::from(e)
}

impl UserService {
    #[instrument(skip(db))]
    pub async fn get_user(db: &PgPool, id: UserId) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("User not found")))
    }

    #[instrument(skip(db, dto), fields(email = %dto.email, role = %dto.role))]
    pub async fn create_user(db: &PgPool, dto: CreateUserDto) -> Result<User, AppError> {
        let password_hash = hash_password(&dto.password)?;

        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (first_name, last_name, email, phone, password_hash, role)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&dto.first_name)
        .bind(&dto.last_name)
        .bind(&dto.email)
        .bind(&dto.phone)
        .bind(&password_hash)
        .bind(dto.role)
        .fetch_one(db)
        .await
        .map_err(email_taken)?;

        Ok(user)
    }

    #[instrument(skip(db))]
    pub async fn list_users(
        db: &PgPool,
        filters: UserFilterParams,
    ) -> Result<PaginatedUsersResponse, AppError> {
        let limit = filters.pagination.limit();
        let offset = filters.pagination.offset();
        let search = filters.search.as_ref().map(|s| format!("%{}%", s));

        let where_clause = r#"
            WHERE ($1::user_role IS NULL OR role = $1)
              AND ($2::text IS NULL OR first_name ILIKE $2 OR last_name ILIKE $2 OR email ILIKE $2)
              AND ($3::boolean IS NULL OR is_active = $3)
        "#;

        let total =
            sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM users {where_clause}"))
                .bind(filters.role)
                .bind(&search)
                .bind(filters.is_active)
                .fetch_one(db)
                .await?;

        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users {where_clause}
             ORDER BY created_at DESC
             LIMIT $4 OFFSET $5"
        ))
        .bind(filters.role)
        .bind(&search)
        .bind(filters.is_active)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;

        Ok(PaginatedUsersResponse {
            data: users,
            meta: PaginationMeta::new(total, &filters.pagination),
        })
    }

    /// Admin update. `acting_admin` may not deactivate or demote themselves.
    #[instrument(skip(db))]
    pub async fn update_user(
        db: &PgPool,
        acting_admin: UserId,
        id: UserId,
        dto: UpdateUserDto,
    ) -> Result<User, AppError> {
        if id == acting_admin {
            if dto.is_active == Some(false) {
                return Err(AppError::bad_request(anyhow::anyhow!(
                    "You cannot deactivate your own account"
                )));
            }
            if dto.role.is_some_and(|role| role != UserRole::Admin) {
                return Err(AppError::bad_request(anyhow::anyhow!(
                    "You cannot change your own role"
                )));
            }
        }

        let mut query = String::from("UPDATE users SET updated_at = NOW()");
        let mut param_count = 1;

        if dto.first_name.is_some() {
            param_count += 1;
            query.push_str(&format!(", first_name = ${}", param_count));
        }
        if dto.last_name.is_some() {
            param_count += 1;
            query.push_str(&format!(", last_name = ${}", param_count));
        }
        if dto.role.is_some() {
            param_count += 1;
            query.push_str(&format!(", role = ${}", param_count));
        }
        if dto.is_active.is_some() {
            param_count += 1;
            query.push_str(&format!(", is_active = ${}", param_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {USER_COLUMNS}"));

        let mut query_builder = sqlx::query_as::<_, User>(&query).bind(id);
        if let Some(first_name) = dto.first_name {
            query_builder = query_builder.bind(first_name);
        }
        if let Some(last_name) = dto.last_name {
            query_builder = query_builder.bind(last_name);
        }
        if let Some(role) = dto.role {
            query_builder = query_builder.bind(role);
        }
        if let Some(is_active) = dto.is_active {
            query_builder = query_builder.bind(is_active);
        }

        query_builder
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("User not found")))
    }

    #[instrument(skip(db))]
    pub async fn delete_user(db: &PgPool, acting_admin: UserId, id: UserId) -> Result<(), AppError> {
        if id == acting_admin {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "You cannot delete your own account"
            )));
        }

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow::anyhow!("User not found")));
        }

        Ok(())
    }

    #[instrument(skip(db))]
    pub async fn update_profile(
        db: &PgPool,
        id: UserId,
        dto: UpdateProfileDto,
    ) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                phone = COALESCE($4, phone),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(&dto.first_name)
        .bind(&dto.last_name)
        .bind(&dto.phone)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("User not found")))
    }

    #[instrument(skip(db, dto))]
    pub async fn change_password(
        db: &PgPool,
        id: UserId,
        dto: ChangePasswordDto,
    ) -> Result<(), AppError> {
        let current_hash =
            sqlx::query_scalar::<_, String>("SELECT password_hash FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(db)
                .await?
                .ok_or_else(|| AppError::not_found(anyhow::anyhow!("User not found")))?;

        if !verify_password(&dto.current_password, &current_hash)? {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Current password is incorrect"
            )));
        }

        if dto.current_password == dto.new_password {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "New password must be different from the current password"
            )));
        }

        let new_hash = hash_password(&dto.new_password)?;

        sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(&new_hash)
            .execute(db)
            .await?;

        Ok(())
    }
}
