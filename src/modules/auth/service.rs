use abroadly_auth::{create_access_token, create_refresh_token, verify_refresh_token};
use abroadly_config::JwtConfig;
use abroadly_core::{AppError, hash_password, verify_password};
use abroadly_models::{User, UserId, UserRole};
use sqlx::{FromRow, PgPool};
use tracing::instrument;

use crate::metrics;
use crate::modules::auth::model::{AuthResponse, LoginRequest, RegisterRequest};
use crate::modules::users::model::USER_COLUMNS;
use crate::modules::users::service::UserService;

pub struct AuthService;

#[derive(FromRow)]
struct UserWithPassword {
    #[sqlx(flatten)]
    user: User,
    password_hash: String,
}

impl AuthService {
    /// Issues a fresh access/refresh pair for `user`.
    pub fn issue_tokens(user: User, jwt_config: &JwtConfig) -> Result<AuthResponse, AppError> {
        let access_token = create_access_token(
            user.id.into_inner(),
            user.email.as_str(),
            user.role.as_str(),
            user.role.permissions(),
            jwt_config,
        )?;
        let refresh_token =
            create_refresh_token(user.id.into_inner(), user.email.as_str(), jwt_config)?;

        metrics::track_jwt_issued();

        Ok(AuthResponse {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: jwt_config.access_token_expiry,
            user,
        })
    }

    #[instrument(skip(db, dto, jwt_config), fields(email = %dto.email))]
    pub async fn register(
        db: &PgPool,
        dto: RegisterRequest,
        jwt_config: &JwtConfig,
    ) -> Result<AuthResponse, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)",
        )
        .bind(&dto.email)
        .fetch_one(db)
        .await?;

        if exists {
            return Err(AppError::bad_request(anyhow::anyhow!("Email already exists")));
        }

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
        .bind(UserRole::Student)
        .fetch_one(db)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e
                && db_err.is_unique_violation()
            {
                return AppError::bad_request(anyhow::anyhow!("Email already exists"));
            }
            AppError::from(e)
        })?;

        metrics::track_user_registered();

        Self::issue_tokens(user, jwt_config)
    }

    #[instrument(skip(db, dto, jwt_config), fields(email = %dto.email))]
    pub async fn login(
        db: &PgPool,
        dto: LoginRequest,
        jwt_config: &JwtConfig,
    ) -> Result<AuthResponse, AppError> {
        let email = dto.email.trim().to_lowercase();

        let Some(found) = sqlx::query_as::<_, UserWithPassword>(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = $1"
        ))
        .bind(&email)
        .fetch_optional(db)
        .await?
        else {
            metrics::track_user_login_failure("unknown_email");
            return Err(AppError::unauthorized("Invalid email or password"));
        };

        if !verify_password(&dto.password, &found.password_hash)? {
            metrics::track_user_login_failure("invalid_password");
            return Err(AppError::unauthorized("Invalid email or password"));
        }

        if !found.user.is_active {
            metrics::track_user_login_failure("account_disabled");
            return Err(AppError::unauthorized("Account is disabled"));
        }

        metrics::track_user_login_success(found.user.role.as_str());

        Self::issue_tokens(found.user, jwt_config)
    }

    /// Exchanges a refresh token for a new pair. Role changes take effect here.
    #[instrument(skip_all)]
    pub async fn refresh(
        db: &PgPool,
        refresh_token: &str,
        jwt_config: &JwtConfig,
    ) -> Result<AuthResponse, AppError> {
        let claims = verify_refresh_token(refresh_token, jwt_config)?;

        let user_id: UserId = claims
            .sub
            .parse()
            .map_err(|_| AppError::unauthorized("Invalid or expired refresh token"))?;

        let user = UserService::get_user(db, user_id)
            .await
            .map_err(|_| AppError::unauthorized("User no longer exists"))?;

        if !user.is_active {
            return Err(AppError::unauthorized("Account is disabled"));
        }

        Self::issue_tokens(user, jwt_config)
    }
}
