use abroadly_core::{AppError, PaginationMeta};
use abroadly_models::{ConsultantId, UserId};
use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument};

use crate::modules::consultants::model::{
    AvailabilityRule, CONSULTANT_COLUMNS, Consultant, ConsultantFilterParams, ConsultantProfile,
    CreateConsultantDto, PaginatedConsultantsResponse, SetAvailabilityDto, SlotQuery,
    SlotsResponse, UpdateConsultantDto,
};
use crate::modules::consultants::slots::{self, Window};

const RULE_COLUMNS: &str = "id, consultant_id, weekday, start_time, end_time";

fn profile_select() -> String {
    format!(
        "SELECT {CONSULTANT_COLUMNS}, u.first_name, u.last_name
         FROM consultants c
         JOIN users u ON u.id = c.user_id"
    )
}

fn not_found() -> AppError {
    AppError::not_found(anyhow::anyhow!("Consultant not found"))
}

pub struct ConsultantService;

impl ConsultantService {
    #[instrument(skip(db))]
    pub async fn list_active(
        db: &PgPool,
        filters: ConsultantFilterParams,
    ) -> Result<PaginatedConsultantsResponse, AppError> {
        let where_clause = r#"
            WHERE c.is_active = TRUE AND u.is_active = TRUE
              AND ($1::text IS NULL OR EXISTS (
                    SELECT 1 FROM unnest(c.countries) AS country
                    WHERE lower(country) = lower($1)))
        "#;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM consultants c JOIN users u ON u.id = c.user_id {where_clause}"
        ))
        .bind(&filters.country)
        .fetch_one(db)
        .await?;

        let consultants = sqlx::query_as::<_, ConsultantProfile>(&format!(
            "{} {where_clause} ORDER BY u.last_name, u.first_name LIMIT $2 OFFSET $3",
            profile_select()
        ))
        .bind(&filters.country)
        .bind(filters.pagination.limit())
        .bind(filters.pagination.offset())
        .fetch_all(db)
        .await?;

        Ok(PaginatedConsultantsResponse {
            data: consultants,
            meta: PaginationMeta::new(total, &filters.pagination),
        })
    }

    /// Public profile; inactive consultants are hidden.
    #[instrument(skip(db))]
    pub async fn get_profile(db: &PgPool, id: ConsultantId) -> Result<ConsultantProfile, AppError> {
        sqlx::query_as::<_, ConsultantProfile>(&format!(
            "{} WHERE c.id = $1 AND c.is_active = TRUE",
            profile_select()
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(not_found)
    }

    /// Consultant row regardless of its active flag.
    pub async fn find(conn: &mut PgConnection, id: ConsultantId) -> Result<Consultant, AppError> {
        sqlx::query_as::<_, Consultant>(&format!(
            "SELECT {CONSULTANT_COLUMNS} FROM consultants c WHERE c.id = $1"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(not_found)
    }

    pub async fn find_by_user(
        db: &PgPool,
        user_id: UserId,
    ) -> Result<Option<Consultant>, AppError> {
        let consultant = sqlx::query_as::<_, Consultant>(&format!(
            "SELECT {CONSULTANT_COLUMNS} FROM consultants c WHERE c.user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(db)
        .await?;

        Ok(consultant)
    }

    /// Creates the profile and promotes the user to the consultant role.
    #[instrument(skip(db, dto), fields(user_id = %dto.user_id))]
    pub async fn create_consultant(
        db: &PgPool,
        dto: CreateConsultantDto,
    ) -> Result<ConsultantProfile, AppError> {
        let mut tx = db.begin().await?;

        let user_exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
                .bind(dto.user_id)
                .fetch_one(&mut *tx)
                .await?;
        if !user_exists {
            return Err(AppError::not_found(anyhow::anyhow!("User not found")));
        }

        let consultant = sqlx::query_as::<_, Consultant>(&format!(
            "INSERT INTO consultants AS c
                 (user_id, headline, bio, specializations, countries, languages, fee_cents,
                  currency, slot_minutes)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {CONSULTANT_COLUMNS}"
        ))
        .bind(dto.user_id)
        .bind(&dto.headline)
        .bind(&dto.bio)
        .bind(&dto.specializations)
        .bind(&dto.countries)
        .bind(&dto.languages)
        .bind(dto.fee_cents)
        .bind(dto.currency.to_uppercase())
        .bind(dto.slot_minutes)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e
                && db_err.is_unique_violation()
            {
                return AppError::conflict(anyhow::anyhow!(
                    "Consultant profile already exists for this user"
                ));
            }
            AppError::from(e)
        })?;

        sqlx::query("UPDATE users SET role = 'consultant', updated_at = NOW() WHERE id = $1")
            .bind(dto.user_id)
            .execute(&mut *tx)
            .await?;

        let profile = sqlx::query_as::<_, ConsultantProfile>(&format!(
            "{} WHERE c.id = $1",
            profile_select()
        ))
        .bind(consultant.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(consultant_id = %profile.consultant.id, "Consultant profile created");
        Ok(profile)
    }

    #[instrument(skip(db, dto))]
    pub async fn update_consultant(
        db: &PgPool,
        id: ConsultantId,
        dto: UpdateConsultantDto,
    ) -> Result<ConsultantProfile, AppError> {
        let updated = sqlx::query_scalar::<_, ConsultantId>(
            r#"
            UPDATE consultants
            SET headline = COALESCE($2, headline),
                bio = COALESCE($3, bio),
                specializations = COALESCE($4, specializations),
                countries = COALESCE($5, countries),
                languages = COALESCE($6, languages),
                fee_cents = COALESCE($7, fee_cents),
                currency = COALESCE($8, currency),
                slot_minutes = COALESCE($9, slot_minutes),
                is_active = COALESCE($10, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(&dto.headline)
        .bind(&dto.bio)
        .bind(&dto.specializations)
        .bind(&dto.countries)
        .bind(&dto.languages)
        .bind(dto.fee_cents)
        .bind(dto.currency.as_deref().map(str::to_uppercase))
        .bind(dto.slot_minutes)
        .bind(dto.is_active)
        .fetch_optional(db)
        .await?
        .ok_or_else(not_found)?;

        sqlx::query_as::<_, ConsultantProfile>(&format!("{} WHERE c.id = $1", profile_select()))
            .bind(updated)
            .fetch_one(db)
            .await
            .map_err(AppError::from)
    }

    pub async fn load_rules(
        conn: &mut PgConnection,
        id: ConsultantId,
    ) -> Result<Vec<AvailabilityRule>, AppError> {
        let rules = sqlx::query_as::<_, AvailabilityRule>(&format!(
            "SELECT {RULE_COLUMNS} FROM availability_rules
             WHERE consultant_id = $1
             ORDER BY weekday, start_time"
        ))
        .bind(id)
        .fetch_all(conn)
        .await?;

        Ok(rules)
    }

    #[instrument(skip(db))]
    pub async fn get_availability(
        db: &PgPool,
        id: ConsultantId,
    ) -> Result<Vec<AvailabilityRule>, AppError> {
        let mut conn = db.acquire().await?;
        Self::find(&mut conn, id).await?;
        Self::load_rules(&mut conn, id).await
    }

    /// Replaces the weekly rules. Only the consultant themself or a caller
    /// allowed to manage every consultant may do this.
    #[instrument(skip(db, dto))]
    pub async fn set_availability(
        db: &PgPool,
        caller: UserId,
        can_manage_any: bool,
        id: ConsultantId,
        dto: SetAvailabilityDto,
    ) -> Result<Vec<AvailabilityRule>, AppError> {
        slots::validate_rules(&dto.rules)
            .map_err(|msg| AppError::bad_request(anyhow::anyhow!(msg)))?;

        let mut tx = db.begin().await?;

        let owner = sqlx::query_scalar::<_, UserId>(
            "SELECT user_id FROM consultants WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(not_found)?;

        if owner != caller && !can_manage_any {
            return Err(AppError::forbidden(
                "You can only change your own availability",
            ));
        }

        sqlx::query("DELETE FROM availability_rules WHERE consultant_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        for rule in &dto.rules {
            sqlx::query(
                "INSERT INTO availability_rules (consultant_id, weekday, start_time, end_time)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(id)
            .bind(rule.weekday)
            .bind(&rule.start_time)
            .bind(&rule.end_time)
            .execute(&mut *tx)
            .await?;
        }

        let rules = Self::load_rules(&mut tx, id).await?;
        tx.commit().await?;

        info!(consultant_id = %id, rules = rules.len(), "Availability replaced");
        Ok(rules)
    }

    /// Pending and confirmed appointments overlapping `[from, to)`.
    pub async fn busy_intervals(
        conn: &mut PgConnection,
        id: ConsultantId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<(DateTime<Utc>, DateTime<Utc>)>, AppError> {
        let busy = sqlx::query_as::<_, (DateTime<Utc>, DateTime<Utc>)>(
            "SELECT starts_at, ends_at FROM appointments
             WHERE consultant_id = $1
               AND status IN ('pending', 'confirmed')
               AND starts_at < $3 AND ends_at > $2",
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .fetch_all(conn)
        .await?;

        Ok(busy)
    }

    #[instrument(skip(db))]
    pub async fn available_slots(
        db: &PgPool,
        id: ConsultantId,
        query: SlotQuery,
    ) -> Result<SlotsResponse, AppError> {
        slots::validate_range(query.from, query.to)
            .map_err(|msg| AppError::bad_request(anyhow::anyhow!(msg)))?;

        let mut conn = db.acquire().await?;
        let consultant = Self::find(&mut conn, id).await?;
        if !consultant.is_active {
            return Err(not_found());
        }

        let windows: Vec<Window> = Self::load_rules(&mut conn, id)
            .await?
            .iter()
            .filter_map(Window::from_rule)
            .collect();

        let range_start = Utc.from_utc_datetime(&query.from.and_time(NaiveTime::MIN));
        let range_end =
            Utc.from_utc_datetime(&query.to.and_time(NaiveTime::MIN)) + Duration::days(1);
        let busy = Self::busy_intervals(&mut conn, id, range_start, range_end).await?;

        let slots = slots::generate_slots(
            &windows,
            consultant.slot_minutes,
            query.from,
            query.to,
            Utc::now(),
            &busy,
        );

        Ok(SlotsResponse {
            consultant_id: id,
            slot_minutes: consultant.slot_minutes,
            from: query.from,
            to: query.to,
            slots,
        })
    }
}
