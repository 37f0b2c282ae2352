use abroadly_core::{AppError, PaginationMeta};
use abroadly_models::{CourseId, Slug};
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use crate::modules::courses::model::{
    COURSE_COLUMNS, Course, CourseFilterParams, CourseWithStats, CreateCourseDto,
    PaginatedCoursesResponse, PaginatedCoursesWithStatsResponse, UpdateCourseDto,
};

const STATS_COLUMNS: &str = "(SELECT COUNT(*) FROM enrollments e WHERE e.course_id = courses.id) AS enrollment_count, \
     (SELECT COUNT(*) FROM enrollments e WHERE e.course_id = courses.id AND e.status = 'active') AS active_enrollment_count";

const FILTER_CLAUSE: &str = r#"
    WHERE ($1::text IS NULL OR title ILIKE $1 OR university ILIKE $1 OR description ILIKE $1)
      AND ($2::text IS NULL OR LOWER(country) = LOWER($2))
      AND ($3::course_level IS NULL OR level = $3)
      AND ($4::boolean IS NULL OR is_published = $4)
"#;

fn slug_conflict(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e
        && db_err.is_unique_violation()
    {
        return AppError::conflict(anyhow::anyhow!("A course with this slug already exists"));
    }
    AppError::from(e)
}

pub struct CourseService;

impl CourseService {
    /// First free slug derived from `title`: `base`, `base-2`, `base-3`, ...
    async fn generate_slug(db: &PgPool, title: &str) -> Result<Slug, AppError> {
        let slug = Slug::from_title(title).ok_or_else(|| {
            AppError::bad_request(anyhow::anyhow!("Cannot derive a slug from the title"))
        })?;
        // Leave room for a numeric suffix.
        let base = slug
            .as_str()
            .get(..Slug::MAX_LEN - 6)
            .unwrap_or(slug.as_str())
            .trim_end_matches('-')
            .to_string();

        let taken = sqlx::query_scalar::<_, String>(
            "SELECT slug FROM courses WHERE slug = $1 OR slug LIKE $1 || '-%'",
        )
        .bind(&base)
        .fetch_all(db)
        .await?;

        let mut candidate = base.clone();
        let mut n = 1;
        while taken.contains(&candidate) {
            n += 1;
            candidate = format!("{}-{}", base, n);
        }

        Slug::new(candidate).map_err(AppError::internal)
    }

    #[instrument(skip(db, dto), fields(title = %dto.title))]
    pub async fn create_course(db: &PgPool, dto: CreateCourseDto) -> Result<Course, AppError> {
        let slug = match dto.slug {
            Some(slug) => slug,
            None => Self::generate_slug(db, &dto.title).await?,
        };

        let course = sqlx::query_as::<_, Course>(&format!(
            "INSERT INTO courses
                (title, slug, description, country, university, level, duration_weeks,
                 fee_cents, currency, intake, is_published)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {COURSE_COLUMNS}"
        ))
        .bind(&dto.title)
        .bind(&slug)
        .bind(&dto.description)
        .bind(&dto.country)
        .bind(&dto.university)
        .bind(dto.level)
        .bind(dto.duration_weeks)
        .bind(dto.fee_cents)
        .bind(dto.currency.to_uppercase())
        .bind(&dto.intake)
        .bind(dto.is_published)
        .fetch_one(db)
        .await
        .map_err(slug_conflict)?;

        Ok(course)
    }

    /// Published courses only.
    #[instrument(skip(db))]
    pub async fn list_published(
        db: &PgPool,
        mut filters: CourseFilterParams,
    ) -> Result<PaginatedCoursesResponse, AppError> {
        filters.is_published = Some(true);
        let search = filters.search.as_ref().map(|s| format!("%{}%", s));

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM courses {FILTER_CLAUSE}"
        ))
        .bind(&search)
        .bind(&filters.country)
        .bind(filters.level)
        .bind(filters.is_published)
        .fetch_one(db)
        .await?;

        let courses = sqlx::query_as::<_, Course>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses {FILTER_CLAUSE}
             ORDER BY created_at DESC
             LIMIT $5 OFFSET $6"
        ))
        .bind(&search)
        .bind(&filters.country)
        .bind(filters.level)
        .bind(filters.is_published)
        .bind(filters.pagination.limit())
        .bind(filters.pagination.offset())
        .fetch_all(db)
        .await?;

        Ok(PaginatedCoursesResponse {
            data: courses,
            meta: PaginationMeta::new(total, &filters.pagination),
        })
    }

    /// Admin listing including drafts, with enrollment counts.
    #[instrument(skip(db))]
    pub async fn list_with_stats(
        db: &PgPool,
        filters: CourseFilterParams,
    ) -> Result<PaginatedCoursesWithStatsResponse, AppError> {
        let search = filters.search.as_ref().map(|s| format!("%{}%", s));

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM courses {FILTER_CLAUSE}"
        ))
        .bind(&search)
        .bind(&filters.country)
        .bind(filters.level)
        .bind(filters.is_published)
        .fetch_one(db)
        .await?;

        let courses = sqlx::query_as::<_, CourseWithStats>(&format!(
            "SELECT {COURSE_COLUMNS}, {STATS_COLUMNS} FROM courses {FILTER_CLAUSE}
             ORDER BY created_at DESC
             LIMIT $5 OFFSET $6"
        ))
        .bind(&search)
        .bind(&filters.country)
        .bind(filters.level)
        .bind(filters.is_published)
        .bind(filters.pagination.limit())
        .bind(filters.pagination.offset())
        .fetch_all(db)
        .await?;

        Ok(PaginatedCoursesWithStatsResponse {
            data: courses,
            meta: PaginationMeta::new(total, &filters.pagination),
        })
    }

    /// Looks a published course up by UUID or slug.
    #[instrument(skip(db))]
    pub async fn get_published(db: &PgPool, id_or_slug: &str) -> Result<Course, AppError> {
        let course = match id_or_slug.parse::<Uuid>() {
            Ok(id) => {
                sqlx::query_as::<_, Course>(&format!(
                    "SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1 AND is_published = TRUE"
                ))
                .bind(id)
                .fetch_optional(db)
                .await?
            }
            Err(_) => {
                sqlx::query_as::<_, Course>(&format!(
                    "SELECT {COURSE_COLUMNS} FROM courses WHERE slug = $1 AND is_published = TRUE"
                ))
                .bind(id_or_slug)
                .fetch_optional(db)
                .await?
            }
        };

        course.ok_or_else(|| AppError::not_found(anyhow::anyhow!("Course not found")))
    }

    #[instrument(skip(db))]
    pub async fn get_course(db: &PgPool, id: CourseId) -> Result<Course, AppError> {
        sqlx::query_as::<_, Course>(&format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Course not found")))
    }

    #[instrument(skip(db))]
    pub async fn get_with_stats(db: &PgPool, id: CourseId) -> Result<CourseWithStats, AppError> {
        sqlx::query_as::<_, CourseWithStats>(&format!(
            "SELECT {COURSE_COLUMNS}, {STATS_COLUMNS} FROM courses WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Course not found")))
    }

    #[instrument(skip(db))]
    pub async fn update_course(
        db: &PgPool,
        id: CourseId,
        dto: UpdateCourseDto,
    ) -> Result<Course, AppError> {
        sqlx::query_as::<_, Course>(&format!(
            "UPDATE courses SET
                title = COALESCE($2, title),
                slug = COALESCE($3, slug),
                description = COALESCE($4, description),
                country = COALESCE($5, country),
                university = COALESCE($6, university),
                level = COALESCE($7, level),
                duration_weeks = COALESCE($8, duration_weeks),
                fee_cents = COALESCE($9, fee_cents),
                currency = COALESCE($10, currency),
                intake = COALESCE($11, intake),
                is_published = COALESCE($12, is_published),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COURSE_COLUMNS}"
        ))
        .bind(id)
        .bind(&dto.title)
        .bind(&dto.slug)
        .bind(&dto.description)
        .bind(&dto.country)
        .bind(&dto.university)
        .bind(dto.level)
        .bind(dto.duration_weeks)
        .bind(dto.fee_cents)
        .bind(dto.currency.map(|c| c.to_uppercase()))
        .bind(&dto.intake)
        .bind(dto.is_published)
        .fetch_optional(db)
        .await
        .map_err(slug_conflict)?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Course not found")))
    }

    #[instrument(skip(db))]
    pub async fn delete_course(db: &PgPool, id: CourseId) -> Result<(), AppError> {
        let mut tx = db.begin().await?;

        sqlx::query_scalar::<_, CourseId>("SELECT id FROM courses WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Course not found")))?;

        let enrollments =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM enrollments WHERE course_id = $1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;

        if enrollments > 0 {
            return Err(AppError::conflict(anyhow::anyhow!(
                "Course has {} enrollment(s) and cannot be deleted; unpublish it instead",
                enrollments
            )));
        }

        sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
