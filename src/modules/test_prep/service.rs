use abroadly_core::{AppError, PaginationMeta};
use abroadly_models::{QuestionId, SectionId, TestId};
use sqlx::{PgConnection, PgPool, types::Json};
use std::collections::HashMap;
use tracing::instrument;

use crate::modules::test_prep::model::{
    CreateQuestionDto, CreateSectionDto, CreateTestDto, PaginatedTestsResponse, PublicTest,
    QUESTION_COLUMNS, Question, SECTION_COLUMNS, Section, SectionWithQuestions, TEST_COLUMNS,
    Test, TestDetail, TestFilterParams, TestSummary, UpdateQuestionDto, UpdateSectionDto,
    UpdateTestDto, check_question_shape,
};

const SUMMARY_COLUMNS: &str = "(SELECT COUNT(*) FROM test_sections s WHERE s.test_id = tests.id) AS section_count, \
     (SELECT COUNT(*) FROM test_questions q JOIN test_sections s ON s.id = q.section_id \
      WHERE s.test_id = tests.id) AS question_count";

const FILTER_CLAUSE: &str = r#"
    WHERE ($1::test_type IS NULL OR test_type = $1)
      AND ($2::text IS NULL OR title ILIKE $2)
      AND ($3::boolean IS NULL OR is_published = $3)
"#;

pub struct TestService;

impl TestService {
    /// Sections ordered by position, each with its ordered questions.
    pub async fn load_sections(
        conn: &mut PgConnection,
        test_id: TestId,
    ) -> Result<Vec<SectionWithQuestions>, AppError> {
        let sections = sqlx::query_as::<_, Section>(&format!(
            "SELECT {SECTION_COLUMNS} FROM test_sections
             WHERE test_id = $1
             ORDER BY position, created_at"
        ))
        .bind(test_id)
        .fetch_all(&mut *conn)
        .await?;

        let section_ids: Vec<SectionId> = sections.iter().map(|s| s.id).collect();

        let questions = sqlx::query_as::<_, Question>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM test_questions
             WHERE section_id = ANY($1)
             ORDER BY position, created_at"
        ))
        .bind(&section_ids)
        .fetch_all(&mut *conn)
        .await?;

        let mut by_section: HashMap<SectionId, Vec<Question>> = HashMap::new();
        for question in questions {
            by_section.entry(question.section_id).or_default().push(question);
        }

        Ok(sections
            .into_iter()
            .map(|section| SectionWithQuestions {
                questions: by_section.remove(&section.id).unwrap_or_default(),
                section,
            })
            .collect())
    }

    pub async fn find_test(
        conn: &mut PgConnection,
        id: TestId,
        published_only: bool,
    ) -> Result<Test, AppError> {
        sqlx::query_as::<_, Test>(&format!(
            "SELECT {TEST_COLUMNS} FROM tests WHERE id = $1 AND (is_published OR NOT $2)"
        ))
        .bind(id)
        .bind(published_only)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Test not found")))
    }

    async fn list(
        db: &PgPool,
        filters: &TestFilterParams,
        published: Option<bool>,
    ) -> Result<PaginatedTestsResponse, AppError> {
        let search = filters.search.as_ref().map(|s| format!("%{}%", s));

        let total =
            sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM tests {FILTER_CLAUSE}"))
                .bind(filters.test_type)
                .bind(&search)
                .bind(published)
                .fetch_one(db)
                .await?;

        let tests = sqlx::query_as::<_, TestSummary>(&format!(
            "SELECT {TEST_COLUMNS}, {SUMMARY_COLUMNS} FROM tests {FILTER_CLAUSE}
             ORDER BY created_at DESC
             LIMIT $4 OFFSET $5"
        ))
        .bind(filters.test_type)
        .bind(&search)
        .bind(published)
        .bind(filters.pagination.limit())
        .bind(filters.pagination.offset())
        .fetch_all(db)
        .await?;

        Ok(PaginatedTestsResponse {
            data: tests,
            meta: PaginationMeta::new(total, &filters.pagination),
        })
    }

    #[instrument(skip(db))]
    pub async fn list_published(
        db: &PgPool,
        filters: TestFilterParams,
    ) -> Result<PaginatedTestsResponse, AppError> {
        Self::list(db, &filters, Some(true)).await
    }

    #[instrument(skip(db))]
    pub async fn list_all(
        db: &PgPool,
        filters: TestFilterParams,
    ) -> Result<PaginatedTestsResponse, AppError> {
        Self::list(db, &filters, None).await
    }

    /// Published test without correct answers or explanations.
    #[instrument(skip(db))]
    pub async fn get_public_test(db: &PgPool, id: TestId) -> Result<PublicTest, AppError> {
        let mut conn = db.acquire().await?;
        let test = Self::find_test(&mut conn, id, true).await?;
        let sections = Self::load_sections(&mut conn, id).await?;
        Ok(PublicTest::from(TestDetail { test, sections }))
    }

    #[instrument(skip(db))]
    pub async fn get_test_detail(db: &PgPool, id: TestId) -> Result<TestDetail, AppError> {
        let mut conn = db.acquire().await?;
        let test = Self::find_test(&mut conn, id, false).await?;
        let sections = Self::load_sections(&mut conn, id).await?;
        Ok(TestDetail { test, sections })
    }

    #[instrument(skip(db, dto), fields(title = %dto.title))]
    pub async fn create_test(db: &PgPool, dto: CreateTestDto) -> Result<Test, AppError> {
        let test = sqlx::query_as::<_, Test>(&format!(
            "INSERT INTO tests (title, description, test_type, duration_minutes, pass_percentage, is_published)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {TEST_COLUMNS}"
        ))
        .bind(&dto.title)
        .bind(&dto.description)
        .bind(dto.test_type)
        .bind(dto.duration_minutes)
        .bind(dto.pass_percentage)
        .bind(dto.is_published)
        .fetch_one(db)
        .await?;

        Ok(test)
    }

    #[instrument(skip(db))]
    pub async fn update_test(db: &PgPool, id: TestId, dto: UpdateTestDto) -> Result<Test, AppError> {
        sqlx::query_as::<_, Test>(&format!(
            "UPDATE tests SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                test_type = COALESCE($4, test_type),
                duration_minutes = COALESCE($5, duration_minutes),
                pass_percentage = COALESCE($6, pass_percentage),
                is_published = COALESCE($7, is_published),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {TEST_COLUMNS}"
        ))
        .bind(id)
        .bind(&dto.title)
        .bind(&dto.description)
        .bind(dto.test_type)
        .bind(dto.duration_minutes)
        .bind(dto.pass_percentage)
        .bind(dto.is_published)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Test not found")))
    }

    /// Tests with attempts are kept for the students' history. The test row
    /// is locked first so no attempt can start between the count and the delete.
    #[instrument(skip(db))]
    pub async fn delete_test(db: &PgPool, id: TestId) -> Result<(), AppError> {
        let mut tx = db.begin().await?;

        sqlx::query_scalar::<_, TestId>("SELECT id FROM tests WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Test not found")))?;

        let attempts =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM test_attempts WHERE test_id = $1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;

        if attempts > 0 {
            return Err(AppError::conflict(anyhow::anyhow!(
                "Test has {} attempt(s) and cannot be deleted; unpublish it instead",
                attempts
            )));
        }

        sqlx::query("DELETE FROM tests WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(db, dto))]
    pub async fn create_section(
        db: &PgPool,
        test_id: TestId,
        dto: CreateSectionDto,
    ) -> Result<Section, AppError> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM tests WHERE id = $1)")
            .bind(test_id)
            .fetch_one(db)
            .await?;

        if !exists {
            return Err(AppError::not_found(anyhow::anyhow!("Test not found")));
        }

        let section = sqlx::query_as::<_, Section>(&format!(
            "INSERT INTO test_sections (test_id, title, instructions, position)
             VALUES ($1, $2, $3, $4)
             RETURNING {SECTION_COLUMNS}"
        ))
        .bind(test_id)
        .bind(&dto.title)
        .bind(&dto.instructions)
        .bind(dto.position)
        .fetch_one(db)
        .await?;

        Ok(section)
    }

    #[instrument(skip(db, dto))]
    pub async fn update_section(
        db: &PgPool,
        id: SectionId,
        dto: UpdateSectionDto,
    ) -> Result<Section, AppError> {
        sqlx::query_as::<_, Section>(&format!(
            "UPDATE test_sections SET
                title = COALESCE($2, title),
                instructions = COALESCE($3, instructions),
                position = COALESCE($4, position)
             WHERE id = $1
             RETURNING {SECTION_COLUMNS}"
        ))
        .bind(id)
        .bind(&dto.title)
        .bind(&dto.instructions)
        .bind(dto.position)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Section not found")))
    }

    #[instrument(skip(db))]
    pub async fn delete_section(db: &PgPool, id: SectionId) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM test_sections WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow::anyhow!("Section not found")));
        }

        Ok(())
    }

    #[instrument(skip(db, dto))]
    pub async fn create_question(
        db: &PgPool,
        section_id: SectionId,
        dto: CreateQuestionDto,
    ) -> Result<Question, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM test_sections WHERE id = $1)",
        )
        .bind(section_id)
        .fetch_one(db)
        .await?;

        if !exists {
            return Err(AppError::not_found(anyhow::anyhow!("Section not found")));
        }

        let question = sqlx::query_as::<_, Question>(&format!(
            "INSERT INTO test_questions
                (section_id, question_type, prompt, options, correct_answers, points, position, explanation)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {QUESTION_COLUMNS}"
        ))
        .bind(section_id)
        .bind(dto.question_type)
        .bind(&dto.prompt)
        .bind(Json(&dto.options))
        .bind(&dto.correct_answers)
        .bind(dto.points)
        .bind(dto.position)
        .bind(&dto.explanation)
        .fetch_one(db)
        .await?;

        Ok(question)
    }

    /// Applies a partial update, re-checking the merged question's shape.
    #[instrument(skip(db, dto))]
    pub async fn update_question(
        db: &PgPool,
        id: QuestionId,
        dto: UpdateQuestionDto,
    ) -> Result<Question, AppError> {
        let mut tx = db.begin().await?;

        let current = sqlx::query_as::<_, Question>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM test_questions WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Question not found")))?;

        let question_type = dto.question_type.unwrap_or(current.question_type);
        let options = dto.options.unwrap_or(current.options.0);
        let correct_answers = dto.correct_answers.unwrap_or(current.correct_answers);

        check_question_shape(question_type, &options, &correct_answers)
            .map_err(|msg| AppError::unprocessable(anyhow::anyhow!(msg)))?;

        let question = sqlx::query_as::<_, Question>(&format!(
            "UPDATE test_questions SET
                question_type = $2,
                prompt = COALESCE($3, prompt),
                options = $4,
                correct_answers = $5,
                points = COALESCE($6, points),
                position = COALESCE($7, position),
                explanation = COALESCE($8, explanation)
             WHERE id = $1
             RETURNING {QUESTION_COLUMNS}"
        ))
        .bind(id)
        .bind(question_type)
        .bind(&dto.prompt)
        .bind(Json(&options))
        .bind(&correct_answers)
        .bind(dto.points)
        .bind(dto.position)
        .bind(&dto.explanation)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(question)
    }

    #[instrument(skip(db))]
    pub async fn delete_question(db: &PgPool, id: QuestionId) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM test_questions WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow::anyhow!("Question not found")));
        }

        Ok(())
    }
}
