//! Timed, resumable test attempts.
//!
//! An attempt stays open until it is submitted. Answers are accepted until
//! `expires_at` plus a short grace period; after that the attempt is closed
//! as `expired` the next time it is touched, scored on what was saved.

use abroadly_core::AppError;
use abroadly_models::{AttemptId, TestId, UserId};
use chrono::{Duration, Utc};
use sqlx::{PgConnection, PgPool, types::Json};
use std::collections::HashSet;
use tracing::{info, instrument};

use crate::metrics;
use crate::modules::test_prep::model::{
    ATTEMPT_COLUMNS, Answers, Attempt, AttemptDetail, AttemptStatus, AttemptWithTest,
    SectionWithQuestions, Test,
};
use crate::modules::test_prep::scoring::{
    remaining_seconds, score_attempt, submission_status, within_grace,
};
use crate::modules::test_prep::service::TestService;

pub struct AttemptService;

/// Rejects answers for questions that are not part of the test.
fn check_answer_keys(sections: &[SectionWithQuestions], answers: &Answers) -> Result<(), AppError> {
    let known: HashSet<_> = sections
        .iter()
        .flat_map(|s| s.questions.iter().map(|q| q.id))
        .collect();

    match answers.keys().find(|id| !known.contains(id)) {
        Some(unknown) => Err(AppError::bad_request(anyhow::anyhow!(
            "Question {} is not part of this test",
            unknown
        ))),
        None => Ok(()),
    }
}

impl AttemptService {
    async fn lock_attempt(conn: &mut PgConnection, id: AttemptId) -> Result<Attempt, AppError> {
        sqlx::query_as::<_, Attempt>(&format!(
            "SELECT {ATTEMPT_COLUMNS} FROM test_attempts WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Attempt not found")))
    }

    /// Scores `attempt` with its saved answers and closes it.
    async fn finalize(
        conn: &mut PgConnection,
        attempt: &Attempt,
        status: AttemptStatus,
    ) -> Result<(Attempt, SectionsAndReview), AppError> {
        let test = TestService::find_test(&mut *conn, attempt.test_id, false).await?;
        let sections = TestService::load_sections(&mut *conn, attempt.test_id).await?;
        let (summary, _) = score_attempt(&test, &sections, &attempt.answers.0);

        let closed = sqlx::query_as::<_, Attempt>(&format!(
            "UPDATE test_attempts SET
                status = $2, submitted_at = NOW(), score = $3, max_score = $4,
                percentage = $5, passed = $6, band_score = $7, section_results = $8
             WHERE id = $1
             RETURNING {ATTEMPT_COLUMNS}"
        ))
        .bind(attempt.id)
        .bind(status)
        .bind(summary.score)
        .bind(summary.max_score)
        .bind(summary.percentage)
        .bind(summary.passed)
        .bind(summary.band_score)
        .bind(Json(&summary.sections))
        .fetch_one(&mut *conn)
        .await?;

        metrics::track_attempt_submitted(test.test_type.as_str(), status.as_str());
        info!(attempt_id = %attempt.id, status = status.as_str(), score = summary.score, "Attempt scored");

        Ok((closed, SectionsAndReview { test, sections }))
    }

    /// Starts an attempt, or resumes the caller's open one for this test while
    /// its time has not run out. An open attempt past `expires_at` is closed
    /// as expired and a fresh one is started. The flag is `true` when a new
    /// attempt was created.
    #[instrument(skip(db))]
    pub async fn start(
        db: &PgPool,
        user_id: UserId,
        test_id: TestId,
    ) -> Result<(Attempt, bool), AppError> {
        let mut tx = db.begin().await?;
        let test = TestService::find_test(&mut tx, test_id, true).await?;

        let open = sqlx::query_as::<_, Attempt>(&format!(
            "SELECT {ATTEMPT_COLUMNS} FROM test_attempts
             WHERE user_id = $1 AND test_id = $2 AND status = 'in_progress'
             FOR UPDATE"
        ))
        .bind(user_id)
        .bind(test_id)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(open) = open {
            if Utc::now() < open.expires_at {
                tx.commit().await?;
                return Ok((open, false));
            }
            Self::finalize(&mut tx, &open, AttemptStatus::Expired).await?;
        }

        let expires_at = Utc::now() + Duration::minutes(i64::from(test.duration_minutes));

        let attempt = sqlx::query_as::<_, Attempt>(&format!(
            "INSERT INTO test_attempts (test_id, user_id, expires_at)
             VALUES ($1, $2, $3)
             RETURNING {ATTEMPT_COLUMNS}"
        ))
        .bind(test_id)
        .bind(user_id)
        .bind(expires_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e
                && db_err.is_unique_violation()
            {
                return AppError::conflict(anyhow::anyhow!(
                    "An attempt for this test is already in progress"
                ));
            }
            AppError::from(e)
        })?;

        tx.commit().await?;

        Ok((attempt, true))
    }

    /// Merges `answers` into the saved answers of an open attempt.
    #[instrument(skip(db, answers))]
    pub async fn save_answers(
        db: &PgPool,
        user_id: UserId,
        id: AttemptId,
        answers: Answers,
    ) -> Result<AttemptDetail, AppError> {
        let mut tx = db.begin().await?;
        let attempt = Self::lock_attempt(&mut tx, id).await?;

        if attempt.user_id != user_id {
            return Err(AppError::not_found(anyhow::anyhow!("Attempt not found")));
        }
        if attempt.status != AttemptStatus::InProgress {
            return Err(AppError::conflict(anyhow::anyhow!(
                "Attempt has already been submitted"
            )));
        }

        let now = Utc::now();
        if !within_grace(attempt.expires_at, now) {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Time is up for this attempt; submit it to see your score"
            )));
        }

        let sections = TestService::load_sections(&mut tx, attempt.test_id).await?;
        check_answer_keys(&sections, &answers)?;

        let mut merged = attempt.answers.0;
        merged.extend(answers);

        let saved = sqlx::query_as::<_, Attempt>(&format!(
            "UPDATE test_attempts SET answers = $2 WHERE id = $1 RETURNING {ATTEMPT_COLUMNS}"
        ))
        .bind(id)
        .bind(Json(&merged))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(AttemptDetail {
            remaining_seconds: remaining_seconds(saved.expires_at, now),
            attempt: saved,
            review: None,
        })
    }

    /// Submits an open attempt. Final answers are only merged while the
    /// attempt is still within its grace period.
    #[instrument(skip(db, final_answers))]
    pub async fn submit(
        db: &PgPool,
        user_id: UserId,
        id: AttemptId,
        final_answers: Option<Answers>,
    ) -> Result<AttemptDetail, AppError> {
        let mut tx = db.begin().await?;
        let mut attempt = Self::lock_attempt(&mut tx, id).await?;

        if attempt.user_id != user_id {
            return Err(AppError::not_found(anyhow::anyhow!("Attempt not found")));
        }
        if attempt.status != AttemptStatus::InProgress {
            return Err(AppError::conflict(anyhow::anyhow!(
                "Attempt has already been submitted"
            )));
        }

        let status = submission_status(attempt.expires_at, Utc::now());

        if let Some(answers) = final_answers.filter(|_| status == AttemptStatus::Submitted) {
            let sections = TestService::load_sections(&mut tx, attempt.test_id).await?;
            check_answer_keys(&sections, &answers)?;
            attempt.answers.0.extend(answers);

            sqlx::query("UPDATE test_attempts SET answers = $2 WHERE id = $1")
                .bind(id)
                .bind(Json(&attempt.answers.0))
                .execute(&mut *tx)
                .await?;
        }

        let (closed, structure) = Self::finalize(&mut tx, &attempt, status).await?;
        tx.commit().await?;

        Ok(structure.detail(closed))
    }

    /// Owner, or any caller allowed to read every attempt. Open attempts past
    /// their grace period are closed as expired first.
    #[instrument(skip(db))]
    pub async fn get_attempt(
        db: &PgPool,
        user_id: UserId,
        can_read_all: bool,
        id: AttemptId,
    ) -> Result<AttemptDetail, AppError> {
        let mut tx = db.begin().await?;
        let attempt = Self::lock_attempt(&mut tx, id).await?;

        if attempt.user_id != user_id && !can_read_all {
            return Err(AppError::not_found(anyhow::anyhow!("Attempt not found")));
        }

        let now = Utc::now();
        let detail = match attempt.status {
            AttemptStatus::InProgress if within_grace(attempt.expires_at, now) => AttemptDetail {
                remaining_seconds: remaining_seconds(attempt.expires_at, now),
                attempt,
                review: None,
            },
            AttemptStatus::InProgress => {
                let (closed, structure) =
                    Self::finalize(&mut tx, &attempt, AttemptStatus::Expired).await?;
                structure.detail(closed)
            }
            AttemptStatus::Submitted | AttemptStatus::Expired => {
                let test = TestService::find_test(&mut tx, attempt.test_id, false).await?;
                let sections = TestService::load_sections(&mut tx, attempt.test_id).await?;
                SectionsAndReview { test, sections }.detail(attempt)
            }
        };

        tx.commit().await?;

        Ok(detail)
    }

    #[instrument(skip(db))]
    pub async fn list_for_user(
        db: &PgPool,
        user_id: UserId,
    ) -> Result<Vec<AttemptWithTest>, AppError> {
        let attempts = sqlx::query_as::<_, AttemptWithTest>(
            r#"SELECT a.id, a.test_id, a.user_id, a.status, a.answers, a.started_at,
                      a.expires_at, a.submitted_at, a.score, a.max_score, a.percentage,
                      a.passed, a.band_score, a.section_results,
                      t.title AS test_title, t.test_type
               FROM test_attempts a
               JOIN tests t ON t.id = a.test_id
               WHERE a.user_id = $1
               ORDER BY a.started_at DESC"#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await?;

        Ok(attempts)
    }
}

/// Test structure used to build the review of a closed attempt.
struct SectionsAndReview {
    test: Test,
    sections: Vec<SectionWithQuestions>,
}

impl SectionsAndReview {
    fn detail(self, attempt: Attempt) -> AttemptDetail {
        let (_, review) = score_attempt(&self.test, &self.sections, &attempt.answers.0);
        AttemptDetail {
            remaining_seconds: 0,
            attempt,
            review: Some(review),
        }
    }
}
