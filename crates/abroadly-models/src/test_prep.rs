//! Test-prep models: tests, sections, questions and attempts.

use std::collections::BTreeMap;

use abroadly_core::serde::deserialize_optional_string;
use abroadly_core::{PaginationMeta, PaginationParams};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::ids::{AttemptId, QuestionId, SectionId, TestId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "test_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TestType {
    Ielts,
    Toefl,
    Pte,
    Gre,
    Gmat,
    Sat,
    Duolingo,
}

impl TestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ielts => "ielts",
            Self::Toefl => "toefl",
            Self::Pte => "pte",
            Self::Gre => "gre",
            Self::Gmat => "gmat",
            Self::Sat => "sat",
            Self::Duolingo => "duolingo",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "question_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    FillBlank,
    Essay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "attempt_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Submitted,
    Expired,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Submitted => "submitted",
            Self::Expired => "expired",
        }
    }
}

/// Answers keyed by question. Each answer is the raw text the student gave.
pub type Answers = BTreeMap<QuestionId, String>;

// ============================================================================
// Authoring
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Test {
    pub id: TestId,
    pub title: String,
    pub description: Option<String>,
    pub test_type: TestType,
    pub duration_minutes: i32,
    pub pass_percentage: f64,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const TEST_COLUMNS: &str = "id, title, description, test_type, duration_minutes, \
     pass_percentage, is_published, created_at, updated_at";

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct TestSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub test: Test,
    pub section_count: i64,
    pub question_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Section {
    pub id: SectionId,
    pub test_id: TestId,
    pub title: String,
    pub instructions: Option<String>,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

pub const SECTION_COLUMNS: &str = "id, test_id, title, instructions, position, created_at";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Question {
    pub id: QuestionId,
    pub section_id: SectionId,
    pub question_type: QuestionType,
    pub prompt: String,
    #[schema(value_type = Vec<String>)]
    pub options: Json<Vec<String>>,
    pub correct_answers: Vec<String>,
    pub points: i32,
    pub position: i32,
    pub explanation: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub const QUESTION_COLUMNS: &str = "id, section_id, question_type, prompt, options, \
     correct_answers, points, position, explanation, created_at";

/// Section with every question, answers included. Admin view.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SectionWithQuestions {
    #[serde(flatten)]
    pub section: Section,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TestDetail {
    #[serde(flatten)]
    pub test: Test,
    pub sections: Vec<SectionWithQuestions>,
}

/// Question as shown to a student taking the test.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PublicQuestion {
    pub id: QuestionId,
    pub question_type: QuestionType,
    pub prompt: String,
    pub options: Vec<String>,
    pub points: i32,
    pub position: i32,
}

impl From<Question> for PublicQuestion {
    fn from(q: Question) -> Self {
        Self {
            id: q.id,
            question_type: q.question_type,
            prompt: q.prompt,
            options: q.options.0,
            points: q.points,
            position: q.position,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PublicSection {
    pub id: SectionId,
    pub title: String,
    pub instructions: Option<String>,
    pub position: i32,
    pub questions: Vec<PublicQuestion>,
}

impl From<SectionWithQuestions> for PublicSection {
    fn from(s: SectionWithQuestions) -> Self {
        Self {
            id: s.section.id,
            title: s.section.title,
            instructions: s.section.instructions,
            position: s.section.position,
            questions: s.questions.into_iter().map(PublicQuestion::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PublicTest {
    #[serde(flatten)]
    pub test: Test,
    pub sections: Vec<PublicSection>,
}

impl From<TestDetail> for PublicTest {
    fn from(detail: TestDetail) -> Self {
        Self {
            test: detail.test,
            sections: detail.sections.into_iter().map(PublicSection::from).collect(),
        }
    }
}

fn default_pass_percentage() -> f64 {
    50.0
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateTestDto {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub description: Option<String>,
    pub test_type: TestType,
    #[validate(range(min = 1, max = 600))]
    pub duration_minutes: i32,
    #[validate(range(min = 0.0, max = 100.0))]
    #[serde(default = "default_pass_percentage")]
    pub pass_percentage: f64,
    #[serde(default)]
    pub is_published: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateTestDto {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub test_type: Option<TestType>,
    #[validate(range(min = 1, max = 600))]
    pub duration_minutes: Option<i32>,
    #[validate(range(min = 0.0, max = 100.0))]
    pub pass_percentage: Option<f64>,
    pub is_published: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateSectionDto {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub instructions: Option<String>,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub position: i32,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateSectionDto {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub instructions: Option<String>,
    #[validate(range(min = 0))]
    pub position: Option<i32>,
}

fn default_points() -> i32 {
    1
}

/// Checks that options and correct answers fit the question type.
///
/// - multiple choice: at least two distinct options, every correct answer is
///   one of them
/// - true/false: exactly one correct answer, `true` or `false`
/// - fill in the blank: at least one accepted answer
/// - essay: no correct answers
pub fn check_question_shape(
    question_type: QuestionType,
    options: &[String],
    correct_answers: &[String],
) -> Result<(), String> {
    match question_type {
        QuestionType::MultipleChoice => {
            if options.len() < 2 {
                return Err("Multiple choice questions need at least two options".into());
            }
            let mut seen = std::collections::HashSet::new();
            if !options.iter().all(|o| seen.insert(o.trim().to_lowercase())) {
                return Err("Options must be distinct".into());
            }
            if correct_answers.is_empty() {
                return Err("Multiple choice questions need a correct answer".into());
            }
            if !correct_answers.iter().all(|a| options.contains(a)) {
                return Err("Every correct answer must be one of the options".into());
            }
        }
        QuestionType::TrueFalse => match correct_answers {
            [answer] if matches!(answer.trim().to_lowercase().as_str(), "true" | "false") => {}
            _ => return Err("True/false questions need exactly one answer: true or false".into()),
        },
        QuestionType::FillBlank => {
            if correct_answers.iter().all(|a| a.trim().is_empty()) {
                return Err("Fill in the blank questions need at least one accepted answer".into());
            }
        }
        QuestionType::Essay => {
            if !correct_answers.is_empty() {
                return Err("Essay questions are reviewed manually and take no answers".into());
            }
        }
    }
    Ok(())
}

fn validate_question_shape(dto: &CreateQuestionDto) -> Result<(), ValidationError> {
    check_question_shape(dto.question_type, &dto.options, &dto.correct_answers).map_err(|msg| {
        let mut err = ValidationError::new("question_shape");
        err.message = Some(msg.into());
        err
    })
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_question_shape"))]
pub struct CreateQuestionDto {
    pub question_type: QuestionType,
    #[validate(length(min = 1, max = 5000))]
    pub prompt: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub correct_answers: Vec<String>,
    #[validate(range(min = 0, max = 100))]
    #[serde(default = "default_points")]
    pub points: i32,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub position: i32,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateQuestionDto {
    pub question_type: Option<QuestionType>,
    #[validate(length(min = 1, max = 5000))]
    pub prompt: Option<String>,
    pub options: Option<Vec<String>>,
    pub correct_answers: Option<Vec<String>>,
    #[validate(range(min = 0, max = 100))]
    pub points: Option<i32>,
    #[validate(range(min = 0))]
    pub position: Option<i32>,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct TestFilterParams {
    pub test_type: Option<TestType>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub search: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginatedTestsResponse {
    pub data: Vec<TestSummary>,
    pub meta: PaginationMeta,
}

// ============================================================================
// Attempts & scoring
// ============================================================================

/// Per-section tally produced when an attempt is scored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SectionResult {
    pub section_id: SectionId,
    pub title: String,
    pub score: i32,
    pub max_score: i32,
    pub correct: i32,
    pub incorrect: i32,
    pub unanswered: i32,
    pub pending_review: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ScoreSummary {
    pub score: i32,
    pub max_score: i32,
    pub percentage: f64,
    pub passed: bool,
    /// IELTS only: percentage mapped onto the 0 to 9 band scale in half steps
    pub band_score: Option<f64>,
    pub sections: Vec<SectionResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Attempt {
    pub id: AttemptId,
    pub test_id: TestId,
    pub user_id: UserId,
    pub status: AttemptStatus,
    #[schema(value_type = Object)]
    pub answers: Json<Answers>,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub score: Option<i32>,
    pub max_score: Option<i32>,
    pub percentage: Option<f64>,
    pub passed: Option<bool>,
    pub band_score: Option<f64>,
    #[schema(value_type = Option<Vec<SectionResult>>)]
    pub section_results: Option<Json<Vec<SectionResult>>>,
}

pub const ATTEMPT_COLUMNS: &str = "id, test_id, user_id, status, answers, started_at, \
     expires_at, submitted_at, score, max_score, percentage, passed, band_score, section_results";

/// Attempt row with the test title, for "my attempts".
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct AttemptWithTest {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub attempt: Attempt,
    pub test_title: String,
    pub test_type: TestType,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuestionReview {
    pub question_id: QuestionId,
    pub section_id: SectionId,
    pub question_type: QuestionType,
    pub prompt: String,
    pub given_answer: Option<String>,
    pub correct_answers: Vec<String>,
    /// `None` for essays awaiting review and for unanswered questions
    pub is_correct: Option<bool>,
    pub points: i32,
    pub points_awarded: i32,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AttemptDetail {
    #[serde(flatten)]
    pub attempt: Attempt,
    /// Seconds left before the attempt expires; 0 once past `expires_at`
    pub remaining_seconds: i64,
    /// Present once the attempt has been submitted or expired
    pub review: Option<Vec<QuestionReview>>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SaveAnswersDto {
    #[schema(value_type = Object)]
    pub answers: Answers,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct SubmitAttemptDto {
    #[schema(value_type = Option<Object>)]
    pub answers: Option<Answers>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_multiple_choice_shape() {
        let options = strings(&["Paris", "London", "Rome"]);
        assert!(check_question_shape(QuestionType::MultipleChoice, &options, &strings(&["Paris"])).is_ok());
        assert!(check_question_shape(QuestionType::MultipleChoice, &options, &strings(&["Berlin"])).is_err());
        assert!(check_question_shape(QuestionType::MultipleChoice, &options, &[]).is_err());
        assert!(check_question_shape(QuestionType::MultipleChoice, &strings(&["A"]), &strings(&["A"])).is_err());
        assert!(check_question_shape(QuestionType::MultipleChoice, &strings(&["A", "a"]), &strings(&["A"])).is_err());
    }

    #[test]
    fn test_true_false_shape() {
        assert!(check_question_shape(QuestionType::TrueFalse, &[], &strings(&["True"])).is_ok());
        assert!(check_question_shape(QuestionType::TrueFalse, &[], &strings(&["yes"])).is_err());
        assert!(check_question_shape(QuestionType::TrueFalse, &[], &strings(&["true", "false"])).is_err());
    }

    #[test]
    fn test_fill_blank_and_essay_shape() {
        assert!(check_question_shape(QuestionType::FillBlank, &[], &strings(&["colour", "color"])).is_ok());
        assert!(check_question_shape(QuestionType::FillBlank, &[], &strings(&["  "])).is_err());
        assert!(check_question_shape(QuestionType::Essay, &[], &[]).is_ok());
        assert!(check_question_shape(QuestionType::Essay, &[], &strings(&["model answer"])).is_err());
    }

    #[test]
    fn test_create_question_dto_runs_shape_check() {
        let dto: CreateQuestionDto = serde_json::from_str(
            r#"{"question_type":"multiple_choice","prompt":"Capital of France?","options":["Paris","Rome"],"correct_answers":["Madrid"]}"#,
        )
        .unwrap();
        assert_eq!(dto.points, 1);
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_answers_deserialize_with_question_ids() {
        let id = QuestionId::new();
        let json = format!(r#"{{"answers":{{"{id}":"B"}}}}"#);
        let dto: SaveAnswersDto = serde_json::from_str(&json).unwrap();
        assert_eq!(dto.answers.get(&id).map(String::as_str), Some("B"));
    }

    #[test]
    fn test_public_question_hides_answers() {
        let question = Question {
            id: QuestionId::new(),
            section_id: SectionId::new(),
            question_type: QuestionType::MultipleChoice,
            prompt: "2 + 2?".into(),
            options: Json(strings(&["3", "4"])),
            correct_answers: strings(&["4"]),
            points: 1,
            position: 0,
            explanation: Some("Arithmetic".into()),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(PublicQuestion::from(question)).unwrap();
        assert!(json.get("correct_answers").is_none());
        assert!(json.get("explanation").is_none());
        assert_eq!(json["options"], serde_json::json!(["3", "4"]));
    }
}
