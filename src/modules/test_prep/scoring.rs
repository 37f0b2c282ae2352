//! Attempt scoring and timing.
//!
//! Objective questions (multiple choice, true/false, fill in the blank) are
//! marked by comparing the normalized answer against every accepted answer.
//! Essays are left for manual review: they are counted as `pending_review`
//! and their points stay out of `max_score`.

use chrono::{DateTime, Duration, Utc};

use crate::modules::test_prep::model::{
    Answers, AttemptStatus, QuestionReview, QuestionType, ScoreSummary, SectionResult,
    SectionWithQuestions, Test, TestType,
};

/// Answers are still accepted this long after `expires_at`.
pub const GRACE_PERIOD_SECONDS: i64 = 60;

/// Trims, lowercases and collapses internal whitespace.
pub fn normalize_answer(answer: &str) -> String {
    answer
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

pub fn round_to_half(value: f64) -> f64 {
    (value * 2.0).round() / 2.0
}

/// IELTS band for a percentage, on the 0 to 9 scale in half steps.
pub fn ielts_band(percentage: f64) -> f64 {
    round_to_half(percentage / 100.0 * 9.0)
}

pub fn percentage(score: i32, max_score: i32) -> f64 {
    if max_score <= 0 {
        return 0.0;
    }
    round_to(f64::from(score) / f64::from(max_score) * 100.0, 2)
}

/// Scores `answers` against the test structure. Returns the summary and a
/// per-question review in section/question order.
pub fn score_attempt(
    test: &Test,
    sections: &[SectionWithQuestions],
    answers: &Answers,
) -> (ScoreSummary, Vec<QuestionReview>) {
    let mut results = Vec::with_capacity(sections.len());
    let mut review = Vec::new();

    for entry in sections {
        let mut result = SectionResult {
            section_id: entry.section.id,
            title: entry.section.title.clone(),
            ..SectionResult::default()
        };

        for question in &entry.questions {
            let given = answers
                .get(&question.id)
                .filter(|a| !a.trim().is_empty())
                .cloned();

            let (is_correct, awarded) = match (question.question_type, &given) {
                (QuestionType::Essay, _) => {
                    result.pending_review += 1;
                    (None, 0)
                }
                (_, None) => {
                    result.max_score += question.points;
                    result.unanswered += 1;
                    (None, 0)
                }
                (_, Some(answer)) => {
                    result.max_score += question.points;
                    let answer = normalize_answer(answer);
                    let correct = question
                        .correct_answers
                        .iter()
                        .any(|accepted| normalize_answer(accepted) == answer);
                    if correct {
                        result.correct += 1;
                        result.score += question.points;
                        (Some(true), question.points)
                    } else {
                        result.incorrect += 1;
                        (Some(false), 0)
                    }
                }
            };

            review.push(QuestionReview {
                question_id: question.id,
                section_id: question.section_id,
                question_type: question.question_type,
                prompt: question.prompt.clone(),
                given_answer: given,
                correct_answers: question.correct_answers.clone(),
                is_correct,
                points: question.points,
                points_awarded: awarded,
                explanation: question.explanation.clone(),
            });
        }

        results.push(result);
    }

    let score = results.iter().map(|r| r.score).sum();
    let max_score = results.iter().map(|r| r.max_score).sum();
    let percentage = percentage(score, max_score);

    let summary = ScoreSummary {
        score,
        max_score,
        percentage,
        passed: percentage >= test.pass_percentage,
        band_score: (test.test_type == TestType::Ielts).then(|| ielts_band(percentage)),
        sections: results,
    };

    (summary, review)
}

/// Whether answers may still be saved or submitted on time.
pub fn within_grace(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now <= expires_at + Duration::seconds(GRACE_PERIOD_SECONDS)
}

/// Final status for an attempt submitted at `now`.
pub fn submission_status(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> AttemptStatus {
    if within_grace(expires_at, now) {
        AttemptStatus::Submitted
    } else {
        AttemptStatus::Expired
    }
}

pub fn remaining_seconds(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (expires_at - now).num_seconds().max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::test_prep::model::{Question, Section};
    use abroadly_models::{QuestionId, SectionId, TestId};
    use sqlx::types::Json;

    fn test_of(test_type: TestType, pass_percentage: f64) -> Test {
        Test {
            id: TestId::new(),
            title: "Practice".into(),
            description: None,
            test_type,
            duration_minutes: 60,
            pass_percentage,
            is_published: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn question(
        section_id: SectionId,
        question_type: QuestionType,
        correct: &[&str],
        points: i32,
    ) -> Question {
        Question {
            id: QuestionId::new(),
            section_id,
            question_type,
            prompt: "?".into(),
            options: Json(vec!["A".into(), "B".into()]),
            correct_answers: correct.iter().map(|s| s.to_string()).collect(),
            points,
            position: 0,
            explanation: Some("because".into()),
            created_at: Utc::now(),
        }
    }

    fn section(title: &str, build: impl FnOnce(SectionId) -> Vec<Question>) -> SectionWithQuestions {
        let id = SectionId::new();
        SectionWithQuestions {
            section: Section {
                id,
                test_id: TestId::new(),
                title: title.into(),
                instructions: None,
                position: 0,
                created_at: Utc::now(),
            },
            questions: build(id),
        }
    }

    #[test]
    fn test_normalize_answer() {
        assert_eq!(normalize_answer("  New   York\tCity "), "new york city");
        assert_eq!(normalize_answer(""), "");
    }

    #[test]
    fn test_rounding_helpers() {
        assert_eq!(round_to_half(6.74), 6.5);
        assert_eq!(round_to_half(6.75), 7.0);
        assert_eq!(ielts_band(100.0), 9.0);
        assert_eq!(ielts_band(50.0), 4.5);
        assert_eq!(percentage(1, 3), 33.33);
        assert_eq!(percentage(0, 0), 0.0);
    }

    #[test]
    fn test_score_mixed_section() {
        let reading = section("Reading", |id| {
            vec![
                question(id, QuestionType::MultipleChoice, &["B"], 2),
                question(id, QuestionType::TrueFalse, &["true"], 1),
                question(id, QuestionType::FillBlank, &["Paris", "paris city"], 1),
                question(id, QuestionType::Essay, &[], 5),
            ]
        });
        let q = &reading.questions;

        let mut answers = Answers::new();
        answers.insert(q[0].id, "b".into());
        answers.insert(q[1].id, "False".into());
        answers.insert(q[2].id, "  PARIS  ".into());
        answers.insert(q[3].id, "An essay".into());

        let (summary, review) =
            score_attempt(&test_of(TestType::Toefl, 50.0), &[reading], &answers);

        assert_eq!(summary.score, 3);
        assert_eq!(summary.max_score, 4);
        assert_eq!(summary.percentage, 75.0);
        assert!(summary.passed);
        assert_eq!(summary.band_score, None);

        let s = &summary.sections[0];
        assert_eq!((s.correct, s.incorrect, s.unanswered, s.pending_review), (2, 1, 0, 1));

        assert_eq!(review.len(), 4);
        assert_eq!(review[1].is_correct, Some(false));
        assert_eq!(review[3].is_correct, None);
        assert_eq!(review[0].points_awarded, 2);
    }

    #[test]
    fn test_blank_answers_are_unanswered() {
        let listening = section("Listening", |id| {
            vec![
                question(id, QuestionType::FillBlank, &["x"], 1),
                question(id, QuestionType::FillBlank, &["y"], 1),
            ]
        });
        let mut answers = Answers::new();
        answers.insert(listening.questions[0].id, "   ".into());

        let (summary, _) = score_attempt(&test_of(TestType::Ielts, 60.0), &[listening], &answers);

        assert_eq!(summary.sections[0].unanswered, 2);
        assert_eq!(summary.percentage, 0.0);
        assert!(!summary.passed);
        assert_eq!(summary.band_score, Some(0.0));
    }

    #[test]
    fn test_essay_only_test_has_zero_percentage() {
        let writing = section("Writing", |id| vec![question(id, QuestionType::Essay, &[], 10)]);
        let (summary, _) =
            score_attempt(&test_of(TestType::Gre, 50.0), &[writing], &Answers::new());
        assert_eq!(summary.max_score, 0);
        assert_eq!(summary.percentage, 0.0);
        assert_eq!(summary.sections[0].pending_review, 1);
    }

    #[test]
    fn test_ielts_band_from_sections() {
        let s = section("Reading", |id| {
            (0..4)
                .map(|_| question(id, QuestionType::TrueFalse, &["true"], 1))
                .collect()
        });
        let mut answers = Answers::new();
        for q in &s.questions[..3] {
            answers.insert(q.id, "true".into());
        }
        let (summary, _) = score_attempt(&test_of(TestType::Ielts, 50.0), &[s], &answers);
        assert_eq!(summary.percentage, 75.0);
        // 0.75 * 9 = 6.75, rounds up to the next half band
        assert_eq!(summary.band_score, Some(7.0));
    }

    #[test]
    fn test_grace_window() {
        let expires = Utc::now();
        assert!(within_grace(expires, expires + Duration::seconds(60)));
        assert!(!within_grace(expires, expires + Duration::seconds(61)));
        assert_eq!(
            submission_status(expires, expires + Duration::seconds(30)),
            AttemptStatus::Submitted
        );
        assert_eq!(
            submission_status(expires, expires + Duration::minutes(5)),
            AttemptStatus::Expired
        );
    }

    #[test]
    fn test_remaining_seconds_never_negative() {
        let now = Utc::now();
        assert_eq!(remaining_seconds(now - Duration::seconds(10), now), 0);
        assert_eq!(remaining_seconds(now + Duration::seconds(90), now), 90);
    }
}
