//! Practice test seeding.

use abroadly_models::test_prep::{QuestionType, TestType};
use abroadly_models::{SectionId, TestId};
use fake::Fake;
use fake::faker::lorem::en::{Sentence, Word};
use sqlx::PgPool;
use sqlx::types::Json;
use std::time::Instant;

use super::models::{QuestionSeed, SEED_TEST_MARKER, SectionSeed, TestSeed};
use crate::admin::CliResult;

const TEST_TYPES: &[TestType] = &[
    TestType::Ielts,
    TestType::Toefl,
    TestType::Pte,
    TestType::Gre,
    TestType::Duolingo,
];

fn generate_question(idx: usize) -> QuestionSeed {
    let prompt: String = Sentence(6..12).fake();
    match idx % 4 {
        0 | 1 => {
            let options: Vec<String> = (0..4)
                .map(|i| format!("{} {}", Word().fake::<String>(), i + 1))
                .collect();
            let answer = options[(0..options.len()).fake::<usize>()].clone();
            QuestionSeed {
                question_type: QuestionType::MultipleChoice,
                prompt,
                options,
                correct_answers: vec![answer],
            }
        }
        2 => QuestionSeed {
            question_type: QuestionType::TrueFalse,
            prompt,
            options: vec!["true".into(), "false".into()],
            correct_answers: vec![if idx % 8 == 2 { "true" } else { "false" }.into()],
        },
        _ => QuestionSeed {
            question_type: QuestionType::FillBlank,
            prompt,
            options: Vec::new(),
            correct_answers: vec![Word().fake()],
        },
    }
}

pub fn generate_tests(count: usize) -> Vec<TestSeed> {
    (0..count)
        .map(|idx| {
            let test_type = TEST_TYPES[idx % TEST_TYPES.len()];
            let sections = ["Reading", "Listening"]
                .iter()
                .map(|title| SectionSeed {
                    title: (*title).to_string(),
                    questions: (0..8).map(generate_question).collect(),
                })
                .collect();

            TestSeed {
                title: format!("{} Practice Test {}", test_type.as_str().to_uppercase(), idx + 1),
                test_type,
                duration_minutes: 30,
                sections,
            }
        })
        .collect()
}

pub async fn seed_tests(db: &PgPool, count: usize) -> CliResult<Vec<TestId>> {
    let start_time = Instant::now();
    println!("📝 Seeding {} practice tests...", count);

    let seeds = generate_tests(count);
    let mut tx = db.begin().await?;
    let mut ids = Vec::with_capacity(seeds.len());

    for test in &seeds {
        let test_id = sqlx::query_scalar::<_, TestId>(
            "INSERT INTO tests (title, description, test_type, duration_minutes, is_published)
             VALUES ($1, $2, $3, $4, TRUE)
             RETURNING id",
        )
        .bind(&test.title)
        .bind(format!("{SEED_TEST_MARKER} Timed practice test"))
        .bind(test.test_type)
        .bind(test.duration_minutes)
        .fetch_one(&mut *tx)
        .await?;

        for (s_pos, section) in test.sections.iter().enumerate() {
            let section_id = sqlx::query_scalar::<_, SectionId>(
                "INSERT INTO test_sections (test_id, title, position)
                 VALUES ($1, $2, $3)
                 RETURNING id",
            )
            .bind(test_id)
            .bind(&section.title)
            .bind(s_pos as i32)
            .fetch_one(&mut *tx)
            .await?;

            for (q_pos, q) in section.questions.iter().enumerate() {
                sqlx::query(
                    "INSERT INTO test_questions
                        (section_id, question_type, prompt, options, correct_answers, points, position)
                     VALUES ($1, $2, $3, $4, $5, 1, $6)",
                )
                .bind(section_id)
                .bind(q.question_type)
                .bind(&q.prompt)
                .bind(Json(&q.options))
                .bind(&q.correct_answers)
                .bind(q_pos as i32)
                .execute(&mut *tx)
                .await?;
            }
        }

        ids.push(test_id);
    }

    tx.commit().await?;
    println!("   ✓ Inserted {} tests in {:?}", ids.len(), start_time.elapsed());

    Ok(ids)
}

pub async fn clear_tests(db: &PgPool) -> CliResult<u64> {
    let deleted = sqlx::query("DELETE FROM tests WHERE description LIKE $1")
        .bind(format!("{SEED_TEST_MARKER}%"))
        .execute(db)
        .await?
        .rows_affected();
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use abroadly_models::test_prep::check_question_shape;

    #[test]
    fn test_generated_questions_have_valid_shape() {
        for test in generate_tests(3) {
            for section in &test.sections {
                for q in &section.questions {
                    assert!(
                        check_question_shape(q.question_type, &q.options, &q.correct_answers)
                            .is_ok(),
                        "{:?} question failed shape check",
                        q.question_type
                    );
                }
            }
        }
    }

    #[test]
    fn test_titles_name_the_test_type() {
        let tests = generate_tests(2);
        assert_eq!(tests[0].title, "IELTS Practice Test 1");
        assert_eq!(tests[1].test_type, TestType::Toefl);
    }
}
