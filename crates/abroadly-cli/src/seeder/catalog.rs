//! Course catalog seeding.

use abroadly_models::CourseId;
use abroadly_models::courses::CourseLevel;
use fake::Fake;
use fake::faker::lorem::en::Paragraph;
use rayon::prelude::*;
use sqlx::PgPool;
use std::time::Instant;

use super::models::{CourseSeed, SEED_SLUG_PREFIX};
use crate::admin::CliResult;

const SUBJECTS: &[&str] = &[
    "Computer Science",
    "Data Science",
    "Business Analytics",
    "Mechanical Engineering",
    "Public Health",
    "Finance",
    "International Relations",
    "Architecture",
];

const DESTINATIONS: &[(&str, &str)] = &[
    ("UK", "University of Leeds"),
    ("USA", "Arizona State University"),
    ("Canada", "University of Toronto"),
    ("Australia", "Monash University"),
    ("Germany", "TU Munich"),
    ("Ireland", "University College Dublin"),
];

const LEVELS: &[(CourseLevel, &str, i32)] = &[
    (CourseLevel::Foundation, "Foundation in", 36),
    (CourseLevel::Undergraduate, "BSc", 156),
    (CourseLevel::Postgraduate, "MSc", 52),
    (CourseLevel::Diploma, "Diploma in", 40),
];

pub fn generate_courses(count: usize) -> Vec<CourseSeed> {
    (0..count)
        .into_par_iter()
        .map(|idx| {
            let subject = SUBJECTS[idx % SUBJECTS.len()];
            let (country, university) = DESTINATIONS[(0..DESTINATIONS.len()).fake::<usize>()];
            let (level, prefix, weeks) = LEVELS[(0..LEVELS.len()).fake::<usize>()];
            let title = format!("{prefix} {subject}");
            let slug = format!(
                "{SEED_SLUG_PREFIX}{}-{}",
                title.to_lowercase().replace(' ', "-"),
                idx
            );
            // Every fifth course is free
            let fee_cents = if idx % 5 == 0 {
                0
            } else {
                (50..500).fake::<i64>() * 100
            };

            CourseSeed {
                title,
                slug,
                description: Paragraph(3..5).fake(),
                country: country.to_string(),
                university: university.to_string(),
                level,
                duration_weeks: weeks,
                fee_cents,
                intake: "September 2026".to_string(),
            }
        })
        .collect()
}

pub async fn seed_courses(db: &PgPool, count: usize) -> CliResult<Vec<CourseId>> {
    let start_time = Instant::now();
    println!("📚 Seeding {} courses...", count);

    let seeds = generate_courses(count);
    let mut tx = db.begin().await?;
    let mut ids = Vec::with_capacity(seeds.len());

    for seed in &seeds {
        let id = sqlx::query_scalar::<_, CourseId>(
            "INSERT INTO courses
                (title, slug, description, country, university, level, duration_weeks,
                 fee_cents, intake, is_published)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, TRUE)
             RETURNING id",
        )
        .bind(&seed.title)
        .bind(&seed.slug)
        .bind(&seed.description)
        .bind(&seed.country)
        .bind(&seed.university)
        .bind(seed.level)
        .bind(seed.duration_weeks)
        .bind(seed.fee_cents)
        .bind(&seed.intake)
        .fetch_one(&mut *tx)
        .await?;
        ids.push(id);
    }

    tx.commit().await?;
    println!("   ✓ Inserted {} courses in {:?}", ids.len(), start_time.elapsed());

    Ok(ids)
}

/// Deletes seeded courses and any enrollments in them.
pub async fn clear_courses(db: &PgPool) -> CliResult<u64> {
    let pattern = format!("{SEED_SLUG_PREFIX}%");
    let mut tx = db.begin().await?;

    sqlx::query(
        "DELETE FROM enrollments WHERE course_id IN (SELECT id FROM courses WHERE slug LIKE $1)",
    )
    .bind(&pattern)
    .execute(&mut *tx)
    .await?;

    let deleted = sqlx::query("DELETE FROM courses WHERE slug LIKE $1")
        .bind(&pattern)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_courses() {
        let courses = generate_courses(10);
        assert_eq!(courses.len(), 10);
        assert!(courses.iter().all(|c| c.slug.starts_with("seed-")));
        assert_eq!(courses[0].fee_cents, 0);
        assert!(courses[1].fee_cents >= 5_000);

        let mut slugs: Vec<_> = courses.iter().map(|c| c.slug.clone()).collect();
        slugs.dedup();
        assert_eq!(slugs.len(), 10);
    }
}
