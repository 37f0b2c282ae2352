//! Consultant profile and availability seeding.

use abroadly_models::{ConsultantId, UserId};
use fake::Fake;
use fake::faker::lorem::en::Paragraph;
use rayon::prelude::*;
use sqlx::PgPool;
use std::time::Instant;

use super::models::ConsultantSeed;
use crate::admin::CliResult;

const COUNTRIES: &[&str] = &["UK", "USA", "Canada", "Australia", "Germany", "Ireland"];
const SPECIALIZATIONS: &[&str] = &[
    "Admissions",
    "Scholarships",
    "Visa guidance",
    "SOP review",
    "Test prep strategy",
];
const LANGUAGES: &[&str] = &["English", "Hindi", "Spanish", "French", "Arabic"];

/// Picks `n` consecutive entries starting at a random offset.
fn pick(pool: &[&str], n: usize) -> Vec<String> {
    let start: usize = (0..pool.len()).fake();
    (0..n.min(pool.len()))
        .map(|i| pool[(start + i) % pool.len()].to_string())
        .collect()
}

pub fn generate_consultants(user_ids: &[UserId]) -> Vec<ConsultantSeed> {
    user_ids
        .par_iter()
        .map(|&user_id| {
            let countries = pick(COUNTRIES, (1..3).fake());
            ConsultantSeed {
                user_id,
                headline: format!("{} admissions consultant", countries[0]),
                bio: Paragraph(2..4).fake(),
                specializations: pick(SPECIALIZATIONS, (1..4).fake()),
                countries,
                languages: pick(LANGUAGES, (1..3).fake()),
                fee_cents: [0_i64, 2_500, 5_000][(0..3).fake::<usize>()],
                slot_minutes: [30, 45, 60][(0..3).fake::<usize>()],
            }
        })
        .collect()
}

/// Creates a profile for each user plus weekday availability 09:00 to 17:00.
pub async fn seed_consultants(db: &PgPool, user_ids: &[UserId]) -> CliResult<Vec<ConsultantId>> {
    let start_time = Instant::now();
    println!("🧭 Seeding {} consultant profiles...", user_ids.len());

    let seeds = generate_consultants(user_ids);
    let mut tx = db.begin().await?;
    let mut ids = Vec::with_capacity(seeds.len());

    for seed in &seeds {
        let id = sqlx::query_scalar::<_, ConsultantId>(
            "INSERT INTO consultants
                (user_id, headline, bio, specializations, countries, languages, fee_cents, slot_minutes)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING id",
        )
        .bind(seed.user_id)
        .bind(&seed.headline)
        .bind(&seed.bio)
        .bind(&seed.specializations)
        .bind(&seed.countries)
        .bind(&seed.languages)
        .bind(seed.fee_cents)
        .bind(seed.slot_minutes)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO availability_rules (consultant_id, weekday, start_time, end_time)
             SELECT $1, d, '09:00', '17:00' FROM generate_series(1, 5) AS d",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        ids.push(id);
    }

    tx.commit().await?;
    println!("   ✓ Inserted {} consultants in {:?}", ids.len(), start_time.elapsed());

    Ok(ids)
}
