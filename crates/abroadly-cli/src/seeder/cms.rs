//! CMS page seeding.

use abroadly_models::PageId;
use fake::Fake;
use fake::faker::lorem::en::{Paragraphs, Sentence};
use sqlx::PgPool;
use std::time::Instant;

use super::models::{PageSeed, SEED_SLUG_PREFIX};
use crate::admin::CliResult;

const TITLES: &[&str] = &[
    "About Us",
    "Study in the UK",
    "Study in Canada",
    "Scholarships Guide",
    "Visa Checklist",
    "Frequently Asked Questions",
];

pub fn generate_pages(count: usize) -> Vec<PageSeed> {
    (0..count)
        .map(|idx| {
            let title = TITLES[idx % TITLES.len()];
            let base = title.to_lowercase().replace(' ', "-");
            let slug = if idx < TITLES.len() {
                format!("{SEED_SLUG_PREFIX}{base}")
            } else {
                format!("{SEED_SLUG_PREFIX}{base}-{idx}")
            };
            let paragraphs: Vec<String> = Paragraphs(3..6).fake();

            PageSeed {
                slug,
                title: title.to_string(),
                content: paragraphs.join("\n\n"),
                excerpt: Sentence(8..14).fake(),
            }
        })
        .collect()
}

pub async fn seed_pages(db: &PgPool, count: usize) -> CliResult<Vec<PageId>> {
    let start_time = Instant::now();
    println!("📄 Seeding {} CMS pages...", count);

    let mut ids = Vec::with_capacity(count);
    for page in generate_pages(count) {
        let id = sqlx::query_scalar::<_, PageId>(
            "INSERT INTO cms_pages (slug, title, content, excerpt, is_published, published_at)
             VALUES ($1, $2, $3, $4, TRUE, NOW())
             ON CONFLICT (slug) DO NOTHING
             RETURNING id",
        )
        .bind(&page.slug)
        .bind(&page.title)
        .bind(&page.content)
        .bind(&page.excerpt)
        .fetch_optional(db)
        .await?;
        ids.extend(id);
    }

    println!("   ✓ Inserted {} pages in {:?}", ids.len(), start_time.elapsed());
    Ok(ids)
}

pub async fn clear_pages(db: &PgPool) -> CliResult<u64> {
    let deleted = sqlx::query("DELETE FROM cms_pages WHERE slug LIKE $1")
        .bind(format!("{SEED_SLUG_PREFIX}%"))
        .execute(db)
        .await?
        .rows_affected();
    Ok(deleted)
}
