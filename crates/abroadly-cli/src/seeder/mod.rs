//! Fake data seeding for local development.
//!
//! Seeded rows are recognisable (`@example.com` accounts, `seed-` slugs and
//! tagged test descriptions), so `clear-seed` removes them without touching
//! real data.

pub mod catalog;
pub mod cms;
pub mod consultants;
pub mod models;
pub mod test_prep;
pub mod users;

use abroadly_core::hash_password;
use abroadly_models::UserRole;
use sqlx::PgPool;
use std::time::Instant;

pub use models::SeedConfig;

use crate::admin::CliResult;

pub async fn seed_all(db: &PgPool, config: SeedConfig) -> CliResult<()> {
    let start_time = Instant::now();
    println!("🌱 Seeding database ({} users)...\n", config.total_users());

    let password_hash = hash_password(models::SEED_PASSWORD)
        .map_err(|e| format!("Failed to hash password: {}", e.error))?;

    let consultant_users =
        users::seed_users(db, UserRole::Consultant, config.consultants, &password_hash).await?;
    consultants::seed_consultants(db, &consultant_users).await?;
    users::seed_users(db, UserRole::Student, config.students, &password_hash).await?;
    catalog::seed_courses(db, config.courses).await?;
    test_prep::seed_tests(db, config.tests).await?;
    cms::seed_pages(db, config.pages).await?;

    println!("\n✅ Seeding finished in {:?}", start_time.elapsed());
    println!("   Seeded accounts use the password '{}'", models::SEED_PASSWORD);

    Ok(())
}

pub async fn clear_all(db: &PgPool) -> CliResult<()> {
    let start_time = Instant::now();

    // Users first: their enrollments, attempts and bookings cascade
    users::clear_users(db).await?;
    let courses = catalog::clear_courses(db).await?;
    let tests = test_prep::clear_tests(db).await?;
    let pages = cms::clear_pages(db).await?;

    println!(
        "✅ Cleared seed data ({} courses, {} tests, {} pages) in {:?}",
        courses,
        tests,
        pages,
        start_time.elapsed()
    );

    Ok(())
}
