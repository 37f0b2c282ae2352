//! Seed rows and seeding configuration.

use abroadly_models::courses::CourseLevel;
use abroadly_models::test_prep::{QuestionType, TestType};
use abroadly_models::{UserId, UserRole};

/// Password shared by every seeded account.
pub const SEED_PASSWORD: &str = "password123";

/// Domain reserved for seeded accounts. `clear-seed` deletes by it.
pub const SEED_EMAIL_DOMAIN: &str = "example.com";

/// Slug prefix for seeded courses and pages.
pub const SEED_SLUG_PREFIX: &str = "seed-";

/// Marker stored in seeded tests' descriptions.
pub const SEED_TEST_MARKER: &str = "[seed]";

pub struct UserSeed {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
}

pub struct ConsultantSeed {
    pub user_id: UserId,
    pub headline: String,
    pub bio: String,
    pub specializations: Vec<String>,
    pub countries: Vec<String>,
    pub languages: Vec<String>,
    pub fee_cents: i64,
    pub slot_minutes: i32,
}

pub struct CourseSeed {
    pub title: String,
    pub slug: String,
    pub description: String,
    pub country: String,
    pub university: String,
    pub level: CourseLevel,
    pub duration_weeks: i32,
    pub fee_cents: i64,
    pub intake: String,
}

pub struct QuestionSeed {
    pub question_type: QuestionType,
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_answers: Vec<String>,
}

pub struct SectionSeed {
    pub title: String,
    pub questions: Vec<QuestionSeed>,
}

pub struct TestSeed {
    pub title: String,
    pub test_type: TestType,
    pub duration_minutes: i32,
    pub sections: Vec<SectionSeed>,
}

pub struct PageSeed {
    pub slug: String,
    pub title: String,
    pub content: String,
    pub excerpt: String,
}

/// How much fake data `seed` creates.
#[derive(Clone, Debug)]
pub struct SeedConfig {
    pub consultants: usize,
    pub students: usize,
    pub courses: usize,
    pub tests: usize,
    pub pages: usize,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            consultants: 5,
            students: 50,
            courses: 20,
            tests: 4,
            pages: 5,
        }
    }
}

impl SeedConfig {
    pub fn total_users(&self) -> usize {
        self.consultants + self.students
    }
}
