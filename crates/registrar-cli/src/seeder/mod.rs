//! Database seeding for development and load testing.
//!
//! `seed_all` builds a complete catalog for one term:
//!
//! 1. Mon-Fri timeslots at 09:00 and 10:00, and a handful of rooms
//! 2. courses spread over departments, with 200-level and above courses
//!    requiring the level below
//! 3. sections for the configured term, rotating through the timeslots
//! 4. students and instructors with fake names
//! 5. a graded previous-term history in the 100-level courses, so some
//!    students are eligible for 200-level courses and some are not

mod catalog;
mod models;
mod users;

pub use catalog::{default_timeslots, generate_courses, generate_rooms, generate_sections};
pub use models::{CourseSeed, SEED_EMAIL_DOMAIN, SectionSeed, SeedConfig, UserSeed};
pub use users::{generate_history, generate_users};

use sqlx::PgPool;
use std::time::Instant;

const HISTORY_TERM: &str = "2025-SPRING";

pub async fn seed_all(db: &PgPool, config: &SeedConfig) -> Result<(), Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!("🌱 Seeding {} with {:?}", config.term, config);

    let timeslots = catalog::insert_timeslots(db, &default_timeslots()).await?;
    let rooms = catalog::insert_rooms(db, &generate_rooms(8, 60)).await?;

    let courses = generate_courses(config.courses);
    catalog::insert_courses(db, &courses).await?;

    let sections = generate_sections(&courses, config, &timeslots, &rooms);
    catalog::insert_sections_batch(db, &config.term, &sections).await?;

    let students = users::seed_users(db, config.students, "student").await?;
    users::seed_users(db, config.instructors, "instructor").await?;

    // One roomy past section per introductory course holds the graded history.
    let intro: Vec<CourseSeed> = courses
        .into_iter()
        .filter(|c| c.prerequisites.is_empty())
        .collect();
    let history_config = SeedConfig {
        sections_per_course: 1,
        section_capacity: config.students.max(1) as i32,
        ..config.clone()
    };
    let past_sections = generate_sections(&intro, &history_config, &timeslots, &rooms);
    let past_ids = catalog::insert_sections_batch(db, HISTORY_TERM, &past_sections).await?;
    users::seed_history(db, HISTORY_TERM, &students, &past_ids).await?;

    println!("\n✅ Seeding complete in {:?}", start_time.elapsed());
    Ok(())
}

/// Removes everything `seed_all` creates. Catalog tables are emptied; only
/// seeded users are deleted.
pub async fn clear_all(db: &PgPool) -> Result<(), Box<dyn std::error::Error>> {
    println!("🧹 Clearing seeded data...");

    let mut tx = db.begin().await?;
    sqlx::query("TRUNCATE payments, enrollments, sections, prerequisites, courses, timeslots, rooms RESTART IDENTITY CASCADE")
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    let users = users::clear_users(db).await?;
    println!("   ✓ Cleared catalog and {} seeded users", users);
    Ok(())
}
