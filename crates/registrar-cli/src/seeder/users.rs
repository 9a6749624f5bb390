//! User seeding functionality.
//!
//! Provides functions for generating and inserting fake students and
//! instructors, and for giving students a graded course history so that
//! prerequisite checks have something to find.

use fake::Fake;
use fake::faker::name::en::*;
use rayon::prelude::*;
use registrar_models::{SectionId, UserId};
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Instant;

use super::models::{SEED_EMAIL_DOMAIN, UserSeed};

const GRADES: &[&str] = &["A", "B", "C", "D", "F"];

pub fn generate_users(count: usize, role: &'static str) -> Vec<UserSeed> {
    (0..count)
        .into_par_iter()
        .map(|idx| {
            let first_name: String = FirstName().fake();
            let last_name: String = LastName().fake();

            let email = format!(
                "{}.{}+{}{}@{}",
                first_name.to_lowercase(),
                last_name.to_lowercase(),
                role,
                idx,
                SEED_EMAIL_DOMAIN
            );

            UserSeed {
                name: format!("{first_name} {last_name}"),
                email,
                role,
            }
        })
        .collect()
}

pub async fn seed_users(
    db: &PgPool,
    count: usize,
    role: &'static str,
) -> Result<Vec<UserId>, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!("👥 Seeding {} {} users...", count, role);

    let users = generate_users(count, role);
    let ids = insert_users_batch(db, &users).await?;

    println!(
        "   ✓ Inserted {} {} users in {:?}",
        ids.len(),
        role,
        start_time.elapsed()
    );
    Ok(ids)
}

pub async fn insert_users_batch(
    db: &PgPool,
    users: &[UserSeed],
) -> Result<Vec<UserId>, Box<dyn std::error::Error>> {
    let mut tx = db.begin().await?;

    // 3 params per user
    const BATCH_SIZE: usize = 2000;

    let mut ids = Vec::with_capacity(users.len());
    for chunk in users.chunks(BATCH_SIZE) {
        ids.extend(insert_users_chunk(&mut tx, chunk).await?);
    }

    tx.commit().await?;
    Ok(ids)
}

async fn insert_users_chunk(
    tx: &mut Transaction<'_, Postgres>,
    users: &[UserSeed],
) -> Result<Vec<UserId>, Box<dyn std::error::Error>> {
    if users.is_empty() {
        return Ok(Vec::new());
    }

    let mut query = String::from("INSERT INTO users (name, email, role) VALUES ");
    for i in 0..users.len() {
        if i > 0 {
            query.push_str(", ");
        }
        let p = i * 3;
        query.push_str(&format!("(${}, ${}, ${})", p + 1, p + 2, p + 3));
    }
    query.push_str(" ON CONFLICT (email) DO NOTHING RETURNING id");

    let mut q = sqlx::query_scalar(&query);
    for user in users {
        q = q.bind(&user.name).bind(&user.email).bind(user.role);
    }

    let ids: Vec<UserId> = q.fetch_all(&mut **tx).await?;
    Ok(ids)
}

/// Picks a grade for each (student, section) pair; roughly every other
/// student gets a history in each section.
pub fn generate_history(
    students: &[UserId],
    sections: &[SectionId],
) -> Vec<(UserId, SectionId, &'static str)> {
    students
        .par_iter()
        .enumerate()
        .flat_map_iter(|(idx, &student)| {
            sections
                .iter()
                .enumerate()
                .filter(move |(section_idx, _)| (idx + section_idx) % 2 == 0)
                .map(move |(_, &section)| {
                    let grade = GRADES[(0..GRADES.len()).fake::<usize>()];
                    (student, section, grade)
                })
        })
        .collect()
}

/// Inserts graded enrollments and brings the sections' counters in line.
pub async fn seed_history(
    db: &PgPool,
    term: &str,
    students: &[UserId],
    sections: &[SectionId],
) -> Result<usize, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    let history = generate_history(students, sections);
    println!("📝 Seeding {} graded enrollments for {}...", history.len(), term);

    let mut tx = db.begin().await?;

    for (student, section, grade) in &history {
        sqlx::query(
            r#"
            INSERT INTO enrollments (student_id, section_id, status, grade)
            VALUES ($1, $2, 'enrolled', $3)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(student)
        .bind(section)
        .bind(grade)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query(
        r#"
        UPDATE sections s
        SET enrolled = (
            SELECT COUNT(*) FROM enrollments e
            WHERE e.section_id = s.id AND e.status = 'enrolled'
        )
        WHERE s.term = $1
        "#,
    )
    .bind(term)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    println!(
        "   ✓ Inserted {} graded enrollments in {:?}",
        history.len(),
        start_time.elapsed()
    );
    Ok(history.len())
}

/// Removes seeded users; their enrollments and payments cascade.
pub async fn clear_users(db: &PgPool) -> Result<u64, Box<dyn std::error::Error>> {
    let result = sqlx::query("DELETE FROM users WHERE email LIKE '%@' || $1")
        .bind(SEED_EMAIL_DOMAIN)
        .execute(db)
        .await?;
    Ok(result.rows_affected())
}
