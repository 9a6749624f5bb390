//! Catalog seeding: timeslots, rooms, courses with prerequisites, sections.

use chrono::NaiveTime;
use fake::Fake;
use fake::faker::company::en::CatchPhrase;
use rayon::prelude::*;
use registrar_models::{CourseCode, RoomId, SectionId, TimeslotId};
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Instant;

use super::models::{CourseSeed, RoomSeed, SectionSeed, SeedConfig, TimeslotSeed};

const DEPARTMENTS: &[(&str, &str)] = &[
    ("CS", "Computer Science"),
    ("MATH", "Mathematics"),
    ("PHYS", "Physics"),
    ("HIST", "History"),
];

const WEEKDAYS: &[&str] = &["Mon", "Tue", "Wed", "Thu", "Fri"];

/// Mon-Fri, one slot at 09:00 and one at 10:00, each an hour long.
pub fn default_timeslots() -> Vec<TimeslotSeed> {
    WEEKDAYS
        .iter()
        .flat_map(|&day| {
            [9, 10].into_iter().filter_map(move |hour| {
                Some(TimeslotSeed {
                    day,
                    start_time: NaiveTime::from_hms_opt(hour, 0, 0)?,
                    end_time: NaiveTime::from_hms_opt(hour + 1, 0, 0)?,
                })
            })
        })
        .collect()
}

pub fn generate_rooms(count: usize, capacity: i32) -> Vec<RoomSeed> {
    (0..count)
        .map(|i| RoomSeed {
            name: format!("Seed Hall {}", 100 + i),
            capacity,
        })
        .collect()
}

fn course_code(department: &str, level: usize) -> CourseCode {
    CourseCode::new(format!("{}{}", department, 100 * (level + 1) + 1))
}

/// Courses are spread round-robin over the departments; every course above
/// the 100 level requires the previous level of its department.
pub fn generate_courses(count: usize) -> Vec<CourseSeed> {
    (0..count)
        .into_par_iter()
        .map(|i| {
            let (department, department_name) = DEPARTMENTS[i % DEPARTMENTS.len()];
            let level = i / DEPARTMENTS.len();
            let catch_phrase: String = CatchPhrase().fake();

            let prerequisites = if level == 0 {
                Vec::new()
            } else {
                vec![course_code(department, level - 1)]
            };

            CourseSeed {
                code: course_code(department, level),
                title: format!("{department_name}: {catch_phrase}"),
                credits: 3,
                prerequisites,
            }
        })
        .collect()
}

pub fn generate_sections(
    courses: &[CourseSeed],
    config: &SeedConfig,
    timeslots: &[TimeslotId],
    rooms: &[RoomId],
) -> Vec<SectionSeed> {
    if timeslots.is_empty() || rooms.is_empty() {
        return Vec::new();
    }

    courses
        .iter()
        .enumerate()
        .flat_map(|(course_idx, course)| {
            (0..config.sections_per_course).map(move |n| {
                let slot = course_idx * config.sections_per_course + n;
                SectionSeed {
                    course_code: course.code.clone(),
                    section_number: n as i32 + 1,
                    capacity: config.section_capacity,
                    timeslot_id: timeslots[slot % timeslots.len()],
                    room_id: rooms[slot % rooms.len()],
                }
            })
        })
        .collect()
}

pub async fn insert_timeslots(
    db: &PgPool,
    seeds: &[TimeslotSeed],
) -> Result<Vec<TimeslotId>, Box<dyn std::error::Error>> {
    let mut ids = Vec::with_capacity(seeds.len());
    for seed in seeds {
        let id: TimeslotId = sqlx::query_scalar(
            r#"
            INSERT INTO timeslots (day, start_time, end_time)
            VALUES ($1, $2, $3)
            ON CONFLICT (day, start_time, end_time) DO UPDATE SET day = EXCLUDED.day
            RETURNING id
            "#,
        )
        .bind(seed.day)
        .bind(seed.start_time)
        .bind(seed.end_time)
        .fetch_one(db)
        .await?;
        ids.push(id);
    }
    Ok(ids)
}

pub async fn insert_rooms(
    db: &PgPool,
    seeds: &[RoomSeed],
) -> Result<Vec<RoomId>, Box<dyn std::error::Error>> {
    let mut ids = Vec::with_capacity(seeds.len());
    for seed in seeds {
        let id: RoomId = sqlx::query_scalar(
            r#"
            INSERT INTO rooms (name, capacity)
            VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET capacity = EXCLUDED.capacity
            RETURNING id
            "#,
        )
        .bind(&seed.name)
        .bind(seed.capacity)
        .fetch_one(db)
        .await?;
        ids.push(id);
    }
    Ok(ids)
}

/// Inserts courses first, then their prerequisite edges.
pub async fn insert_courses(
    db: &PgPool,
    courses: &[CourseSeed],
) -> Result<(), Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!("📚 Seeding {} courses...", courses.len());

    let mut tx = db.begin().await?;

    for course in courses {
        sqlx::query(
            "INSERT INTO courses (code, title, credits) VALUES ($1, $2, $3) ON CONFLICT (code) DO NOTHING",
        )
        .bind(&course.code)
        .bind(&course.title)
        .bind(course.credits)
        .execute(&mut *tx)
        .await?;
    }

    let mut edges = 0;
    for course in courses {
        for prerequisite in &course.prerequisites {
            sqlx::query(
                r#"
                INSERT INTO prerequisites (course_code, prerequisite_code)
                VALUES ($1, $2)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(&course.code)
            .bind(prerequisite)
            .execute(&mut *tx)
            .await?;
            edges += 1;
        }
    }

    tx.commit().await?;
    println!(
        "   ✓ Inserted {} courses and {} prerequisites in {:?}",
        courses.len(),
        edges,
        start_time.elapsed()
    );
    Ok(())
}

pub async fn insert_sections_batch(
    db: &PgPool,
    term: &str,
    sections: &[SectionSeed],
) -> Result<Vec<SectionId>, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!("🏫 Seeding {} sections for {}...", sections.len(), term);

    let mut tx = db.begin().await?;

    // 6 params per section
    const BATCH_SIZE: usize = 1000;

    let mut ids = Vec::with_capacity(sections.len());
    for chunk in sections.chunks(BATCH_SIZE) {
        ids.extend(insert_sections_chunk(&mut tx, term, chunk).await?);
    }

    tx.commit().await?;
    println!(
        "   ✓ Inserted {} sections in {:?}",
        ids.len(),
        start_time.elapsed()
    );
    Ok(ids)
}

async fn insert_sections_chunk(
    tx: &mut Transaction<'_, Postgres>,
    term: &str,
    sections: &[SectionSeed],
) -> Result<Vec<SectionId>, Box<dyn std::error::Error>> {
    if sections.is_empty() {
        return Ok(Vec::new());
    }

    let mut query = String::from(
        "INSERT INTO sections (course_code, term, section_number, capacity, timeslot_id, room_id) VALUES ",
    );

    for i in 0..sections.len() {
        if i > 0 {
            query.push_str(", ");
        }
        let p = i * 6;
        query.push_str(&format!(
            "(${}, ${}, ${}, ${}, ${}, ${})",
            p + 1,
            p + 2,
            p + 3,
            p + 4,
            p + 5,
            p + 6
        ));
    }

    query.push_str(" ON CONFLICT (course_code, term, section_number) DO NOTHING RETURNING id");

    let mut q = sqlx::query_scalar(&query);
    for section in sections {
        q = q
            .bind(&section.course_code)
            .bind(term)
            .bind(section.section_number)
            .bind(section.capacity)
            .bind(section.timeslot_id)
            .bind(section.room_id);
    }

    let ids: Vec<SectionId> = q.fetch_all(&mut **tx).await?;
    Ok(ids)
}
