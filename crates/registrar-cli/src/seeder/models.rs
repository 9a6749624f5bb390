//! Data models for database seeding configuration.

use chrono::NaiveTime;
use registrar_models::{CourseCode, RoomId, TimeslotId};

/// Domain of every seeded user's email; `clear-seed` removes exactly these users.
pub const SEED_EMAIL_DOMAIN: &str = "seed.registrar.test";

pub struct TimeslotSeed {
    pub day: &'static str,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

pub struct RoomSeed {
    pub name: String,
    pub capacity: i32,
}

pub struct CourseSeed {
    pub code: CourseCode,
    pub title: String,
    pub credits: i32,
    /// Direct prerequisites, always lower-level courses of the same department.
    pub prerequisites: Vec<CourseCode>,
}

pub struct SectionSeed {
    pub course_code: CourseCode,
    pub section_number: i32,
    pub capacity: i32,
    pub timeslot_id: TimeslotId,
    pub room_id: RoomId,
}

pub struct UserSeed {
    pub name: String,
    pub email: String,
    pub role: &'static str,
}

/// Complete configuration for database seeding.
#[derive(Clone, Debug)]
pub struct SeedConfig {
    pub students: usize,
    pub instructors: usize,
    pub courses: usize,
    pub sections_per_course: usize,
    pub section_capacity: i32,
    pub term: String,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            students: 200,
            instructors: 10,
            courses: 20,
            sections_per_course: 2,
            section_capacity: 30,
            term: "2025-FALL".to_string(),
        }
    }
}

impl SeedConfig {
    pub fn new(students: usize) -> Self {
        Self {
            students,
            ..Self::default()
        }
    }

    pub fn with_courses(mut self, courses: usize) -> Self {
        self.courses = courses;
        self
    }

    pub fn with_sections(mut self, sections_per_course: usize, capacity: i32) -> Self {
        self.sections_per_course = sections_per_course;
        self.section_capacity = capacity;
        self
    }

    pub fn with_term(mut self, term: impl Into<String>) -> Self {
        self.term = term.into();
        self
    }

    pub fn total_sections(&self) -> usize {
        self.courses * self.sections_per_course
    }
}
