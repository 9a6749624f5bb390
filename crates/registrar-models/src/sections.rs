//! Section, timeslot and capacity models.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::courses::CourseCode;
use crate::ids::{RoomId, SectionId, TimeslotId};

/// A section row as read under its row lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Section {
    pub id: SectionId,
    pub course_code: CourseCode,
    pub term: String,
    pub section_number: i32,
    pub capacity: i32,
    pub enrolled: i32,
    pub timeslot_id: TimeslotId,
    pub room_id: RoomId,
}

impl Section {
    pub fn is_full(&self) -> bool {
        self.enrolled >= self.capacity
    }

    pub fn seats_remaining(&self) -> i32 {
        (self.capacity - self.enrolled).max(0)
    }
}

/// A weekly meeting slot shared by sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Timeslot {
    pub id: TimeslotId,
    /// Three-letter day (`Mon` .. `Sun`)
    pub day: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// Read-only capacity view of a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SectionAvailability {
    pub section_id: SectionId,
    pub course_code: CourseCode,
    pub term: String,
    pub section_number: i32,
    pub capacity: i32,
    pub enrolled: i32,
    pub seats_remaining: i32,
}

impl From<&Section> for SectionAvailability {
    fn from(section: &Section) -> Self {
        Self {
            section_id: section.id,
            course_code: section.course_code.clone(),
            term: section.term.clone(),
            section_number: section.section_number,
            capacity: section.capacity,
            enrolled: section.enrolled,
            seats_remaining: section.seats_remaining(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(capacity: i32, enrolled: i32) -> Section {
        Section {
            id: SectionId::new(1),
            course_code: CourseCode::new("CS101"),
            term: "Fall 2025".to_string(),
            section_number: 1,
            capacity,
            enrolled,
            timeslot_id: TimeslotId::new(1),
            room_id: RoomId::new(1),
        }
    }

    #[test]
    fn test_is_full() {
        assert!(!section(30, 29).is_full());
        assert!(section(30, 30).is_full());
        assert!(section(0, 0).is_full());
    }

    #[test]
    fn test_availability_from_section() {
        let view = SectionAvailability::from(&section(30, 12));
        assert_eq!(view.seats_remaining, 18);
        assert_eq!(view.course_code.as_str(), "CS101");
    }
}
