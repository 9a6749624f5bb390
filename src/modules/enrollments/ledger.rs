//! Seat accounting for sections.
//!
//! `sections.enrolled` is only ever changed here, and only through a
//! [`LockedSection`], so every change happens inside the transaction that
//! holds the section's row lock. Incrementing additionally requires a
//! [`SeatHold`], which can only be obtained by checking the capacity bound
//! against that same locked row.

use tracing::debug;

use super::error::EnrollmentError;
use super::store::{LockedSection, StoreError, StoreTx};

/// Proof that the locked section had a free seat when checked.
#[derive(Debug)]
pub struct SeatHold<'a> {
    section: &'a LockedSection,
}

pub struct CapacityLedger;

impl CapacityLedger {
    /// Fails with [`EnrollmentError::Full`] when `enrolled >= capacity`.
    pub fn hold_seat(section: &LockedSection) -> Result<SeatHold<'_>, EnrollmentError> {
        if section.is_full() {
            return Err(EnrollmentError::Full {
                section_id: section.id,
            });
        }
        Ok(SeatHold { section })
    }

    /// Takes the held seat. Returns the new `enrolled` value.
    pub async fn take_seat(
        tx: &mut dyn StoreTx,
        hold: SeatHold<'_>,
    ) -> Result<i32, EnrollmentError> {
        let section = hold.section;
        let enrolled = tx
            .adjust_enrolled(section.id, 1)
            .await
            .map_err(|err| capacity_error(err, section))?;

        debug!(section_id = %section.id, enrolled, capacity = section.capacity, "Seat taken");
        Ok(enrolled)
    }

    /// Gives a seat back after a drop. Returns the new `enrolled` value.
    pub async fn release_seat(
        tx: &mut dyn StoreTx,
        section: &LockedSection,
    ) -> Result<i32, EnrollmentError> {
        let enrolled = tx.adjust_enrolled(section.id, -1).await.map_err(|err| match err {
            StoreError::CheckViolation(_) => EnrollmentError::Internal(anyhow::anyhow!(
                "Section {} counter would go negative",
                section.id
            )),
            other => other.into(),
        })?;

        debug!(section_id = %section.id, enrolled, "Seat released");
        Ok(enrolled)
    }
}

fn capacity_error(err: StoreError, section: &LockedSection) -> EnrollmentError {
    match err {
        StoreError::CheckViolation(_) => EnrollmentError::Full {
            section_id: section.id,
        },
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use registrar_models::{CourseCode, RoomId, Section, SectionId, TimeslotId};

    fn locked(capacity: i32, enrolled: i32) -> LockedSection {
        LockedSection::new(Section {
            id: SectionId::new(1),
            course_code: CourseCode::new("CS101"),
            term: "2025-FALL".to_string(),
            section_number: 1,
            capacity,
            enrolled,
            timeslot_id: TimeslotId::new(1),
            room_id: RoomId::new(1),
        })
    }

    #[test]
    fn test_full_section_refuses_hold() {
        let section = locked(2, 2);
        let err = CapacityLedger::hold_seat(&section).unwrap_err();
        assert!(matches!(err, EnrollmentError::Full { .. }));
    }

    #[test]
    fn test_zero_capacity_is_full() {
        assert!(CapacityLedger::hold_seat(&locked(0, 0)).is_err());
    }

    #[test]
    fn test_open_section_grants_hold() {
        assert!(CapacityLedger::hold_seat(&locked(2, 1)).is_ok());
    }

    #[test]
    fn test_check_violation_maps_to_full() {
        let section = locked(1, 0);
        let err = capacity_error(StoreError::CheckViolation("bounds".into()), &section);
        assert_eq!(err.kind(), "full");
    }
}
