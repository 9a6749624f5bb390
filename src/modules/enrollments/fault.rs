//! Deadlock fault injection for tests.
//!
//! Two transactions that take the same pair of row locks in opposite order,
//! pausing between them, make the database pick a deadlock victim. The
//! victim must surface as [`EnrollmentError::Conflict`] with nothing
//! committed, while the survivor commits normally.

use std::time::Duration;

use registrar_models::{SectionId, UserId};
use tracing::info;

use super::error::EnrollmentError;
use super::store::StoreTx;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockTarget {
    Section(SectionId),
    Student(UserId),
}

/// Extra locking step spliced into an enroll transaction right after the
/// section row lock is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockInterleave {
    pub pause: Duration,
    pub also_lock: LockTarget,
}

pub(crate) async fn acquire(
    tx: &mut dyn StoreTx,
    target: LockTarget,
) -> Result<(), EnrollmentError> {
    match target {
        LockTarget::Section(id) => tx
            .lock_section(id)
            .await?
            .map(|_| ())
            .ok_or_else(EnrollmentError::section_not_found),
        LockTarget::Student(id) => {
            if tx.lock_student(id).await? {
                Ok(())
            } else {
                Err(EnrollmentError::NotFound { what: "Student" })
            }
        }
    }
}

pub(crate) async fn interleave(
    tx: &mut dyn StoreTx,
    step: &LockInterleave,
) -> Result<(), EnrollmentError> {
    info!(pause_ms = step.pause.as_millis() as u64, target = ?step.also_lock, "Injected lock pause");
    tokio::time::sleep(step.pause).await;
    acquire(tx, step.also_lock).await
}

#[cfg(any(test, feature = "test-utils"))]
pub use harness::hold_locks_in_order;

#[cfg(any(test, feature = "test-utils"))]
mod harness {
    use super::*;
    use crate::modules::enrollments::service::finish;
    use crate::modules::enrollments::store::EnrollmentStore;

    /// Locks `first`, sleeps for `pause`, locks `second`, then commits.
    pub async fn hold_locks_in_order(
        store: &dyn EnrollmentStore,
        first: LockTarget,
        second: LockTarget,
        pause: Duration,
    ) -> Result<(), EnrollmentError> {
        let mut tx = store.begin().await?;
        let outcome = async {
            acquire(tx.as_mut(), first).await?;
            tokio::time::sleep(pause).await;
            acquire(tx.as_mut(), second).await
        }
        .await;
        finish(tx, outcome).await
    }
}
