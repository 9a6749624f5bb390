//! In-process [`EnrollmentStore`] for tests.
//!
//! Behaves like PostgreSQL under `READ COMMITTED` for the queries the
//! enrollment core issues:
//!
//! - `lock_section`/`lock_student` take exclusive row locks that are held
//!   until commit or rollback; a second transaction waits for the holder
//! - a wait that would close a cycle in the waits-for graph fails the waiting
//!   transaction with [`StoreError::Conflict`], as `40P01` does
//! - writes are staged per transaction and only become visible on commit
//! - the partial unique index on active enrollments and the
//!   `0 <= enrolled <= capacity` check are enforced
//!
//! Dropping a [`MemoryTx`] without committing discards its writes and releases
//! its locks.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use registrar_models::{
    Course, CourseCode, Enrollment, EnrollmentId, EnrollmentStatus, PaymentId, RoomId,
    ScheduleEntry, Section, SectionAvailability, SectionId, StudentStanding, Timeslot, TimeslotId,
    UserId, UserRole,
};
use tokio::sync::Notify;

use super::{EnrollmentStore, GradeRecord, LockedSection, StoreError, StoreTx};

type TxId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RowKey {
    Section(SectionId),
    User(UserId),
}

#[derive(Debug, Clone)]
struct UserRow {
    role: UserRole,
    suspended_until: Option<DateTime<Utc>>,
}

/// A payment row as seen by tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRecord {
    pub id: PaymentId,
    pub student_id: UserId,
    pub amount_cents: i64,
    pub status: String,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    users: BTreeMap<UserId, UserRow>,
    courses: BTreeMap<CourseCode, Course>,
    prerequisites: Vec<(CourseCode, CourseCode)>,
    timeslots: BTreeMap<TimeslotId, Timeslot>,
    rooms: BTreeMap<RoomId, String>,
    sections: BTreeMap<SectionId, Section>,
    enrollments: BTreeMap<EnrollmentId, Enrollment>,
    payments: BTreeMap<PaymentId, PaymentRecord>,
}

#[derive(Debug, Clone)]
enum Write {
    InsertEnrollment(Enrollment),
    SetStatus(EnrollmentId, EnrollmentStatus),
    AdjustEnrolled(SectionId, i32),
    InsertPayment(PaymentRecord),
}

impl Tables {
    fn apply(&mut self, write: &Write) -> Result<(), StoreError> {
        match write {
            Write::InsertEnrollment(enrollment) => {
                if self.has_active(enrollment.student_id, enrollment.section_id) {
                    return Err(StoreError::UniqueViolation(
                        "uq_enrollments_active_student_section".to_string(),
                    ));
                }
                self.enrollments.insert(enrollment.id, enrollment.clone());
            }
            Write::SetStatus(id, status) => {
                let enrollment = self
                    .enrollments
                    .get_mut(id)
                    .ok_or_else(|| StoreError::Backend(anyhow::anyhow!("Enrollment {id} vanished")))?;
                enrollment.status = *status;
            }
            Write::AdjustEnrolled(id, delta) => {
                let section = self
                    .sections
                    .get_mut(id)
                    .ok_or_else(|| StoreError::Backend(anyhow::anyhow!("Section {id} vanished")))?;
                let next = section.enrolled + delta;
                if next < 0 || next > section.capacity {
                    return Err(StoreError::CheckViolation(
                        "sections_enrolled_within_capacity".to_string(),
                    ));
                }
                section.enrolled = next;
            }
            Write::InsertPayment(payment) => {
                self.payments.insert(payment.id, payment.clone());
            }
        }
        Ok(())
    }

    fn has_active(&self, student: UserId, section: SectionId) -> bool {
        self.enrollments.values().any(|e| {
            e.student_id == student && e.section_id == section && e.status != EnrollmentStatus::Dropped
        })
    }

    fn course_of(&self, section: SectionId) -> Option<&CourseCode> {
        self.sections.get(&section).map(|s| &s.course_code)
    }
}

#[derive(Debug, Default)]
struct LockTable {
    holders: HashMap<RowKey, TxId>,
    waits_for: HashMap<TxId, TxId>,
}

impl LockTable {
    /// Would `waiter` blocking on `holder` close a cycle?
    fn would_deadlock(&self, waiter: TxId, holder: TxId) -> bool {
        let mut current = holder;
        for _ in 0..=self.waits_for.len() {
            match self.waits_for.get(&current) {
                Some(&next) if next == waiter => return true,
                Some(&next) => current = next,
                None => return false,
            }
        }
        false
    }

    fn release_all(&mut self, tx: TxId) {
        self.holders.retain(|_, holder| *holder != tx);
        self.waits_for.remove(&tx);
    }
}

#[derive(Debug, Default)]
struct Inner {
    tables: Tables,
    locks: LockTable,
    next_row_id: i64,
    next_tx_id: TxId,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_row_id += 1;
        self.next_row_id
    }
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<Inner>,
    released: Notify,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, role: UserRole) -> UserId {
        let mut inner = self.shared.lock();
        let id = UserId::new(inner.next_id());
        inner.tables.users.insert(
            id,
            UserRow {
                role,
                suspended_until: None,
            },
        );
        id
    }

    pub fn add_student(&self) -> UserId {
        self.add_user(UserRole::Student)
    }

    pub fn suspend_until(&self, user: UserId, until: Option<DateTime<Utc>>) {
        let mut inner = self.shared.lock();
        if let Some(row) = inner.tables.users.get_mut(&user) {
            row.suspended_until = until;
        }
    }

    pub fn add_course(&self, code: &str, title: &str) -> CourseCode {
        let code = CourseCode::new(code);
        self.shared.lock().tables.courses.insert(
            code.clone(),
            Course {
                code: code.clone(),
                title: title.to_string(),
                credits: 3,
            },
        );
        code
    }

    pub fn add_prerequisite(&self, course: &str, prerequisite: &str) {
        self.shared
            .lock()
            .tables
            .prerequisites
            .push((CourseCode::new(course), CourseCode::new(prerequisite)));
    }

    pub fn add_timeslot(&self, day: &str, start: NaiveTime, end: NaiveTime) -> TimeslotId {
        let mut inner = self.shared.lock();
        let id = TimeslotId::new(inner.next_id());
        inner.tables.timeslots.insert(
            id,
            Timeslot {
                id,
                day: day.to_string(),
                start_time: start,
                end_time: end,
            },
        );
        id
    }

    pub fn add_room(&self, name: &str) -> RoomId {
        let mut inner = self.shared.lock();
        let id = RoomId::new(inner.next_id());
        inner.tables.rooms.insert(id, name.to_string());
        id
    }

    /// Adds a section with `enrolled = 0`. The course must already exist.
    pub fn add_section(
        &self,
        course: &CourseCode,
        term: &str,
        capacity: i32,
        timeslot: TimeslotId,
        room: RoomId,
    ) -> SectionId {
        let mut inner = self.shared.lock();
        let id = SectionId::new(inner.next_id());
        let section_number = inner
            .tables
            .sections
            .values()
            .filter(|s| &s.course_code == course && s.term == term)
            .count() as i32
            + 1;
        inner.tables.sections.insert(
            id,
            Section {
                id,
                course_code: course.clone(),
                term: term.to_string(),
                section_number,
                capacity,
                enrolled: 0,
                timeslot_id: timeslot,
                room_id: room,
            },
        );
        id
    }

    /// Sets the grade on the student's active enrollment in `section`.
    pub fn record_grade(
        &self,
        student: UserId,
        section: SectionId,
        grade: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.shared.lock();
        let enrollment = inner
            .tables
            .enrollments
            .values_mut()
            .find(|e| {
                e.student_id == student
                    && e.section_id == section
                    && e.status != EnrollmentStatus::Dropped
            })
            .ok_or_else(|| StoreError::Backend(anyhow::anyhow!("No enrollment to grade")))?;
        enrollment.grade = Some(grade.to_string());
        Ok(())
    }

    pub fn section(&self, id: SectionId) -> Option<Section> {
        self.shared.lock().tables.sections.get(&id).cloned()
    }

    pub fn enrollments(&self) -> Vec<Enrollment> {
        self.shared
            .lock()
            .tables
            .enrollments
            .values()
            .cloned()
            .collect()
    }

    pub fn payments(&self) -> Vec<PaymentRecord> {
        self.shared.lock().tables.payments.values().cloned().collect()
    }

    /// Number of `enrolled` rows pointing at `section`.
    pub fn count_enrolled(&self, section: SectionId) -> i32 {
        self.shared
            .lock()
            .tables
            .enrollments
            .values()
            .filter(|e| e.section_id == section && e.status == EnrollmentStatus::Enrolled)
            .count() as i32
    }

    /// Row locks currently held by open transactions.
    pub fn held_locks(&self) -> usize {
        self.shared.lock().locks.holders.len()
    }
}

#[async_trait]
impl EnrollmentStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        let id = {
            let mut inner = self.shared.lock();
            inner.next_tx_id += 1;
            inner.next_tx_id
        };

        Ok(Box::new(MemoryTx {
            id,
            shared: Arc::clone(&self.shared),
            staged: Vec::new(),
            finished: false,
        }))
    }

    async fn student_standing(&self, id: UserId) -> Result<Option<StudentStanding>, StoreError> {
        Ok(self
            .shared
            .lock()
            .tables
            .users
            .get(&id)
            .map(|row| StudentStanding {
                id,
                role: row.role,
                suspended_until: row.suspended_until,
            }))
    }

    async fn section_availability(
        &self,
        id: SectionId,
    ) -> Result<Option<SectionAvailability>, StoreError> {
        Ok(self
            .shared
            .lock()
            .tables
            .sections
            .get(&id)
            .map(SectionAvailability::from))
    }

    async fn student_schedule(&self, student: UserId) -> Result<Vec<ScheduleEntry>, StoreError> {
        let inner = self.shared.lock();
        let tables = &inner.tables;

        let mut entries: Vec<ScheduleEntry> = tables
            .enrollments
            .values()
            .filter(|e| e.student_id == student && e.status == EnrollmentStatus::Enrolled)
            .filter_map(|e| {
                let section = tables.sections.get(&e.section_id)?;
                let course = tables.courses.get(&section.course_code)?;
                let slot = tables.timeslots.get(&section.timeslot_id)?;
                let room = tables.rooms.get(&section.room_id)?;
                Some(ScheduleEntry {
                    section_id: section.id,
                    course_code: course.code.clone(),
                    title: course.title.clone(),
                    credits: course.credits,
                    term: section.term.clone(),
                    section_number: section.section_number,
                    day: slot.day.clone(),
                    start_time: slot.start_time,
                    end_time: slot.end_time,
                    room_name: room.clone(),
                })
            })
            .collect();

        entries.sort_by(|a, b| {
            (&a.term, &a.day, a.start_time).cmp(&(&b.term, &b.day, b.start_time))
        });
        Ok(entries)
    }
}

pub struct MemoryTx {
    id: TxId,
    shared: Arc<Shared>,
    staged: Vec<Write>,
    finished: bool,
}

impl MemoryTx {
    /// Committed tables with this transaction's own writes applied on top.
    fn view(&self) -> Result<Tables, StoreError> {
        let mut tables = self.shared.lock().tables.clone();
        for write in &self.staged {
            tables.apply(write)?;
        }
        Ok(tables)
    }

    fn stage(&mut self, write: Write) -> Result<(), StoreError> {
        self.view()?.apply(&write)?;
        self.staged.push(write);
        Ok(())
    }

    fn allocate_id(&self) -> i64 {
        self.shared.lock().next_id()
    }

    async fn lock_row(&mut self, key: RowKey) -> Result<(), StoreError> {
        loop {
            let released = {
                let mut inner = self.shared.lock();
                let locks = &mut inner.locks;

                match locks.holders.get(&key).copied() {
                    None => {
                        locks.holders.insert(key, self.id);
                        locks.waits_for.remove(&self.id);
                        return Ok(());
                    }
                    Some(holder) if holder == self.id => {
                        locks.waits_for.remove(&self.id);
                        return Ok(());
                    }
                    Some(holder) => {
                        if locks.would_deadlock(self.id, holder) {
                            locks.waits_for.remove(&self.id);
                            return Err(StoreError::Conflict(format!(
                                "deadlock detected while waiting for {key:?}"
                            )));
                        }
                        locks.waits_for.insert(self.id, holder);
                        // Registered before the state mutex is released so a
                        // concurrent release cannot be missed.
                        self.shared.released.notified()
                    }
                }
            };
            released.await;
        }
    }

    fn release(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.shared.lock().locks.release_all(self.id);
        self.shared.released.notify_waiters();
    }

    fn exists(&self, key: RowKey) -> Result<bool, StoreError> {
        let tables = self.view()?;
        Ok(match key {
            RowKey::Section(id) => tables.sections.contains_key(&id),
            RowKey::User(id) => tables.users.contains_key(&id),
        })
    }
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        self.release();
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn lock_section(&mut self, id: SectionId) -> Result<Option<LockedSection>, StoreError> {
        let key = RowKey::Section(id);
        if !self.exists(key)? {
            return Ok(None);
        }
        self.lock_row(key).await?;

        // Re-read after the wait: the previous holder may have committed.
        Ok(self.view()?.sections.get(&id).cloned().map(LockedSection::new))
    }

    async fn lock_student(&mut self, id: UserId) -> Result<bool, StoreError> {
        let key = RowKey::User(id);
        if !self.exists(key)? {
            return Ok(false);
        }
        self.lock_row(key).await?;
        Ok(true)
    }

    async fn prerequisites(&mut self, course: &CourseCode) -> Result<Vec<CourseCode>, StoreError> {
        let mut codes: Vec<CourseCode> = self
            .view()?
            .prerequisites
            .into_iter()
            .filter(|(c, _)| c == course)
            .map(|(_, prerequisite)| prerequisite)
            .collect();
        codes.sort();
        codes.dedup();
        Ok(codes)
    }

    async fn graded_courses(
        &mut self,
        student: UserId,
        courses: &[CourseCode],
    ) -> Result<Vec<GradeRecord>, StoreError> {
        let tables = self.view()?;
        Ok(tables
            .enrollments
            .values()
            .filter(|e| e.student_id == student)
            .filter_map(|e| {
                let grade = e.grade.clone()?;
                let course_code = tables.course_of(e.section_id)?.clone();
                courses
                    .contains(&course_code)
                    .then_some(GradeRecord { course_code, grade })
            })
            .collect())
    }

    async fn conflicting_sections(
        &mut self,
        student: UserId,
        section: &Section,
    ) -> Result<Vec<SectionId>, StoreError> {
        let tables = self.view()?;
        let mut ids: Vec<SectionId> = tables
            .enrollments
            .values()
            .filter(|e| e.student_id == student && e.status == EnrollmentStatus::Enrolled)
            .filter_map(|e| tables.sections.get(&e.section_id))
            .filter(|s| {
                s.id != section.id && s.term == section.term && s.timeslot_id == section.timeslot_id
            })
            .map(|s| s.id)
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn active_enrollment(
        &mut self,
        student: UserId,
        section: SectionId,
    ) -> Result<Option<Enrollment>, StoreError> {
        Ok(self
            .view()?
            .enrollments
            .into_values()
            .find(|e| {
                e.student_id == student
                    && e.section_id == section
                    && e.status != EnrollmentStatus::Dropped
            }))
    }

    async fn insert_enrollment(
        &mut self,
        student: UserId,
        section: SectionId,
    ) -> Result<EnrollmentId, StoreError> {
        let id = EnrollmentId::new(self.allocate_id());
        self.stage(Write::InsertEnrollment(Enrollment {
            id,
            student_id: student,
            section_id: section,
            status: EnrollmentStatus::Enrolled,
            grade: None,
        }))?;
        Ok(id)
    }

    async fn set_enrollment_status(
        &mut self,
        id: EnrollmentId,
        status: EnrollmentStatus,
    ) -> Result<(), StoreError> {
        self.stage(Write::SetStatus(id, status))
    }

    async fn adjust_enrolled(&mut self, section: SectionId, delta: i32) -> Result<i32, StoreError> {
        self.stage(Write::AdjustEnrolled(section, delta))?;
        self.view()?
            .sections
            .get(&section)
            .map(|s| s.enrolled)
            .ok_or_else(|| StoreError::Backend(anyhow::anyhow!("Section {section} vanished")))
    }

    async fn insert_payment(
        &mut self,
        student: UserId,
        amount_cents: i64,
    ) -> Result<PaymentId, StoreError> {
        let id = PaymentId::new(self.allocate_id());
        self.stage(Write::InsertPayment(PaymentRecord {
            id,
            student_id: student,
            amount_cents,
            status: "pending".to_string(),
        }))?;
        Ok(id)
    }

    async fn commit(mut self: Box<Self>) -> Result<(), StoreError> {
        let outcome = {
            let mut inner = self.shared.lock();
            let mut next = inner.tables.clone();
            let applied: Result<(), StoreError> =
                self.staged.iter().try_for_each(|write| next.apply(write));
            if applied.is_ok() {
                inner.tables = next;
            }
            applied
        };
        self.staged.clear();
        self.release();
        outcome
    }

    async fn rollback(mut self: Box<Self>) -> Result<(), StoreError> {
        self.staged.clear();
        self.release();
        Ok(())
    }
}
