//! Assignment Manager
//!
//! A student's `assigned_mentor` column is the only stored side of the
//! mentor/student relationship. Rosters are read back with
//! `WHERE assigned_mentor = ?`, so a student can never sit on two rosters
//! and a roster can never disagree with the student's pointer.
//!
//! `assign` and `unassign` run their check-then-write inside one IMMEDIATE
//! transaction; this module is the only writer of `assigned_mentor`.

use rusqlite::{params, Connection};
use serde::Serialize;

use crate::accounts;
use crate::error::{Result, TrackerError};
use crate::progress;
use crate::store::Store;
use crate::types::{Account, PersonRef, ProgressRecord, Role, RosterEntry};

/// What an `assign` call changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AssignOutcome {
    Assigned,
    Reassigned {
        #[serde(rename = "previousMentor")]
        previous_mentor: String,
    },
    Unchanged,
}

fn load_pair(conn: &Connection, student_id: &str, mentor_id: &str) -> Result<(Account, Account)> {
    let student = accounts::load(conn, student_id)?;
    let mentor = accounts::load(conn, mentor_id)?;

    match (student, mentor) {
        (Some(student), Some(mentor)) => {
            if student.role() != Role::Student || mentor.role() != Role::Mentor {
                return Err(TrackerError::InvalidRole(format!(
                    "expected a student and a mentor, got {} and {}",
                    student.role(),
                    mentor.role()
                )));
            }
            Ok((student, mentor))
        }
        _ => Err(TrackerError::not_found("student or mentor")),
    }
}

/// Assign `student_id` to `mentor_id`, removing it from any previous roster.
///
/// Assigning a student to the mentor it already has changes nothing,
/// including its position in the roster.
pub fn assign(store: &Store, student_id: &str, mentor_id: &str) -> Result<AssignOutcome> {
    let outcome = store.with_transaction(|tx| {
        let (student, mentor) = load_pair(tx, student_id, mentor_id)?;

        let previous = student.profile.assigned_mentor;
        if previous.as_deref() == Some(mentor.id.as_str()) {
            return Ok(AssignOutcome::Unchanged);
        }

        let seq: i64 = tx.query_row(
            "SELECT COALESCE(MAX(assigned_seq), 0) + 1 FROM accounts",
            [],
            |row| row.get(0),
        )?;
        tx.execute(
            "UPDATE accounts SET assigned_mentor = ?1, assigned_seq = ?2
             WHERE id = ?3 AND role = 'student'",
            params![mentor.id, seq, student.id],
        )?;

        Ok(match previous {
            Some(previous_mentor) => AssignOutcome::Reassigned { previous_mentor },
            None => AssignOutcome::Assigned,
        })
    })?;

    match &outcome {
        AssignOutcome::Unchanged => {
            log::debug!("[assignment] Student {} already with mentor {}", student_id, mentor_id)
        }
        AssignOutcome::Assigned => {
            log::info!("[assignment] Assigned student {} to mentor {}", student_id, mentor_id)
        }
        AssignOutcome::Reassigned { previous_mentor } => log::info!(
            "[assignment] Moved student {} from mentor {} to mentor {}",
            student_id,
            previous_mentor,
            mentor_id
        ),
    }
    Ok(outcome)
}

/// Clear the student's mentor. Returns whether the student had one.
pub fn unassign(store: &Store, student_id: &str) -> Result<bool> {
    let had_mentor = store.with_transaction(|tx| {
        let student = accounts::require(tx, student_id)?;
        student.expect_role(Role::Student)?;
        if student.profile.assigned_mentor.is_none() {
            return Ok(false);
        }
        tx.execute(
            "UPDATE accounts SET assigned_mentor = NULL, assigned_seq = NULL WHERE id = ?1",
            [student_id],
        )?;
        Ok(true)
    })?;

    if had_mentor {
        log::info!("[assignment] Unassigned student {}", student_id);
    }
    Ok(had_mentor)
}

pub(crate) fn roster_students(conn: &Connection, mentor_id: &str) -> Result<Vec<Account>> {
    accounts::select_where(
        conn,
        "role = 'student' AND assigned_mentor = ?1 ORDER BY assigned_seq ASC, rowid ASC",
        [mentor_id],
    )
}

fn require_mentor(conn: &Connection, mentor_id: &str) -> Result<Account> {
    let mentor = accounts::require(conn, mentor_id)?;
    mentor.expect_role(Role::Mentor)?;
    Ok(mentor)
}

/// Students on the mentor's roster, in assignment order.
pub fn roster(store: &Store, mentor_id: &str) -> Result<Vec<Account>> {
    store.with_conn(|conn| {
        require_mentor(conn, mentor_id)?;
        roster_students(conn, mentor_id)
    })
}

/// The roster joined with each student's progress. Students without a
/// progress record get an all-zero one.
pub fn list_roster(store: &Store, mentor_id: &str) -> Result<Vec<RosterEntry>> {
    store.with_conn(|conn| {
        require_mentor(conn, mentor_id)?;
        let students = roster_students(conn, mentor_id)?;

        let mut entries = Vec::with_capacity(students.len());
        for student in students {
            let progress = progress::find_in(conn, &student.id)?
                .unwrap_or_else(|| ProgressRecord::empty(&student.id));
            entries.push(RosterEntry { student, progress });
        }
        Ok(entries)
    })
}

/// The student's current mentor, if any.
pub fn mentor_of(store: &Store, student_id: &str) -> Result<Option<PersonRef>> {
    store.with_conn(|conn| {
        let student = accounts::require(conn, student_id)?;
        student.expect_role(Role::Student)?;
        match student.profile.assigned_mentor {
            Some(mentor_id) => Ok(accounts::load(conn, &mentor_id)?.map(|m| m.person_ref())),
            None => Ok(None),
        }
    })
}
