//! Feedback Log
//!
//! Append-only notes from a mentor to a student on their roster. Entries
//! are never edited; listings are newest first.

use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::accounts;
use crate::error::{Result, TrackerError};
use crate::store::{self, Store};
use crate::types::{require_text, Feedback, FeedbackCategory, NewFeedback, PersonRef, Role};

const FEEDBACK_SELECT: &str = "
    SELECT f.id, f.message, f.category, f.created_at,
           m.id, m.name, m.email,
           s.id, s.name, s.email
    FROM feedback f
    JOIN accounts m ON m.id = f.mentor_id
    JOIN accounts s ON s.id = f.student_id";

fn select(conn: &Connection, clause: &str, id: &str) -> Result<Vec<Feedback>> {
    let sql = format!(
        "{} WHERE {} ORDER BY f.created_at DESC, f.rowid DESC",
        FEEDBACK_SELECT, clause
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            PersonRef {
                id: row.get(4)?,
                name: row.get(5)?,
                email: row.get(6)?,
            },
            PersonRef {
                id: row.get(7)?,
                name: row.get(8)?,
                email: row.get(9)?,
            },
        ))
    })?;

    let mut entries = Vec::new();
    for row in rows {
        let (id, message, category, created_at, mentor, student) = row?;
        let category = FeedbackCategory::parse(&category).ok_or_else(|| {
            TrackerError::corrupt(format!("feedback {} has unknown category '{}'", id, category))
        })?;
        entries.push(Feedback {
            id,
            mentor,
            student,
            message,
            category,
            created_at: store::parse_timestamp(&created_at)?,
        });
    }
    Ok(entries)
}

/// Record feedback from `mentor_id` about a student on their roster.
pub fn create_feedback(store: &Store, mentor_id: &str, input: NewFeedback) -> Result<Feedback> {
    let message = require_text(&input.message, "message")?;
    let category = FeedbackCategory::parse(input.category.trim()).ok_or_else(|| {
        TrackerError::validation(format!(
            "category must be one of technical, interview, general, improvement; got '{}'",
            input.category
        ))
    })?;

    let created_at = store::now();
    let id = Uuid::new_v4().to_string();

    let feedback = store.with_transaction(|tx| {
        let mentor = accounts::require(tx, mentor_id)?;
        mentor.expect_role(Role::Mentor)?;
        let student = accounts::require(tx, &input.student_id)?;
        student.expect_role(Role::Student)?;

        if student.profile.assigned_mentor.as_deref() != Some(mentor.id.as_str()) {
            return Err(TrackerError::validation(format!(
                "student {} is not assigned to mentor {}",
                student.id, mentor.id
            )));
        }

        tx.execute(
            "INSERT INTO feedback (id, mentor_id, student_id, message, category, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id,
                mentor.id,
                student.id,
                message,
                category.as_str(),
                created_at.to_rfc3339(),
            ],
        )?;

        Ok(Feedback {
            id: id.clone(),
            mentor: mentor.person_ref(),
            student: student.person_ref(),
            message,
            category,
            created_at,
        })
    })?;

    log::info!(
        "[feedback] Mentor {} left {} feedback for student {}",
        feedback.mentor.id,
        feedback.category.as_str(),
        feedback.student.id
    );
    Ok(feedback)
}

pub fn list_for_student(store: &Store, student_id: &str) -> Result<Vec<Feedback>> {
    store.with_conn(|conn| {
        accounts::require(conn, student_id)?.expect_role(Role::Student)?;
        select(conn, "f.student_id = ?1", student_id)
    })
}

pub fn list_for_mentor(store: &Store, mentor_id: &str) -> Result<Vec<Feedback>> {
    store.with_conn(|conn| {
        accounts::require(conn, mentor_id)?.expect_role(Role::Mentor)?;
        select(conn, "f.mentor_id = ?1", mentor_id)
    })
}

pub(crate) fn count_for_mentor_in(conn: &Connection, mentor_id: &str) -> Result<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM feedback WHERE mentor_id = ?1",
        [mentor_id],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}

pub fn count_for_mentor(store: &Store, mentor_id: &str) -> Result<u64> {
    store.with_conn(|conn| count_for_mentor_in(conn, mentor_id))
}
