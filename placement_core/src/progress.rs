//! Progress Tracker
//!
//! One progress record per student (UNIQUE on `student_id`) holding practice
//! counters and an ordered list of certifications. Certifications carry a
//! stable id assigned at creation and are deleted by that id.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::accounts;
use crate::error::{Result, TrackerError};
use crate::store::{self, Store};
use crate::types::{
    require_text, Certification, NewCertification, NumberInput, ProgressCounters, ProgressRecord,
    Role,
};

const DATE_FORMAT: &str = "%Y-%m-%d";

fn require_student(conn: &Connection, student_id: &str) -> Result<()> {
    accounts::require(conn, student_id)?.expect_role(Role::Student)
}

/// Counters after parsing; `None` means the field was left out.
struct Counters {
    problems_solved: Option<u32>,
    hours_practiced: Option<f64>,
    mock_interviews: Option<u32>,
}

fn resolve_counters(counters: &ProgressCounters) -> Result<Counters> {
    let hours_practiced = match &counters.hours_practiced {
        Some(input) => input.value("hoursPracticed")?,
        None => None,
    };
    if let Some(hours) = hours_practiced {
        if !hours.is_finite() || hours < 0.0 {
            return Err(TrackerError::validation(format!(
                "hoursPracticed must be a non-negative number, got {}",
                hours
            )));
        }
    }

    let count = |input: &Option<NumberInput>, field: &str| match input {
        Some(input) => input.count(field),
        None => Ok(None),
    };
    Ok(Counters {
        problems_solved: count(&counters.problems_solved, "problemsSolved")?,
        hours_practiced,
        mock_interviews: count(&counters.mock_interviews, "mockInterviews")?,
    })
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp.
fn parse_date(value: &str) -> Result<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc).date_naive()))
        .map_err(|_| TrackerError::validation(format!("dateObtained '{}' is not a date", value)))
}

fn load_certifications(conn: &Connection, progress_id: &str) -> Result<Vec<Certification>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, issuer, date_obtained FROM certifications
         WHERE progress_id = ?1
         ORDER BY position ASC",
    )?;
    let rows = stmt.query_map([progress_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
        ))
    })?;

    let mut certifications = Vec::new();
    for row in rows {
        let (id, name, issuer, date) = row?;
        certifications.push(Certification {
            id,
            name,
            issuer,
            date_obtained: parse_date(&date)?,
        });
    }
    Ok(certifications)
}

/// The student's record, if one has been created.
pub(crate) fn find_in(conn: &Connection, student_id: &str) -> Result<Option<ProgressRecord>> {
    let row = conn
        .query_row(
            "SELECT id, problems_solved, hours_practiced, mock_interviews, updated_at
             FROM progress WHERE student_id = ?1",
            [student_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, String>(4)?,
                ))
            },
        )
        .optional()?;

    let Some((id, problems_solved, hours_practiced, mock_interviews, updated_at)) = row else {
        return Ok(None);
    };

    Ok(Some(ProgressRecord {
        certifications: load_certifications(conn, &id)?,
        id: Some(id),
        student_id: student_id.to_string(),
        problems_solved: u32::try_from(problems_solved).unwrap_or(0),
        hours_practiced,
        mock_interviews: u32::try_from(mock_interviews).unwrap_or(0),
        updated_at: Some(store::parse_timestamp(&updated_at)?),
    }))
}

fn require_record(conn: &Connection, student_id: &str) -> Result<ProgressRecord> {
    find_in(conn, student_id)?
        .ok_or_else(|| TrackerError::not_found(format!("progress for student {}", student_id)))
}

/// Create an empty record unless one exists. Safe to race: the UNIQUE
/// constraint plus `OR IGNORE` leaves exactly one row.
fn ensure_record(conn: &Connection, student_id: &str) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO progress (id, student_id, updated_at) VALUES (?1, ?2, ?3)",
        params![Uuid::new_v4().to_string(), student_id, store::now().to_rfc3339()],
    )?;
    Ok(())
}

pub fn find(store: &Store, student_id: &str) -> Result<Option<ProgressRecord>> {
    store.with_conn(|conn| {
        require_student(conn, student_id)?;
        find_in(conn, student_id)
    })
}

/// Return the student's record, creating an empty one on first access.
pub fn get_or_create(store: &Store, student_id: &str) -> Result<ProgressRecord> {
    store.with_transaction(|tx| {
        require_student(tx, student_id)?;
        ensure_record(tx, student_id)?;
        require_record(tx, student_id)
    })
}

/// Explicitly create the student's record. A second record for the same
/// student is a conflict, never an overwrite.
pub fn create(store: &Store, student_id: &str, counters: ProgressCounters) -> Result<ProgressRecord> {
    let counters = resolve_counters(&counters)?;
    store.with_transaction(|tx| {
        require_student(tx, student_id)?;
        tx.execute(
            "INSERT INTO progress (id, student_id, problems_solved, hours_practiced, mock_interviews, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                Uuid::new_v4().to_string(),
                student_id,
                counters.problems_solved.unwrap_or(0),
                counters.hours_practiced.unwrap_or(0.0),
                counters.mock_interviews.unwrap_or(0),
                store::now().to_rfc3339(),
            ],
        )
        .map_err(|e| match TrackerError::from(e) {
            TrackerError::Conflict(_) => TrackerError::Conflict(format!(
                "progress record for student {} already exists",
                student_id
            )),
            other => other,
        })?;
        log::info!("[progress] Created progress record for student {}", student_id);
        require_record(tx, student_id)
    })
}

/// Set the provided counters, creating the record if needed. Counters left
/// out keep their current value.
pub fn update_counters(
    store: &Store,
    student_id: &str,
    counters: ProgressCounters,
) -> Result<ProgressRecord> {
    let counters = resolve_counters(&counters)?;
    store.with_transaction(|tx| {
        require_student(tx, student_id)?;
        ensure_record(tx, student_id)?;
        tx.execute(
            "UPDATE progress SET
                problems_solved = COALESCE(?1, problems_solved),
                hours_practiced = COALESCE(?2, hours_practiced),
                mock_interviews = COALESCE(?3, mock_interviews),
                updated_at = ?4
             WHERE student_id = ?5",
            params![
                counters.problems_solved,
                counters.hours_practiced,
                counters.mock_interviews,
                store::now().to_rfc3339(),
                student_id,
            ],
        )?;
        require_record(tx, student_id)
    })
}

pub fn add_certification(
    store: &Store,
    student_id: &str,
    input: NewCertification,
) -> Result<ProgressRecord> {
    let name = require_text(&input.name, "name")?;
    let issuer = require_text(&input.issuer, "issuer")?;
    let date_obtained = parse_date(&input.date_obtained)?;

    store.with_transaction(|tx| {
        require_student(tx, student_id)?;
        ensure_record(tx, student_id)?;
        let progress_id: String = tx.query_row(
            "SELECT id FROM progress WHERE student_id = ?1",
            [student_id],
            |row| row.get(0),
        )?;
        let position: i64 = tx.query_row(
            "SELECT COALESCE(MAX(position), 0) + 1 FROM certifications WHERE progress_id = ?1",
            [&progress_id],
            |row| row.get(0),
        )?;

        tx.execute(
            "INSERT INTO certifications (id, progress_id, name, issuer, date_obtained, position)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                Uuid::new_v4().to_string(),
                progress_id,
                name,
                issuer,
                date_obtained.format(DATE_FORMAT).to_string(),
                position,
            ],
        )?;
        tx.execute(
            "UPDATE progress SET updated_at = ?1 WHERE id = ?2",
            params![store::now().to_rfc3339(), progress_id],
        )?;
        require_record(tx, student_id)
    })
}

/// Remove one of the student's own certifications by its stable id.
pub fn delete_certification(
    store: &Store,
    student_id: &str,
    certification_id: &str,
) -> Result<ProgressRecord> {
    store.with_transaction(|tx| {
        require_student(tx, student_id)?;
        let record = require_record(tx, student_id)?;
        let progress_id = record.id.unwrap_or_default();

        let removed = tx.execute(
            "DELETE FROM certifications WHERE id = ?1 AND progress_id = ?2",
            params![certification_id, progress_id],
        )?;
        if removed == 0 {
            return Err(TrackerError::not_found(format!(
                "certification {}",
                certification_id
            )));
        }
        tx.execute(
            "UPDATE progress SET updated_at = ?1 WHERE id = ?2",
            params![store::now().to_rfc3339(), progress_id],
        )?;
        require_record(tx, student_id)
    })
}
