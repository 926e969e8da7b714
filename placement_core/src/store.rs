//! SQLite-backed store shared by every tracker component.
//!
//! One connection guarded by a mutex. Every collection is its own table; the
//! schema is bootstrapped with `CREATE TABLE IF NOT EXISTS` on open.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Result, TrackerError};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS accounts (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        role TEXT NOT NULL CHECK (role IN ('student', 'mentor', 'admin')),
        cgpa REAL,
        branch TEXT,
        skills TEXT NOT NULL DEFAULT '[]',
        projects INTEGER NOT NULL DEFAULT 0,
        assigned_mentor TEXT REFERENCES accounts(id) ON DELETE SET NULL,
        assigned_seq INTEGER,
        created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_accounts_role ON accounts(role);
    CREATE INDEX IF NOT EXISTS idx_accounts_assigned_mentor ON accounts(assigned_mentor);

    CREATE TABLE IF NOT EXISTS companies (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        ctc REAL NOT NULL,
        location TEXT NOT NULL,
        min_cgpa REAL NOT NULL,
        required_skills TEXT NOT NULL DEFAULT '[]',
        is_active INTEGER NOT NULL DEFAULT 1,
        description TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS progress (
        id TEXT PRIMARY KEY,
        student_id TEXT NOT NULL UNIQUE REFERENCES accounts(id) ON DELETE CASCADE,
        problems_solved INTEGER NOT NULL DEFAULT 0,
        hours_practiced REAL NOT NULL DEFAULT 0,
        mock_interviews INTEGER NOT NULL DEFAULT 0,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS certifications (
        id TEXT PRIMARY KEY,
        progress_id TEXT NOT NULL REFERENCES progress(id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        issuer TEXT NOT NULL,
        date_obtained TEXT NOT NULL,
        position INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_certifications_progress ON certifications(progress_id);

    CREATE TABLE IF NOT EXISTS feedback (
        id TEXT PRIMARY KEY,
        mentor_id TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
        student_id TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
        message TEXT NOT NULL,
        category TEXT NOT NULL
            CHECK (category IN ('technical', 'interview', 'general', 'improvement')),
        created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_feedback_mentor ON feedback(mentor_id);
    CREATE INDEX IF NOT EXISTS idx_feedback_student ON feedback(student_id);
";

/// Handle to the placement database. Cloning shares the connection.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (or create) the database file at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        log::info!("[store] Opened database at {}", path.as_ref().display());
        Self::init(conn)
    }

    /// Create an in-memory store for testing
    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| TrackerError::Transient("store lock poisoned".to_string()))
    }

    /// Run read-only or single-statement work against the connection.
    pub fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Run `f` inside an IMMEDIATE transaction. Any error rolls the whole
    /// unit back and leaves prior state intact.
    pub fn with_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }
}

pub(crate) fn now() -> DateTime<Utc> {
    Utc::now()
}

pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| TrackerError::corrupt(format!("timestamp '{}': {}", value, e)))
}

pub(crate) fn encode_list(items: &[String]) -> Result<String> {
    Ok(serde_json::to_string(items)?)
}

pub(crate) fn decode_list(text: &str) -> Result<Vec<String>> {
    Ok(serde_json::from_str(text)?)
}
