//! User Directory
//!
//! Accounts for students, mentors and admins. The role column is written
//! once on insert and no update path touches it. Relationship pointers are
//! owned by the assignment module.

use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{Result, TrackerError};
use crate::store::{self, Store};
use crate::types::{require_text, validate_cgpa, Account, NewAccount, Profile, ProfileUpdate, Role};

pub(crate) const ACCOUNT_COLUMNS: &str =
    "id, name, email, role, cgpa, branch, skills, projects, assigned_mentor, created_at";

struct AccountRow {
    id: String,
    name: String,
    email: String,
    role: String,
    cgpa: Option<f64>,
    branch: Option<String>,
    skills: String,
    projects: i64,
    assigned_mentor: Option<String>,
    created_at: String,
}

impl AccountRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            role: row.get(3)?,
            cgpa: row.get(4)?,
            branch: row.get(5)?,
            skills: row.get(6)?,
            projects: row.get(7)?,
            assigned_mentor: row.get(8)?,
            created_at: row.get(9)?,
        })
    }

    fn into_account(self) -> Result<Account> {
        let role = Role::parse(&self.role).ok_or_else(|| {
            TrackerError::corrupt(format!("account {} has unknown role '{}'", self.id, self.role))
        })?;
        Ok(Account {
            id: self.id,
            name: self.name,
            email: self.email,
            role,
            profile: Profile {
                cgpa: self.cgpa,
                branch: self.branch,
                skills: store::decode_list(&self.skills)?,
                projects: u32::try_from(self.projects).unwrap_or(0),
                assigned_mentor: self.assigned_mentor,
                assigned_students: Vec::new(),
            },
            created_at: store::parse_timestamp(&self.created_at)?,
        })
    }
}

/// Load accounts matching `clause`, the SQL after `WHERE` including any
/// `ORDER BY`.
pub(crate) fn select_where<P: rusqlite::Params>(
    conn: &Connection,
    clause: &str,
    params: P,
) -> Result<Vec<Account>> {
    let sql = format!(
        "SELECT {} FROM accounts WHERE {}",
        ACCOUNT_COLUMNS, clause
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params, AccountRow::from_row)?;

    let mut accounts = Vec::new();
    for row in rows {
        accounts.push(row?.into_account()?);
    }
    fill_rosters(conn, &mut accounts)?;
    Ok(accounts)
}

pub(crate) fn load(conn: &Connection, id: &str) -> Result<Option<Account>> {
    let row = conn
        .query_row(
            &format!("SELECT {} FROM accounts WHERE id = ?1", ACCOUNT_COLUMNS),
            [id],
            AccountRow::from_row,
        )
        .optional()?;

    match row {
        Some(row) => {
            let mut accounts = vec![row.into_account()?];
            fill_rosters(conn, &mut accounts)?;
            Ok(accounts.pop())
        }
        None => Ok(None),
    }
}

pub(crate) fn require(conn: &Connection, id: &str) -> Result<Account> {
    load(conn, id)?.ok_or_else(|| TrackerError::not_found(format!("account {}", id)))
}

/// Derive `assigned_students` for every mentor in `accounts` from the
/// students' own pointers.
fn fill_rosters(conn: &Connection, accounts: &mut [Account]) -> Result<()> {
    if !accounts.iter().any(|a| a.role == Role::Mentor) {
        return Ok(());
    }

    let mut stmt = conn.prepare(
        "SELECT assigned_mentor, id FROM accounts
         WHERE role = 'student' AND assigned_mentor IS NOT NULL
         ORDER BY assigned_seq ASC, rowid ASC",
    )?;
    let pairs = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut rosters: HashMap<String, Vec<String>> = HashMap::new();
    for pair in pairs {
        let (mentor_id, student_id) = pair?;
        rosters.entry(mentor_id).or_default().push(student_id);
    }

    for account in accounts.iter_mut().filter(|a| a.role == Role::Mentor) {
        account.profile.assigned_students = rosters.remove(&account.id).unwrap_or_default();
    }
    Ok(())
}

fn normalize_email(email: &str) -> Result<String> {
    let email = require_text(email, "email")?.to_lowercase();
    if !email.contains('@') {
        return Err(TrackerError::validation(format!(
            "email '{}' is not a valid address",
            email
        )));
    }
    Ok(email)
}

fn has_profile_fields(update: &ProfileUpdate) -> bool {
    update.cgpa.is_some()
        || update.branch.is_some()
        || update.skills.is_some()
        || update.projects.is_some()
}

/// Merge a partial update into `profile`, validating every provided field.
fn apply_profile_update(profile: &mut Profile, update: ProfileUpdate) -> Result<()> {
    if let Some(cgpa) = update.cgpa {
        profile.cgpa = match cgpa.value("cgpa")? {
            Some(value) => {
                validate_cgpa(value, "cgpa")?;
                Some(value)
            }
            None => None,
        };
    }
    if let Some(branch) = update.branch {
        let branch = branch.trim();
        profile.branch = if branch.is_empty() {
            None
        } else {
            Some(branch.to_string())
        };
    }
    if let Some(skills) = update.skills {
        profile.skills = skills.into_skills();
    }
    if let Some(projects) = update.projects {
        profile.projects = projects.count("projects")?.unwrap_or(0);
    }
    Ok(())
}

pub fn create_account(store: &Store, input: NewAccount) -> Result<Account> {
    store.with_conn(|conn| insert_account(conn, input))
}

/// Validate and insert a new account on an open connection or transaction.
pub(crate) fn insert_account(conn: &Connection, input: NewAccount) -> Result<Account> {
    let name = require_text(&input.name, "name")?;
    let email = normalize_email(&input.email)?;

    let mut profile = Profile::default();
    if let Some(update) = input.profile {
        if input.role != Role::Student && has_profile_fields(&update) {
            return Err(TrackerError::validation(format!(
                "{} accounts do not carry student profile fields",
                input.role
            )));
        }
        apply_profile_update(&mut profile, update)?;
    }

    let account = Account {
        id: Uuid::new_v4().to_string(),
        name,
        email,
        role: input.role,
        profile,
        created_at: store::now(),
    };

    conn.execute(
        "INSERT INTO accounts (id, name, email, role, cgpa, branch, skills, projects, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            account.id,
            account.name,
            account.email,
            account.role.as_str(),
            account.profile.cgpa,
            account.profile.branch,
            store::encode_list(&account.profile.skills)?,
            account.profile.projects,
            account.created_at.to_rfc3339(),
        ],
    )
    .map_err(|e| match TrackerError::from(e) {
        TrackerError::Conflict(_) => TrackerError::Conflict(format!(
            "an account with email {} already exists",
            account.email
        )),
        other => other,
    })?;

    log::info!("[accounts] Created {} account {}", account.role, account.id);
    Ok(account)
}

pub fn get_account(store: &Store, id: &str) -> Result<Account> {
    store.with_conn(|conn| require(conn, id))
}

pub fn find_by_email(store: &Store, email: &str) -> Result<Option<Account>> {
    let email = email.trim().to_lowercase();
    store.with_conn(|conn| Ok(select_where(conn, "email = ?1", [email])?.pop()))
}

/// Update a student's own profile fields. Fields left out of `update` keep
/// their current value.
pub fn update_student_profile(store: &Store, id: &str, update: ProfileUpdate) -> Result<Account> {
    store.with_transaction(|tx| {
        let mut account = require(tx, id)?;
        account.expect_role(Role::Student)?;
        apply_profile_update(&mut account.profile, update)?;

        tx.execute(
            "UPDATE accounts SET cgpa = ?1, branch = ?2, skills = ?3, projects = ?4 WHERE id = ?5",
            params![
                account.profile.cgpa,
                account.profile.branch,
                store::encode_list(&account.profile.skills)?,
                account.profile.projects,
                account.id,
            ],
        )?;
        Ok(account)
    })
}

pub fn list_accounts(store: &Store) -> Result<Vec<Account>> {
    store.with_conn(|conn| select_where(conn, "1 = 1 ORDER BY rowid ASC", []))
}

pub fn list_by_role(store: &Store, role: Role) -> Result<Vec<Account>> {
    store.with_conn(|conn| select_where(conn, "role = ?1 ORDER BY rowid ASC", [role.as_str()]))
}

pub(crate) fn count_role(conn: &Connection, role: Role) -> Result<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM accounts WHERE role = ?1",
        [role.as_str()],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}

pub fn count_by_role(store: &Store, role: Role) -> Result<u64> {
    store.with_conn(|conn| count_role(conn, role))
}

pub(crate) fn count_all(conn: &Connection) -> Result<u64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM accounts", [], |row| row.get(0))?;
    Ok(count as u64)
}

pub fn count_accounts(store: &Store) -> Result<u64> {
    store.with_conn(count_all)
}

/// Delete an account. Progress, certifications and feedback go with it;
/// a deleted mentor's students become unassigned.
pub fn delete_account(store: &Store, id: &str) -> Result<()> {
    let removed = store.with_conn(|conn| Ok(conn.execute("DELETE FROM accounts WHERE id = ?1", [id])?))?;
    if removed == 0 {
        return Err(TrackerError::not_found(format!("account {}", id)));
    }
    log::info!("[accounts] Deleted account {}", id);
    Ok(())
}
