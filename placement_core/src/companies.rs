//! Company Directory
//!
//! Hiring criteria managed by admins. Listing order is storage order.

use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::error::{Result, TrackerError};
use crate::store::{self, Store};
use crate::types::{require_text, validate_cgpa, Company, CompanyInput};

const COMPANY_COLUMNS: &str =
    "id, name, ctc, location, min_cgpa, required_skills, is_active, description, created_at, updated_at";

/// Company totals for the admin dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompanyCounts {
    pub total: u64,
    pub active: u64,
}

struct CompanyRow {
    id: String,
    name: String,
    ctc: f64,
    location: String,
    min_cgpa: f64,
    required_skills: String,
    is_active: bool,
    description: Option<String>,
    created_at: String,
    updated_at: String,
}

impl CompanyRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            ctc: row.get(2)?,
            location: row.get(3)?,
            min_cgpa: row.get(4)?,
            required_skills: row.get(5)?,
            is_active: row.get(6)?,
            description: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    fn into_company(self) -> Result<Company> {
        Ok(Company {
            id: self.id,
            name: self.name,
            ctc: self.ctc,
            location: self.location,
            min_cgpa: self.min_cgpa,
            required_skills: store::decode_list(&self.required_skills)?,
            is_active: self.is_active,
            description: self.description,
            created_at: store::parse_timestamp(&self.created_at)?,
            updated_at: store::parse_timestamp(&self.updated_at)?,
        })
    }
}

/// Validated, normalised form of a `CompanyInput`.
struct CompanyFields {
    name: String,
    ctc: f64,
    location: String,
    min_cgpa: f64,
    required_skills: Vec<String>,
    is_active: bool,
    description: Option<String>,
}

fn validate(input: CompanyInput) -> Result<CompanyFields> {
    let name = require_text(&input.name, "name")?;
    let location = require_text(&input.location, "location")?;
    let ctc = input.ctc.required("ctc")?;
    if !ctc.is_finite() || ctc < 0.0 {
        return Err(TrackerError::validation(format!(
            "ctc must be a non-negative number, got {}",
            ctc
        )));
    }
    let min_cgpa = input.min_cgpa.required("minCGPA")?;
    validate_cgpa(min_cgpa, "minCGPA")?;

    Ok(CompanyFields {
        name,
        ctc,
        location,
        min_cgpa,
        required_skills: input
            .required_skills
            .map(|skills| skills.into_skills())
            .unwrap_or_default(),
        is_active: input.is_active.unwrap_or(true),
        description: input
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
    })
}

pub(crate) fn list_in(conn: &Connection) -> Result<Vec<Company>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM companies ORDER BY rowid ASC",
        COMPANY_COLUMNS
    ))?;
    let rows = stmt.query_map([], CompanyRow::from_row)?;

    let mut companies = Vec::new();
    for row in rows {
        companies.push(row?.into_company()?);
    }
    Ok(companies)
}

fn load(conn: &Connection, id: &str) -> Result<Company> {
    conn.query_row(
        &format!("SELECT {} FROM companies WHERE id = ?1", COMPANY_COLUMNS),
        [id],
        CompanyRow::from_row,
    )
    .optional()?
    .ok_or_else(|| TrackerError::not_found(format!("company {}", id)))?
    .into_company()
}

pub(crate) fn counts_in(conn: &Connection) -> Result<CompanyCounts> {
    let (total, active): (i64, i64) = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(is_active), 0) FROM companies",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok(CompanyCounts {
        total: total as u64,
        active: active as u64,
    })
}

pub fn create_company(store: &Store, input: CompanyInput) -> Result<Company> {
    store.with_conn(|conn| insert_company(conn, input))
}

/// Validate and insert a new company on an open connection or transaction.
pub(crate) fn insert_company(conn: &Connection, input: CompanyInput) -> Result<Company> {
    let fields = validate(input)?;
    let id = Uuid::new_v4().to_string();
    let now = store::now().to_rfc3339();

    conn.execute(
        &format!(
            "INSERT INTO companies ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            COMPANY_COLUMNS
        ),
        params![
            id,
            fields.name,
            fields.ctc,
            fields.location,
            fields.min_cgpa,
            store::encode_list(&fields.required_skills)?,
            fields.is_active,
            fields.description,
            now,
            now,
        ],
    )?;
    let company = load(conn, &id)?;

    log::info!("[companies] Created company {} ({})", company.name, company.id);
    Ok(company)
}

/// Replace every editable field of an existing company.
pub fn update_company(store: &Store, id: &str, input: CompanyInput) -> Result<Company> {
    let fields = validate(input)?;
    store.with_conn(|conn| {
        let updated = conn.execute(
            "UPDATE companies SET name = ?1, ctc = ?2, location = ?3, min_cgpa = ?4,
                required_skills = ?5, is_active = ?6, description = ?7, updated_at = ?8
             WHERE id = ?9",
            params![
                fields.name,
                fields.ctc,
                fields.location,
                fields.min_cgpa,
                store::encode_list(&fields.required_skills)?,
                fields.is_active,
                fields.description,
                store::now().to_rfc3339(),
                id,
            ],
        )?;
        if updated == 0 {
            return Err(TrackerError::not_found(format!("company {}", id)));
        }
        load(conn, id)
    })
}

pub fn delete_company(store: &Store, id: &str) -> Result<()> {
    let removed =
        store.with_conn(|conn| Ok(conn.execute("DELETE FROM companies WHERE id = ?1", [id])?))?;
    if removed == 0 {
        return Err(TrackerError::not_found(format!("company {}", id)));
    }
    log::info!("[companies] Deleted company {}", id);
    Ok(())
}

pub fn get_company(store: &Store, id: &str) -> Result<Company> {
    store.with_conn(|conn| load(conn, id))
}

pub fn list_companies(store: &Store) -> Result<Vec<Company>> {
    store.with_conn(list_in)
}

pub fn count_companies(store: &Store) -> Result<CompanyCounts> {
    store.with_conn(counts_in)
}
