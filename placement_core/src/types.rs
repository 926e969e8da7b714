//! Placement Tracker Types
//!
//! Records and request payloads shared by the directories, the assignment
//! manager and the HTTP layer. Wire names are camelCase to match the
//! dashboards that consume the API.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};

pub const MIN_CGPA: f64 = 0.0;
pub const MAX_CGPA: f64 = 10.0;

// ============================================================
// ROLES
// ============================================================

/// Account role. Fixed when the account is created.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Mentor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Mentor => "mentor",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "student" => Some(Role::Student),
            "mentor" => Some(Role::Mentor),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================
// ACCOUNTS
// ============================================================

/// Short reference to another account, embedded in responses that show
/// who wrote or received something.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersonRef {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// Role-scoped profile data.
///
/// `assigned_students` is never stored: it is derived from the students
/// whose `assigned_mentor` points at this account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub cgpa: Option<f64>,
    pub branch: Option<String>,
    pub skills: Vec<String>,
    pub projects: u32,
    pub assigned_mentor: Option<String>,
    pub assigned_students: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub name: String,
    pub email: String,
    pub(crate) role: Role,
    pub profile: Profile,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn role(&self) -> Role {
        self.role
    }

    pub fn person_ref(&self) -> PersonRef {
        PersonRef {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }

    /// Fails with `InvalidRole` unless the account has the expected role.
    pub fn expect_role(&self, role: Role) -> Result<()> {
        if self.role == role {
            Ok(())
        } else {
            Err(TrackerError::InvalidRole(format!(
                "account {} is a {}, expected a {}",
                self.id, self.role, role
            )))
        }
    }
}

/// Skills arrive either as a JSON array or as the comma-separated string
/// the profile form submits.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SkillList {
    List(Vec<String>),
    Csv(String),
}

impl SkillList {
    pub fn into_skills(self) -> Vec<String> {
        match self {
            SkillList::List(items) => normalize_skills(items),
            SkillList::Csv(text) => normalize_skills(text.split(',').map(str::to_string)),
        }
    }
}

impl From<Vec<&str>> for SkillList {
    fn from(items: Vec<&str>) -> Self {
        SkillList::List(items.into_iter().map(str::to_string).collect())
    }
}

/// Trims, drops blanks and removes exact duplicates while keeping order.
pub fn normalize_skills<I>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut skills: Vec<String> = Vec::new();
    for item in items {
        let trimmed = item.trim();
        if trimmed.is_empty() || skills.iter().any(|s| s == trimmed) {
            continue;
        }
        skills.push(trimmed.to_string());
    }
    skills
}

/// A numeric form field. HTML forms post numbers as strings, so both `7.5`
/// and `"7.5"` are accepted; a blank string counts as not provided.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumberInput {
    Number(f64),
    Text(String),
}

impl NumberInput {
    pub fn value(&self, field: &str) -> Result<Option<f64>> {
        match self {
            NumberInput::Number(n) => Ok(Some(*n)),
            NumberInput::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Ok(None);
                }
                trimmed.parse::<f64>().map(Some).map_err(|_| {
                    TrackerError::validation(format!("{} must be a number, got '{}'", field, text))
                })
            }
        }
    }

    /// Like `value`, but a blank field is a validation error.
    pub fn required(&self, field: &str) -> Result<f64> {
        self.value(field)?
            .ok_or_else(|| TrackerError::validation(format!("{} is required", field)))
    }

    /// A non-negative whole number.
    pub fn count(&self, field: &str) -> Result<Option<u32>> {
        let Some(n) = self.value(field)? else {
            return Ok(None);
        };
        if !n.is_finite() || n < 0.0 || n.fract() != 0.0 || n > f64::from(u32::MAX) {
            return Err(TrackerError::validation(format!(
                "{} must be a non-negative whole number, got {}",
                field, n
            )));
        }
        Ok(Some(n as u32))
    }
}

impl From<f64> for NumberInput {
    fn from(n: f64) -> Self {
        NumberInput::Number(n)
    }
}

impl From<u32> for NumberInput {
    fn from(n: u32) -> Self {
        NumberInput::Number(f64::from(n))
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub cgpa: Option<NumberInput>,
    pub branch: Option<String>,
    pub skills: Option<SkillList>,
    pub projects: Option<NumberInput>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub profile: Option<ProfileUpdate>,
}

impl NewAccount {
    pub fn new(name: &str, email: &str, role: Role) -> Self {
        Self {
            name: name.to_string(),
            email: email.to_string(),
            role,
            profile: None,
        }
    }

    pub fn with_profile(mut self, profile: ProfileUpdate) -> Self {
        self.profile = Some(profile);
        self
    }
}

pub fn validate_cgpa(value: f64, field: &str) -> Result<()> {
    if !value.is_finite() || !(MIN_CGPA..=MAX_CGPA).contains(&value) {
        return Err(TrackerError::validation(format!(
            "{} must be between {} and {}, got {}",
            field, MIN_CGPA, MAX_CGPA, value
        )));
    }
    Ok(())
}

pub fn require_text(value: &str, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TrackerError::validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

// ============================================================
// COMPANIES
// ============================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: String,
    pub name: String,
    pub ctc: f64,
    pub location: String,
    #[serde(rename = "minCGPA")]
    pub min_cgpa: f64,
    pub required_skills: Vec<String>,
    pub is_active: bool,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyInput {
    pub name: String,
    pub ctc: NumberInput,
    pub location: String,
    #[serde(rename = "minCGPA")]
    pub min_cgpa: NumberInput,
    #[serde(default)]
    pub required_skills: Option<SkillList>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub description: Option<String>,
}

// ============================================================
// PROGRESS
// ============================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Certification {
    pub id: String,
    pub name: String,
    pub issuer: String,
    pub date_obtained: NaiveDate,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCertification {
    pub name: String,
    pub issuer: String,
    /// `YYYY-MM-DD` or a full RFC 3339 timestamp.
    pub date_obtained: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub student_id: String,
    pub problems_solved: u32,
    pub hours_practiced: f64,
    pub mock_interviews: u32,
    pub certifications: Vec<Certification>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProgressRecord {
    /// All-zero record shown for students who never saved progress.
    pub fn empty(student_id: &str) -> Self {
        Self {
            id: None,
            student_id: student_id.to_string(),
            problems_solved: 0,
            hours_practiced: 0.0,
            mock_interviews: 0,
            certifications: Vec::new(),
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ProgressCounters {
    pub problems_solved: Option<NumberInput>,
    pub hours_practiced: Option<NumberInput>,
    pub mock_interviews: Option<NumberInput>,
}

// ============================================================
// FEEDBACK
// ============================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackCategory {
    Technical,
    Interview,
    General,
    Improvement,
}

impl FeedbackCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackCategory::Technical => "technical",
            FeedbackCategory::Interview => "interview",
            FeedbackCategory::General => "general",
            FeedbackCategory::Improvement => "improvement",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "technical" => Some(FeedbackCategory::Technical),
            "interview" => Some(FeedbackCategory::Interview),
            "general" => Some(FeedbackCategory::General),
            "improvement" => Some(FeedbackCategory::Improvement),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: String,
    pub mentor: PersonRef,
    pub student: PersonRef,
    pub message: String,
    pub category: FeedbackCategory,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFeedback {
    #[serde(alias = "student")]
    pub student_id: String,
    pub message: String,
    /// Parsed against `FeedbackCategory`; unknown values are a validation error.
    pub category: String,
}

// ============================================================
// ROSTER
// ============================================================

/// A student on a mentor's roster together with their progress.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RosterEntry {
    #[serde(flatten)]
    pub student: Account,
    pub progress: ProgressRecord,
}
