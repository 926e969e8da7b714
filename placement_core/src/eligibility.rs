//! Eligibility Matcher
//!
//! A company is open to a student when it is active, the student's CGPA
//! (missing counts as 0) meets `minCGPA`, and at least one required skill
//! appears case-insensitively inside one of the student's skills.

use crate::accounts;
use crate::companies;
use crate::error::Result;
use crate::store::Store;
use crate::types::{Company, Profile, Role};

fn skills_overlap(student_skills: &[String], required_skills: &[String]) -> bool {
    let student_skills: Vec<String> = student_skills.iter().map(|s| s.to_lowercase()).collect();
    required_skills.iter().any(|required| {
        let required = required.to_lowercase();
        student_skills.iter().any(|skill| skill.contains(&required))
    })
}

pub fn is_eligible(profile: &Profile, company: &Company) -> bool {
    if !company.is_active || profile.skills.is_empty() {
        return false;
    }
    let cgpa = profile.cgpa.unwrap_or(0.0);
    cgpa >= company.min_cgpa && skills_overlap(&profile.skills, &company.required_skills)
}

/// Filter `companies` down to the ones open to `profile`, keeping order.
pub fn eligible_companies(profile: &Profile, companies: &[Company]) -> Vec<Company> {
    companies
        .iter()
        .filter(|company| is_eligible(profile, company))
        .cloned()
        .collect()
}

/// Companies the given student currently qualifies for.
pub fn eligible_for_student(store: &Store, student_id: &str) -> Result<Vec<Company>> {
    store.with_conn(|conn| {
        let student = accounts::require(conn, student_id)?;
        student.expect_role(Role::Student)?;
        let companies = companies::list_in(conn)?;
        Ok(eligible_companies(&student.profile, &companies))
    })
}
