//! Demo data for a fresh database.

use crate::accounts;
use crate::companies;
use crate::error::Result;
use crate::store::Store;
use crate::types::{CompanyInput, NewAccount, ProfileUpdate, Role, SkillList};

fn student_profile(cgpa: f64, branch: &str, skills: Vec<&str>, projects: u32) -> ProfileUpdate {
    ProfileUpdate {
        cgpa: Some(cgpa.into()),
        branch: Some(branch.to_string()),
        skills: Some(SkillList::from(skills)),
        projects: Some(projects.into()),
    }
}

fn company(name: &str, ctc: f64, location: &str, min_cgpa: f64, skills: Vec<&str>, about: &str) -> CompanyInput {
    CompanyInput {
        name: name.to_string(),
        ctc: ctc.into(),
        location: location.to_string(),
        min_cgpa: min_cgpa.into(),
        required_skills: Some(SkillList::from(skills)),
        is_active: Some(true),
        description: Some(about.to_string()),
    }
}

/// Insert the demo accounts and companies. Returns `false` without
/// touching anything when the store already holds accounts. The check and
/// the inserts share one transaction, so a failed seed leaves nothing behind.
pub fn seed_demo_data(store: &Store) -> Result<bool> {
    let seeded = store.with_transaction(|tx| {
        if accounts::count_all(tx)? > 0 {
            return Ok(false);
        }

        let demo_accounts = [
            NewAccount::new("Admin User", "admin@test.com", Role::Admin),
            NewAccount::new("Test Mentor", "mentor@test.com", Role::Mentor),
            NewAccount::new("Test Student 1", "student1@test.com", Role::Student).with_profile(
                student_profile(8.5, "Computer Science", vec!["JavaScript", "React", "Node.js"], 3),
            ),
            NewAccount::new("Test Student 2", "student2@test.com", Role::Student).with_profile(
                student_profile(7.8, "Information Technology", vec!["Python", "Django", "MySQL"], 2),
            ),
        ];
        for account in demo_accounts {
            accounts::insert_account(tx, account)?;
        }

        let demo_companies = [
            company("Tech Corp", 12.0, "Bangalore", 7.0, vec!["JavaScript", "React"], "Leading tech company"),
            company(
                "Software Solutions",
                8.0,
                "Pune",
                6.5,
                vec!["Python", "Django"],
                "Software development company",
            ),
        ];
        for input in demo_companies {
            companies::insert_company(tx, input)?;
        }
        Ok(true)
    })?;

    if seeded {
        log::info!("[seed] Demo data seeded");
    } else {
        log::info!("[seed] Data already exists, skipping seed");
    }
    Ok(seeded)
}
