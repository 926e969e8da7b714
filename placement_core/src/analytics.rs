//! Analytics Aggregator
//!
//! Read-only rollups for the admin and mentor dashboards.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::accounts;
use crate::assignment;
use crate::companies;
use crate::error::Result;
use crate::feedback;
use crate::store::Store;
use crate::types::{Account, Role};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminAnalytics {
    pub total_students: u64,
    pub total_mentors: u64,
    pub total_companies: u64,
    pub active_companies: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MentorAnalytics {
    pub total_students: u64,
    #[serde(rename = "avgCGPA")]
    pub avg_cgpa: f64,
    pub skills_distribution: BTreeMap<String, u64>,
    pub feedback_count: u64,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Roster-only part of the mentor report. `feedback_count` is left at 0.
pub fn summarize_roster(students: &[Account]) -> MentorAnalytics {
    let mut skills_distribution = BTreeMap::new();
    for skill in students.iter().flat_map(|s| s.profile.skills.iter()) {
        *skills_distribution.entry(skill.clone()).or_insert(0) += 1;
    }

    let avg_cgpa = if students.is_empty() {
        0.0
    } else {
        let total: f64 = students.iter().map(|s| s.profile.cgpa.unwrap_or(0.0)).sum();
        round2(total / students.len() as f64)
    };

    MentorAnalytics {
        total_students: students.len() as u64,
        avg_cgpa,
        skills_distribution,
        feedback_count: 0,
    }
}

pub fn admin_analytics(store: &Store) -> Result<AdminAnalytics> {
    store.with_conn(|conn| {
        let company_counts = companies::counts_in(conn)?;
        Ok(AdminAnalytics {
            total_students: accounts::count_role(conn, Role::Student)?,
            total_mentors: accounts::count_role(conn, Role::Mentor)?,
            total_companies: company_counts.total,
            active_companies: company_counts.active,
        })
    })
}

pub fn mentor_analytics(store: &Store, mentor_id: &str) -> Result<MentorAnalytics> {
    store.with_conn(|conn| {
        accounts::require(conn, mentor_id)?.expect_role(Role::Mentor)?;
        let students = assignment::roster_students(conn, mentor_id)?;
        let mut report = summarize_roster(&students);
        report.feedback_count = feedback::count_for_mentor_in(conn, mentor_id)?;
        Ok(report)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::create_account;
    use crate::assignment::assign;
    use crate::companies::create_company;
    use crate::types::{CompanyInput, NewAccount, NumberInput, Profile, ProfileUpdate, SkillList};
    use chrono::Utc;

    fn student(cgpa: Option<f64>, skills: &[&str]) -> Account {
        Account {
            id: "s".to_string(),
            name: "S".to_string(),
            email: "s@test.com".to_string(),
            role: Role::Student,
            profile: Profile {
                cgpa,
                skills: skills.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            },
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_empty_roster_has_zero_average() {
        let report = summarize_roster(&[]);
        assert_eq!(report.total_students, 0);
        assert_eq!(report.avg_cgpa, 0.0);
        assert!(report.skills_distribution.is_empty());
    }

    #[test]
    fn test_average_rounds_and_counts_missing_as_zero() {
        let roster = vec![
            student(Some(8.5), &["React", "Node.js"]),
            student(Some(7.8), &["React"]),
            student(None, &[]),
        ];
        let report = summarize_roster(&roster);
        assert_eq!(report.total_students, 3);
        assert_eq!(report.avg_cgpa, 5.43);
        assert_eq!(report.skills_distribution.get("React"), Some(&2));
        assert_eq!(report.skills_distribution.get("Node.js"), Some(&1));
    }

    #[test]
    fn test_mentor_analytics_reads_roster() {
        let store = Store::in_memory().unwrap();
        let mentor =
            create_account(&store, NewAccount::new("M", "m@test.com", Role::Mentor)).unwrap();
        for (email, cgpa) in [("a@test.com", 8.0), ("b@test.com", 9.0)] {
            let s = create_account(
                &store,
                NewAccount::new(email, email, Role::Student).with_profile(ProfileUpdate {
                    cgpa: Some(NumberInput::Number(cgpa)),
                    skills: Some(SkillList::from(vec!["Python"])),
                    ..Default::default()
                }),
            )
            .unwrap();
            assign(&store, &s.id, &mentor.id).unwrap();
        }

        let report = mentor_analytics(&store, &mentor.id).unwrap();
        assert_eq!(report.total_students, 2);
        assert_eq!(report.avg_cgpa, 8.5);
        assert_eq!(report.skills_distribution.get("Python"), Some(&2));
        assert_eq!(report.feedback_count, 0);
    }

    #[test]
    fn test_mentor_analytics_with_no_students() {
        let store = Store::in_memory().unwrap();
        let mentor =
            create_account(&store, NewAccount::new("M", "m@test.com", Role::Mentor)).unwrap();

        let report = mentor_analytics(&store, &mentor.id).unwrap();
        assert_eq!(report.total_students, 0);
        assert_eq!(report.avg_cgpa, 0.0);
        assert!(report.skills_distribution.is_empty());
        assert_eq!(report.feedback_count, 0);
    }

    #[test]
    fn test_admin_analytics_counts_companies() {
        let store = Store::in_memory().unwrap();
        create_account(&store, NewAccount::new("S", "s@test.com", Role::Student)).unwrap();
        create_account(&store, NewAccount::new("M", "m@test.com", Role::Mentor)).unwrap();
        for active in [true, false] {
            create_company(
                &store,
                CompanyInput {
                    name: "Co".to_string(),
                    ctc: NumberInput::Number(5.0),
                    location: "Pune".to_string(),
                    min_cgpa: NumberInput::Number(6.0),
                    required_skills: None,
                    is_active: Some(active),
                    description: None,
                },
            )
            .unwrap();
        }

        let report = admin_analytics(&store).unwrap();
        assert_eq!(
            report,
            AdminAnalytics {
                total_students: 1,
                total_mentors: 1,
                total_companies: 2,
                active_companies: 1,
            }
        );
    }

    #[test]
    fn test_wire_names() {
        let json = serde_json::to_value(summarize_roster(&[])).unwrap();
        assert!(json.get("avgCGPA").is_some());
        assert!(json.get("skillsDistribution").is_some());
    }
}
