//! Placement Tracker Backend
//!
//! REST surface over `placement_core`:
//! - Admin assignment of students to mentors
//! - Mentor rosters, feedback and analytics
//! - Student profiles, progress and eligible companies

pub mod api;
pub mod auth;
pub mod config;

pub use api::*;
pub use config::Config;
