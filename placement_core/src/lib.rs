// Domain core for the placement tracker: accounts, mentor assignment,
// company eligibility, progress, feedback and dashboard analytics over SQLite.

// Storage and shared types
pub mod error;
pub mod store;
pub mod types;

// Directories
pub mod accounts;
pub mod companies;

// Workflows
pub mod assignment;
pub mod eligibility;
pub mod feedback;
pub mod progress;

// Read side
pub mod analytics;
pub mod seed;

pub use error::{Result, TrackerError};
pub use store::Store;
pub use types::*;

pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
