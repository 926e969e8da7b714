//! Server configuration read once from the environment.

use std::env;
use std::fmt::Display;
use std::str::FromStr;

use placement_core::Store;

/// Origins the dev frontends run on; `FRONTEND_URL` is added to these.
const DEV_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://localhost:5173"];

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// File path of the SQLite database, or `:memory:`.
    pub database_path: String,
    pub seed_demo_data: bool,
    pub allowed_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Self {
        let mut allowed_origins: Vec<String> = DEV_ORIGINS.iter().map(|o| o.to_string()).collect();
        match env::var("FRONTEND_URL") {
            Ok(url) if !url.trim().is_empty() => allowed_origins.push(url.trim().to_string()),
            _ => log::info!("[config] FRONTEND_URL not set, allowing dev origins only"),
        }

        Self {
            host: load("HOST", "127.0.0.1".to_string()),
            port: load("PORT", 5000),
            database_path: load("DATABASE_PATH", "placement_tracker.db".to_string()),
            seed_demo_data: load("SEED_DEMO_DATA", true),
            allowed_origins,
        }
    }

    /// Settings for tests: in-memory database, nothing seeded.
    pub fn for_tests() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            database_path: ":memory:".to_string(),
            seed_demo_data: false,
            allowed_origins: DEV_ORIGINS.iter().map(|o| o.to_string()).collect(),
        }
    }

    pub fn open_store(&self) -> placement_core::Result<Store> {
        if self.database_path == ":memory:" {
            log::warn!("[config] Using an in-memory database; data is lost on exit");
            Store::in_memory()
        } else {
            Store::open(&self.database_path)
        }
    }
}

fn load<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|e| {
            log::warn!("[config] Invalid {} value '{}': {}, using default: {}", key, raw, e, default);
            default
        }),
        Err(_) => {
            log::info!("[config] {} not set, using default: {}", key, default);
            default
        }
    }
}
