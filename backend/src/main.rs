//! Placement Tracker Backend - Main Entry Point
//!
//! Reads configuration from the environment and starts the API server.

use placement_backend::{api::run_server, Config};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logging
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    println!("╔════════════════════════════════════════════════╗");
    println!("║   Placement Tracker - Mentor & Placement API   ║");
    println!("║   Assign → Track → Match                       ║");
    println!("╚════════════════════════════════════════════════╝");
    println!();

    let config = Config::from_env();
    run_server(config).await
}
