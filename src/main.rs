//! # Fund Ledger Backend Service
//!
//! This is the main entry point for the backend service that manages
//! the capital account ledger. It provides:
//!
//! - REST API for fund administration (commitments, calls, distributions)
//! - Exact-sum pro-rata allocation across investor commitments
//! - Idempotent settlement and fund-level roll-ups
//! - Database storage for the full ledger history
//!
//! ## Quick Start
//!
//! 1. Set up PostgreSQL and create the database
//! 2. Copy `.env.example` to `.env` and configure
//! 3. Start the server: `cargo run` (migrations run at startup)
//! 4. Optionally load demo data: `cargo run --bin seed`
//!
//! ## Environment Variables
//!
//! See `.env.example` for all required configuration.

use std::sync::Arc;

use actix_web::{middleware, web, App, HttpServer};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use fund_ledger_backend::api;
use fund_ledger_backend::config::AppConfig;
use fund_ledger_backend::db::Database;
use fund_ledger_backend::AppState;

/// Main entry point for the backend service.
///
/// This function:
/// 1. Loads configuration from environment
/// 2. Initializes database connection and runs migrations
/// 3. Wires up the service layer
/// 4. Launches the HTTP server
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // =========================================
    // STEP 1: Initialize Logging
    // =========================================
    // Set up structured logging with tracing
    // This gives us nice formatted logs with timestamps
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    info!("🚀 Starting Fund Ledger Backend Service");

    // =========================================
    // STEP 2: Load Configuration
    // =========================================
    // Load from environment variables (from .env file)
    dotenvy::dotenv().ok(); // It's okay if .env doesn't exist

    let config = AppConfig::from_env()
        .expect("Failed to load configuration");

    info!("📋 Configuration loaded");
    info!("   Server: {}:{}", config.server_host, config.server_port);

    // =========================================
    // STEP 3: Initialize Database
    // =========================================
    let db = Database::connect(&config.database_url, config.db_max_connections)
        .await
        .expect("Failed to connect to database");

    info!("🗄️  Database connected");

    // Run migrations to ensure schema is up to date
    db.run_migrations()
        .await
        .expect("Failed to run migrations");

    info!("📦 Database migrations complete");

    // =========================================
    // STEP 4: Initialize Services
    // =========================================
    let app_state = Arc::new(AppState::new(db, config.clone()));

    info!("🔧 Services initialized");

    // =========================================
    // STEP 5: Start HTTP Server
    // =========================================
    let server_host = config.server_host.clone();
    let server_port = config.server_port;

    info!("🌐 Starting HTTP server on {}:{}", server_host, server_port);

    HttpServer::new(move || {
        App::new()
            // Attach shared application state
            .app_data(web::Data::new(app_state.clone()))

            // Add logging middleware
            .wrap(middleware::Logger::default())

            // Allow browser-based admin tools during development
            .wrap(actix_cors::Cors::permissive())

            // Configure API routes
            .configure(api::configure_routes)
    })
    .bind(format!("{}:{}", server_host, server_port))?
    .run()
    .await
}
