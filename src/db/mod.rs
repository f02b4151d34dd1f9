//! # Database Module
//!
//! This module handles all database operations for the fund ledger backend.
//! We use PostgreSQL for storing:
//!
//! - Fund and investor master data
//! - Commitments (the fund/investor relationship with running totals)
//! - Capital calls and their per-investor details
//! - Distributions and their per-investor details
//!
//! ## Why PostgreSQL?
//!
//! The ledger's invariants are multi-row invariants: a capital call and all
//! of its details must appear together or not at all, and two concurrent
//! calls against the same fund must not both consume the same uncalled
//! headroom. Both map directly onto database transactions and row locks.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      DATABASE LAYER                              │
//! │                                                                  │
//! │  ┌──────────────────────────────────────────────────────────┐   │
//! │  │                   Connection Pool                         │   │
//! │  │                  (deadpool-postgres)                      │   │
//! │  └──────────────────────────────────────────────────────────┘   │
//! │                              │                                   │
//! │     ┌──────────┬─────────────┼─────────────┬──────────────┐     │
//! │     ▼          ▼             ▼             ▼              ▼     │
//! │  ┌───────┐ ┌─────────┐ ┌───────────┐ ┌─────────────┐ ┌───────┐ │
//! │  │ funds │ │investors│ │commitments│ │capital_calls│ │distri-│ │
//! │  │       │ │         │ │           │ │  + details  │ │butions│ │
//! │  └───────┘ └─────────┘ └───────────┘ └─────────────┘ └───────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod models;
pub mod queries;

use deadpool_postgres::{Config, Pool, Runtime};
use thiserror::Error;
use tokio_postgres::{Config as TokioConfig, NoTls};
use tracing::{debug, info, warn};

/// Database-related errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to connect to the database
    #[error("Database connection failed: {0}")]
    ConnectionError(String),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryError(#[from] tokio_postgres::Error),

    /// Migration failed
    #[error("Migration failed: {0}")]
    MigrationError(String),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// A stored value could not be decoded into its typed form
    #[error("Corrupt column value: {0}")]
    DecodeError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

/// Database connection wrapper.
///
/// Wraps the deadpool-postgres connection pool and provides connection
/// setup and schema migration.
///
/// ## Usage
///
/// ```rust,ignore
/// let db = Database::connect("postgres://...", 10).await?;
/// db.run_migrations().await?;
/// let fund = queries::get_fund(db.pool(), fund_id).await?;
/// ```
#[derive(Clone)]
pub struct Database {
    /// The connection pool
    pool: Pool,
}

impl Database {
    /// Connect to the PostgreSQL database.
    ///
    /// ## Arguments
    ///
    /// * `database_url` - PostgreSQL connection string
    /// * `max_connections` - Pool size
    ///
    /// ## Returns
    ///
    /// * `Ok(Database)` - Connected successfully (verified with `SELECT 1`)
    /// * `Err(DatabaseError)` - Connection failed
    pub async fn connect(database_url: &str, max_connections: usize) -> Result<Self, DatabaseError> {
        info!("Connecting to database...");

        // Parse the connection string using tokio_postgres::Config
        let tokio_config = database_url.parse::<TokioConfig>()
            .map_err(|e| DatabaseError::ConfigError(format!("Invalid database URL: {}", e)))?;

        // Convert to deadpool config
        let mut config = Config::new();

        if let Some(dbname) = tokio_config.get_dbname() {
            config.dbname = Some(dbname.to_string());
        }
        if let Some(user) = tokio_config.get_user() {
            config.user = Some(user.to_string());
        }
        if let Some(password) = tokio_config.get_password() {
            config.password = Some(String::from_utf8_lossy(password).to_string());
        }
        if let Some(host) = tokio_config.get_hosts().first() {
            if let tokio_postgres::config::Host::Tcp(host_str) = host {
                config.host = Some(host_str.clone());
            }
        }
        if let Some(port) = tokio_config.get_ports().first() {
            config.port = Some(*port);
        }

        config.pool = Some(deadpool_postgres::PoolConfig {
            max_size: max_connections,
            ..Default::default()
        });

        let pool = config
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        // Test connection
        let client = pool.get().await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;
        client.query("SELECT 1", &[]).await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        info!("Database connection established");

        Ok(Self { pool })
    }

    /// Run database migrations.
    ///
    /// Migrations are plain SQL scripts located in `migrations/`. The schema
    /// uses `CREATE TABLE IF NOT EXISTS` throughout, so re-running against an
    /// already-migrated database is harmless.
    pub async fn run_migrations(&self) -> Result<(), DatabaseError> {
        info!("Running database migrations...");

        let client = self.pool.get().await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        // Read migration file (support running from the crate root or one up)
        let migration_paths = [
            "migrations/001_initial_schema.sql",
            "../migrations/001_initial_schema.sql",
        ];

        let mut migration_sql = None;
        for path in &migration_paths {
            match std::fs::read_to_string(path) {
                Ok(content) => {
                    info!("Found migration file at: {}", path);
                    migration_sql = Some(content);
                    break;
                }
                Err(e) => debug!("Tried path '{}': {}", path, e),
            }
        }

        let migration_sql = migration_sql.ok_or_else(|| {
            DatabaseError::MigrationError(format!(
                "Could not find migration file. Tried paths: {:?}",
                migration_paths
            ))
        })?;

        match client.batch_execute(&migration_sql).await {
            Ok(_) => {
                info!("Migrations completed successfully");
                Ok(())
            }
            Err(e) => {
                // 42P07 duplicate_table, 42710 duplicate_object
                let is_duplicate = e
                    .code()
                    .map(|c| c.code() == "42P07" || c.code() == "42710")
                    .unwrap_or(false);
                if is_duplicate || e.to_string().contains("already exists") {
                    warn!("Some database objects already exist; treating migrations as applied");
                    Ok(())
                } else {
                    Err(DatabaseError::MigrationError(e.to_string()))
                }
            }
        }
    }

    /// Get a reference to the connection pool.
    ///
    /// Use this when you need direct access to the pool
    /// for custom queries.
    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

// Re-export commonly used items
pub use models::*;
