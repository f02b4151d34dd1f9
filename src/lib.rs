//! # Fund Ledger Backend
//!
//! Capital account ledger for closed-end fund administration. It tracks
//! investor commitments, allocates capital calls and distributions
//! pro-rata with exact-sum rounding, and rolls activity up into fund-
//! and investor-level positions.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      BACKEND SERVICE                         │
//! │                                                              │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │                    REST API (Actix)                  │   │
//! │  │  /funds  /investors  /capital-calls  /distributions  │   │
//! │  └──────────────────────────┬───────────────────────────┘   │
//! │                             │                                │
//! │  ┌──────────────────────────┴───────────────────────────┐   │
//! │  │                    SERVICE LAYER                      │   │
//! │  │ ┌────────────────┐ ┌───────────────┐ ┌─────────────┐ │   │
//! │  │ │ Commitment     │ │ Call /        │ │ Ledger      │ │   │
//! │  │ │ Registry       │ │ Distribution  │ │ Aggregator  │ │   │
//! │  │ │                │ │ Allocators    │ │             │ │   │
//! │  │ └────────────────┘ └───────────────┘ └─────────────┘ │   │
//! │  └──────────────────────────┬───────────────────────────┘   │
//! │                             │                                │
//! │                      ┌──────┴──────┐                         │
//! │                      │  PostgreSQL │                         │
//! │                      └─────────────┘                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod utils;

use config::AppConfig;
use db::Database;
use services::{CallAllocator, CommitmentRegistry, DistributionAllocator, LedgerAggregator};

/// Application state shared across all handlers.
///
/// This struct contains all the shared resources that API handlers
/// need access to. It is wrapped in an `Arc` so every Actix worker
/// thread shares the same connection pool and services.
pub struct AppState {
    /// Database connection pool for PostgreSQL
    pub db: Database,

    /// Application configuration
    pub config: AppConfig,

    /// Commitment registry service
    pub registry: CommitmentRegistry,

    /// Capital call allocation service
    pub call_allocator: CallAllocator,

    /// Distribution allocation service
    pub distribution_allocator: DistributionAllocator,

    /// Settlement and roll-up service
    pub aggregator: LedgerAggregator,
}

impl AppState {
    /// Build the full service stack on top of one database pool.
    pub fn new(db: Database, config: AppConfig) -> Self {
        Self {
            registry: CommitmentRegistry::new(db.clone()),
            call_allocator: CallAllocator::new(db.clone()),
            distribution_allocator: DistributionAllocator::new(db.clone()),
            aggregator: LedgerAggregator::new(db.clone()),
            db,
            config,
        }
    }
}
