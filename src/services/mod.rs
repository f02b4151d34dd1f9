//! # Services Module
//!
//! This module contains the ledger engine itself. Each service handles one
//! responsibility; all of them share the [`LedgerError`] taxonomy.
//!
//! ## Services Overview
//!
//! | Service | Responsibility |
//! |---------|---------------|
//! | `CommitmentRegistry` | Commitments and ownership renormalization |
//! | `CallAllocator` | Capital call creation with pro-rata allocation |
//! | `DistributionAllocator` | Distribution creation with withholding |
//! | `LedgerAggregator` | Payments, idempotent settlement, fund roll-ups |
//!
//! ## Service Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        SERVICES LAYER                            │
//! │                                                                  │
//! │  ┌──────────────────┐         ┌──────────────────────────────┐  │
//! │  │CommitmentRegistry│         │       LedgerAggregator       │  │
//! │  │ • add_commitment │         │ • record_*_payment           │  │
//! │  │ • ownership pcts │         │ • on_call_settled            │  │
//! │  └──────────────────┘         │ • on_distribution_paid       │  │
//! │            │                  │ • fund_summary               │  │
//! │            ▼                  └──────────────────────────────┘  │
//! │  ┌──────────────┐  ┌──────────────────────┐                    │
//! │  │CallAllocator │  │DistributionAllocator │                    │
//! │  └──────┬───────┘  └──────────┬───────────┘                    │
//! │         └──────────┬──────────┘                                 │
//! │                    ▼                                            │
//! │        ┌───────────────────────┐                                │
//! │        │ allocation (pure fns) │  exact-sum pro-rata split      │
//! │        └───────────────────────┘                                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All allocation errors are detected by the pure planning functions before
//! any row is written, so a failed operation never leaves partial state.

pub mod allocation;
pub mod call_allocator;
pub mod commitment_registry;
pub mod distribution_allocator;
pub mod ledger_aggregator;

pub use call_allocator::CallAllocator;
pub use commitment_registry::CommitmentRegistry;
pub use distribution_allocator::DistributionAllocator;
pub use ledger_aggregator::LedgerAggregator;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::db::DatabaseError;

/// Errors surfaced by the ledger engine.
///
/// The engine performs no retries itself; retries, if any, belong to the
/// caller or transport layer.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The (fund, investor) pair already has a commitment.
    #[error("Commitment already exists for investor {investor_id} in fund {fund_id}")]
    DuplicateCommitment { fund_id: Uuid, investor_id: Uuid },

    /// A call would exceed one investor's remaining uncalled commitment.
    /// Enforced per investor, not just at the fund level.
    #[error("Call exceeds remaining commitment for investor {investor_id}: requested {requested}, available {available}")]
    OverCommitmentExceeded {
        investor_id: Uuid,
        requested: Decimal,
        available: Decimal,
    },

    /// The computed allocation is inconsistent with the fund's tracked state
    /// (e.g. distributing more than the aggregate NAV estimate).
    #[error("Invalid allocation: {0}")]
    InvalidAllocation(String),

    /// Attempt to mutate a detail under a completed parent record.
    #[error("Record is immutable: {0}")]
    ImmutableRecord(String),

    /// A referenced fund/investor/call/distribution id does not resolve.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed input: non-positive amounts, bad dates, out-of-range rates.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl From<tokio_postgres::Error> for LedgerError {
    fn from(e: tokio_postgres::Error) -> Self {
        LedgerError::Database(DatabaseError::QueryError(e))
    }
}

impl LedgerError {
    /// Stable machine-readable error code for the API envelope.
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::DuplicateCommitment { .. } => "DUPLICATE_COMMITMENT",
            LedgerError::OverCommitmentExceeded { .. } => "OVER_COMMITMENT_EXCEEDED",
            LedgerError::InvalidAllocation(_) => "INVALID_ALLOCATION",
            LedgerError::ImmutableRecord(_) => "IMMUTABLE_RECORD",
            LedgerError::NotFound(_) => "NOT_FOUND",
            LedgerError::Validation(_) => "VALIDATION_ERROR",
            LedgerError::Database(_) => "DATABASE_ERROR",
        }
    }
}
