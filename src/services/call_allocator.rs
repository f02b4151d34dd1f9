//! # Call Allocator Service
//!
//! Turns a fund-level capital call amount into one `CapitalCall` plus one
//! detail per commitment, allocated pro-rata to commitment share with the
//! exact-sum residual rule from [`super::allocation`].
//!
//! ## Flow
//!
//! ```text
//! 1. Begin transaction, lock the fund row (per-fund serialization)
//!                ↓
//! 2. Load the fund's commitments in registry order, net of in-flight calls
//!                ↓
//! 3. plan_capital_call() - pure validation + allocation, no writes yet
//!                ↓
//! 4. Insert the call and all of its details
//!                ↓
//! 5. Commit - the call becomes visible as one atomic unit
//! ```
//!
//! Any planning error aborts before step 4, so failure never leaves a
//! partial call visible to readers.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::{
    queries, CallStatus, CapitalCallDetailRecord, CapitalCallRecord, Database, DetailStatus,
};
use crate::utils::currency_scale;
use super::allocation::{self, CommitmentPosition};
use super::LedgerError;

/// A created capital call together with its details, returned to the caller
/// for display.
#[derive(Debug, Clone)]
pub struct CreatedCall {
    pub call: CapitalCallRecord,
    pub details: Vec<CapitalCallDetailRecord>,
}

/// Allocates fund-level capital calls across a fund's investor base.
#[derive(Clone)]
pub struct CallAllocator {
    db: Database,
}

impl CallAllocator {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create a capital call and its per-investor details atomically.
    ///
    /// ## Arguments
    ///
    /// * `fund_id` - The fund issuing the call
    /// * `total` - Fund-level requested amount (> 0, at currency precision)
    /// * `call_date` / `due_date` - due date must not precede the call date
    ///
    /// ## Errors
    ///
    /// * `NotFound` - fund id does not resolve
    /// * `Validation` - bad amount/dates, or the fund has no commitments
    /// * `OverCommitmentExceeded` - some investor's share would breach their
    ///   remaining uncalled commitment, net of earlier calls not yet settled
    pub async fn create_call(
        &self,
        fund_id: Uuid,
        total: Decimal,
        call_date: NaiveDate,
        due_date: NaiveDate,
    ) -> Result<CreatedCall, LedgerError> {
        debug!("Creating capital call: fund={} total={}", fund_id, total);

        if due_date < call_date {
            return Err(LedgerError::Validation(format!(
                "due date {} precedes call date {}",
                due_date, call_date
            )));
        }

        let mut client = self.db.pool().get().await
            .map_err(|e| LedgerError::Database(crate::db::DatabaseError::ConnectionError(e.to_string())))?;
        let tx = client.transaction().await?;

        let fund = queries::lock_fund_tx(&tx, fund_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("Fund not found: {}", fund_id)))?;
        let scale = currency_scale(&fund.currency);

        let commitments = queries::list_fund_commitments_tx(&tx, fund_id).await?;

        // Headroom must account for calls still in flight: details that have
        // not yet settled into called_to_date still consume commitment.
        let outstanding = queries::outstanding_called_by_commitment_tx(&tx, fund_id).await?;
        let positions: Vec<CommitmentPosition> = commitments
            .iter()
            .map(|c| {
                let mut p = CommitmentPosition::from(c);
                if let Some(open) = outstanding.get(&c.id) {
                    p.callable -= open;
                }
                p
            })
            .collect();

        // Full validation pass before any persistence.
        let plan = allocation::plan_capital_call(&positions, total, scale)?;

        let now = Utc::now();
        let call = CapitalCallRecord {
            id: Uuid::new_v4(),
            fund_id,
            call_number: queries::next_call_number_tx(&tx, fund_id).await?,
            call_date,
            due_date,
            total_amount: total,
            received_amount: Decimal::ZERO,
            status: CallStatus::Sent,
            created_at: now,
            updated_at: now,
        };
        queries::insert_capital_call_tx(&tx, &call).await?;

        let mut details = Vec::with_capacity(plan.len());
        for share in plan {
            let detail = CapitalCallDetailRecord {
                id: Uuid::new_v4(),
                call_id: call.id,
                commitment_id: share.commitment_id,
                investor_id: share.investor_id,
                called_amount: share.amount,
                received_amount: None,
                received_date: None,
                settled_at: None,
                status: DetailStatus::Pending,
                created_at: now,
                updated_at: now,
            };
            queries::insert_call_detail_tx(&tx, &detail).await?;
            details.push(detail);
        }

        tx.commit().await?;

        info!(
            "Capital call #{} created for fund {}: total={} across {} investors",
            call.call_number,
            fund_id,
            total,
            details.len()
        );
        Ok(CreatedCall { call, details })
    }
}
