//! # Commitment Registry Service
//!
//! Tracks each investor's commitment to a fund. The commitment amount is
//! fixed at creation; everything proportional in the ledger flows from the
//! registry's view of a fund's commitments.
//!
//! ## Ownership Renormalization
//!
//! Adding a commitment changes every other investor's ownership percentage
//! in that fund:
//!
//! ```text
//! A commits 60, B commits 40      -> A 60%, B 40%
//! C commits 100                   -> A 30%, B 20%, C 50%
//! ```
//!
//! The renormalization happens inside the same transaction that inserts the
//! new commitment, under the per-fund lock, so readers never observe a fund
//! whose percentages do not sum to ~1.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::{queries, CommitmentRecord, Database};
use super::allocation;
use super::LedgerError;

/// Registry of fund/investor commitments.
#[derive(Clone)]
pub struct CommitmentRegistry {
    db: Database,
}

impl CommitmentRegistry {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Add an investor's commitment to a fund.
    ///
    /// Recomputes ownership percentages for every commitment in the fund as
    /// a side effect, inside one transaction.
    ///
    /// ## Errors
    ///
    /// * `Validation` - amount is not positive
    /// * `NotFound` - fund or investor id does not resolve
    /// * `DuplicateCommitment` - the (fund, investor) pair already exists
    pub async fn add_commitment(
        &self,
        fund_id: Uuid,
        investor_id: Uuid,
        amount: Decimal,
        commitment_date: NaiveDate,
    ) -> Result<CommitmentRecord, LedgerError> {
        debug!("Adding commitment: fund={} investor={} amount={}", fund_id, investor_id, amount);

        if amount <= Decimal::ZERO {
            return Err(LedgerError::Validation(format!(
                "commitment amount must be positive, got {}",
                amount
            )));
        }

        let mut client = self.db.pool().get().await
            .map_err(|e| LedgerError::Database(crate::db::DatabaseError::ConnectionError(e.to_string())))?;
        let tx = client.transaction().await?;

        // Per-fund serialization point; also resolves the fund id.
        queries::lock_fund_tx(&tx, fund_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("Fund not found: {}", fund_id)))?;

        if !queries::investor_exists_tx(&tx, investor_id).await? {
            return Err(LedgerError::NotFound(format!("Investor not found: {}", investor_id)));
        }

        if queries::find_commitment_tx(&tx, fund_id, investor_id).await?.is_some() {
            return Err(LedgerError::DuplicateCommitment { fund_id, investor_id });
        }

        let now = Utc::now();
        let commitment = CommitmentRecord {
            id: Uuid::new_v4(),
            fund_id,
            investor_id,
            amount,
            commitment_date,
            called_to_date: Decimal::ZERO,
            distributed_to_date: Decimal::ZERO,
            nav_estimate: Decimal::ZERO,
            ownership_pct: Decimal::ZERO, // set by the renormalization below
            created_at: now,
            updated_at: now,
        };
        queries::insert_commitment_tx(&tx, &commitment).await?;

        // Renormalize the whole fund, new commitment included.
        let commitments = queries::list_fund_commitments_tx(&tx, fund_id).await?;
        let amounts: Vec<Decimal> = commitments.iter().map(|c| c.amount).collect();
        let ownership = allocation::recompute_ownership(&amounts);

        let mut created = commitment;
        for (c, pct) in commitments.iter().zip(ownership) {
            queries::update_ownership_tx(&tx, c.id, pct).await?;
            if c.id == created.id {
                created.ownership_pct = pct;
            }
        }

        tx.commit().await?;

        info!(
            "Commitment added: fund={} investor={} amount={} ownership={}",
            fund_id, investor_id, amount, created.ownership_pct
        );
        Ok(created)
    }

    /// Get a fund's commitments in stable order (commitment date, then id).
    ///
    /// Returns `NotFound` if the fund id does not resolve, to distinguish a
    /// missing fund from a fund with no investors yet.
    pub async fn get_commitments(&self, fund_id: Uuid) -> Result<Vec<CommitmentRecord>, LedgerError> {
        queries::get_fund(self.db.pool(), fund_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("Fund not found: {}", fund_id)))?;

        Ok(queries::list_fund_commitments(self.db.pool(), fund_id).await?)
    }

    /// Sum of all commitment amounts for a fund; the denominator for
    /// proportional allocation.
    pub async fn total_committed(&self, fund_id: Uuid) -> Result<Decimal, LedgerError> {
        let commitments = self.get_commitments(fund_id).await?;
        Ok(commitments.iter().map(|c| c.amount).sum())
    }
}
