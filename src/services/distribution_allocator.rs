//! # Distribution Allocator Service
//!
//! Turns a fund-level distribution into one `Distribution` plus one detail
//! per commitment. Allocation is weighted by **current ownership
//! percentage** rather than original commitment share, so investors who
//! joined after earlier events receive their up-to-date proportion.
//!
//! Withholding tax is applied per investor: a default rate covers the whole
//! fund, with optional per-investor overrides for different tax treaties.
//! Rates are externally supplied, never derived here.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::{
    queries, Database, DetailStatus, DistributionDetailRecord, DistributionRecord,
    DistributionStatus, DistributionType,
};
use crate::utils::currency_scale;
use super::allocation::{self, CommitmentPosition};
use super::LedgerError;

/// A created distribution together with its details.
#[derive(Debug, Clone)]
pub struct CreatedDistribution {
    pub distribution: DistributionRecord,
    pub details: Vec<DistributionDetailRecord>,
}

/// Allocates fund-level distributions across a fund's investor base.
#[derive(Clone)]
pub struct DistributionAllocator {
    db: Database,
}

impl DistributionAllocator {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create a distribution and its per-investor details atomically.
    ///
    /// ## Arguments
    ///
    /// * `fund_id` - The distributing fund
    /// * `total` - Fund-level gross amount (> 0, at currency precision)
    /// * `distribution_date` / `payment_date` - payment must not precede
    ///   the distribution date
    /// * `distribution_type` - income / capitalGain / returnOfCapital
    /// * `default_withholding_rate` - applied to every investor, in [0, 1]
    /// * `withholding_overrides` - per-investor rate overrides
    ///
    /// ## Errors
    ///
    /// * `NotFound` - fund id does not resolve
    /// * `Validation` - bad amount/dates/rates, or the fund has no
    ///   commitments
    /// * `InvalidAllocation` - total exceeds the fund's tracked
    ///   distributable value
    #[allow(clippy::too_many_arguments)]
    pub async fn create_distribution(
        &self,
        fund_id: Uuid,
        total: Decimal,
        distribution_date: NaiveDate,
        payment_date: NaiveDate,
        distribution_type: DistributionType,
        default_withholding_rate: Decimal,
        withholding_overrides: &HashMap<Uuid, Decimal>,
    ) -> Result<CreatedDistribution, LedgerError> {
        debug!(
            "Creating distribution: fund={} total={} type={}",
            fund_id,
            total,
            distribution_type.as_str()
        );

        if payment_date < distribution_date {
            return Err(LedgerError::Validation(format!(
                "payment date {} precedes distribution date {}",
                payment_date, distribution_date
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
        let positions: Vec<CommitmentPosition> =
            commitments.iter().map(CommitmentPosition::from).collect();

        // Full validation pass before any persistence.
        let plan = allocation::plan_distribution(
            &positions,
            total,
            scale,
            default_withholding_rate,
            withholding_overrides,
        )?;

        let now = Utc::now();
        let distribution = DistributionRecord {
            id: Uuid::new_v4(),
            fund_id,
            distribution_number: queries::next_distribution_number_tx(&tx, fund_id).await?,
            distribution_date,
            payment_date,
            distribution_type,
            total_amount: total,
            paid_amount: Decimal::ZERO,
            status: DistributionStatus::Processing,
            created_at: now,
            updated_at: now,
        };
        queries::insert_distribution_tx(&tx, &distribution).await?;

        let mut details = Vec::with_capacity(plan.len());
        for share in plan {
            let detail = DistributionDetailRecord {
                id: Uuid::new_v4(),
                distribution_id: distribution.id,
                commitment_id: share.commitment_id,
                investor_id: share.investor_id,
                gross_amount: share.gross,
                paid_amount: None,
                withholding_tax: share.withholding,
                net_amount: None,
                payment_date: None,
                settled_at: None,
                status: DetailStatus::Pending,
                created_at: now,
                updated_at: now,
            };
            queries::insert_distribution_detail_tx(&tx, &detail).await?;
            details.push(detail);
        }

        tx.commit().await?;

        info!(
            "Distribution #{} ({}) created for fund {}: total={} across {} investors",
            distribution.distribution_number,
            distribution_type.as_str(),
            fund_id,
            total,
            details.len()
        );
        Ok(CreatedDistribution {
            distribution,
            details,
        })
    }
}
