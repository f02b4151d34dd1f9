//! # Ledger Aggregator Service
//!
//! Maintains the running totals on commitments after call and distribution
//! events, and serves the fund-level roll-up.
//!
//! ## Settlement model
//!
//! Payment recording and settlement are separate steps:
//!
//! ```text
//! record_*_payment     marks one detail paid (received amount + date)
//! on_call_settled      applies every paid detail to its commitment
//! on_distribution_paid (called_to_date / distributed_to_date / NAV)
//! ```
//!
//! Settlement is idempotent: each detail carries a `settled_at` stamp, and
//! only `paid AND settled_at IS NULL` rows are applied. A retried or
//! duplicated settlement notification is a no-op, not an error.
//!
//! ## NAV policy
//!
//! Settled call payments increase a commitment's NAV estimate (called
//! capital becomes invested capital). Settled distributions reduce it for
//! `returnOfCapital` and `capitalGain` only; `income` is drawn from
//! earnings, not invested capital.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::{queries, CallStatus, CommitmentRecord, Database, DetailStatus, DistributionStatus};
use super::LedgerError;

/// Fund-level roll-up, equal by construction to the sum of the
/// corresponding commitment fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundSummary {
    pub fund_id: Uuid,
    pub total_committed: Decimal,
    pub total_called: Decimal,
    pub total_distributed: Decimal,
    pub net_nav: Decimal,
    pub investor_count: i64,
}

impl FundSummary {
    /// Fold a fund's commitments into the roll-up. Field-by-field sums,
    /// so the summary cannot drift from the commitment table it reads.
    pub fn from_commitments(fund_id: Uuid, commitments: &[CommitmentRecord]) -> Self {
        let mut summary = FundSummary {
            fund_id,
            total_committed: Decimal::ZERO,
            total_called: Decimal::ZERO,
            total_distributed: Decimal::ZERO,
            net_nav: Decimal::ZERO,
            investor_count: commitments.len() as i64,
        };
        for c in commitments {
            summary.total_committed += c.amount;
            summary.total_called += c.called_to_date;
            summary.total_distributed += c.distributed_to_date;
            summary.net_nav += c.nav_estimate;
        }
        summary
    }
}

/// Reject mutation of details under a record already in its terminal
/// state.
fn check_mutable(terminal: bool, kind: &str, id: Uuid) -> Result<(), LedgerError> {
    if terminal {
        return Err(LedgerError::ImmutableRecord(format!(
            "{} {} is complete; its details can no longer be mutated",
            kind, id
        )));
    }
    Ok(())
}

/// A call or distribution reaches its terminal state once every detail
/// is paid. Vacuously true on an empty set, but allocation guarantees at
/// least one detail per record.
fn fully_paid<I: IntoIterator<Item = DetailStatus>>(statuses: I) -> bool {
    statuses.into_iter().all(|s| s == DetailStatus::Paid)
}

/// Result of a settlement pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementOutcome {
    /// Details applied to commitments in this pass (0 on a retry).
    pub applied_details: usize,
    /// Whether the parent record is now in its terminal state.
    pub completed: bool,
}

/// Rolls call/distribution events up into commitment running totals.
#[derive(Clone)]
pub struct LedgerAggregator {
    db: Database,
}

impl LedgerAggregator {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    // ==========================================
    // CAPITAL CALL SIDE
    // ==========================================

    /// Record an investor's payment against a capital call detail.
    ///
    /// `amount` defaults to the detail's called amount when omitted;
    /// partial payments up to the called amount are accepted.
    ///
    /// ## Errors
    ///
    /// * `NotFound` - call or detail id does not resolve (or mismatch)
    /// * `ImmutableRecord` - the parent call is already complete
    /// * `Validation` - non-positive amount, amount above the called
    ///   amount, or the detail is already paid
    pub async fn record_call_payment(
        &self,
        call_id: Uuid,
        detail_id: Uuid,
        amount: Option<Decimal>,
        received_date: NaiveDate,
    ) -> Result<(), LedgerError> {
        debug!("Recording call payment: call={} detail={}", call_id, detail_id);

        let mut client = self.db.pool().get().await
            .map_err(|e| LedgerError::Database(crate::db::DatabaseError::ConnectionError(e.to_string())))?;
        let tx = client.transaction().await?;

        let call = queries::get_capital_call_tx(&tx, call_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("Capital call not found: {}", call_id)))?;
        check_mutable(call.status.is_terminal(), "capital call", call_id)?;

        let detail = queries::get_call_detail_tx(&tx, detail_id)
            .await?
            .filter(|d| d.call_id == call_id)
            .ok_or_else(|| {
                LedgerError::NotFound(format!(
                    "Call detail {} not found under call {}",
                    detail_id, call_id
                ))
            })?;
        if detail.status == DetailStatus::Paid {
            return Err(LedgerError::Validation(format!(
                "payment already recorded for call detail {}",
                detail_id
            )));
        }

        let received = amount.unwrap_or(detail.called_amount);
        if received <= Decimal::ZERO {
            return Err(LedgerError::Validation(format!(
                "received amount must be positive, got {}",
                received
            )));
        }
        if received > detail.called_amount {
            return Err(LedgerError::Validation(format!(
                "received amount {} exceeds called amount {}",
                received, detail.called_amount
            )));
        }

        queries::record_call_detail_payment_tx(&tx, detail_id, received, received_date).await?;
        queries::add_call_received_tx(&tx, call_id, received).await?;

        tx.commit().await?;

        info!(
            "Call payment recorded: call={} detail={} received={}",
            call_id, detail_id, received
        );
        Ok(())
    }

    /// Apply every paid, not-yet-applied detail of a call to its commitment.
    ///
    /// Each applied detail increments the commitment's `called_to_date` and
    /// NAV estimate by the received amount. Idempotent: already-applied
    /// details are skipped, so a duplicate settlement notification changes
    /// nothing. When all details are paid the call transitions to its
    /// terminal `complete` state.
    pub async fn on_call_settled(&self, call_id: Uuid) -> Result<SettlementOutcome, LedgerError> {
        debug!("Settling capital call: {}", call_id);

        let mut client = self.db.pool().get().await
            .map_err(|e| LedgerError::Database(crate::db::DatabaseError::ConnectionError(e.to_string())))?;
        let tx = client.transaction().await?;

        let call = queries::get_capital_call_tx(&tx, call_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("Capital call not found: {}", call_id)))?;

        let details = queries::list_call_details_tx(&tx, call_id).await?;
        let mut applied = 0;
        for detail in details.iter().filter(|d| d.awaiting_application()) {
            // received_amount is always set once a detail is paid
            let received = detail.received_amount.unwrap_or(detail.called_amount);
            queries::apply_call_settlement_tx(&tx, detail.commitment_id, received).await?;
            queries::mark_call_detail_settled_tx(&tx, detail.id).await?;
            applied += 1;
        }

        let completed = fully_paid(details.iter().map(|d| d.status));
        if completed && !call.status.is_terminal() {
            queries::set_call_status_tx(&tx, call_id, CallStatus::Complete).await?;
        }

        tx.commit().await?;

        info!(
            "Call {} settled: {} details applied, complete={}",
            call_id, applied, completed
        );
        Ok(SettlementOutcome {
            applied_details: applied,
            completed,
        })
    }

    // ==========================================
    // DISTRIBUTION SIDE
    // ==========================================

    /// Record a payout against a distribution detail.
    ///
    /// `amount` defaults to the detail's gross amount. The stored net
    /// amount is `paid - withholding`, which must not be negative.
    pub async fn record_distribution_payment(
        &self,
        distribution_id: Uuid,
        detail_id: Uuid,
        amount: Option<Decimal>,
        payment_date: NaiveDate,
    ) -> Result<(), LedgerError> {
        debug!(
            "Recording distribution payment: distribution={} detail={}",
            distribution_id, detail_id
        );

        let mut client = self.db.pool().get().await
            .map_err(|e| LedgerError::Database(crate::db::DatabaseError::ConnectionError(e.to_string())))?;
        let tx = client.transaction().await?;

        let distribution = queries::get_distribution_tx(&tx, distribution_id)
            .await?
            .ok_or_else(|| {
                LedgerError::NotFound(format!("Distribution not found: {}", distribution_id))
            })?;
        check_mutable(
            distribution.status.is_terminal(),
            "distribution",
            distribution_id,
        )?;

        let detail = queries::get_distribution_detail_tx(&tx, detail_id)
            .await?
            .filter(|d| d.distribution_id == distribution_id)
            .ok_or_else(|| {
                LedgerError::NotFound(format!(
                    "Distribution detail {} not found under distribution {}",
                    detail_id, distribution_id
                ))
            })?;
        if detail.status == DetailStatus::Paid {
            return Err(LedgerError::Validation(format!(
                "payment already recorded for distribution detail {}",
                detail_id
            )));
        }

        let paid = amount.unwrap_or(detail.gross_amount);
        if paid <= Decimal::ZERO {
            return Err(LedgerError::Validation(format!(
                "paid amount must be positive, got {}",
                paid
            )));
        }
        if paid > detail.gross_amount {
            return Err(LedgerError::Validation(format!(
                "paid amount {} exceeds gross amount {}",
                paid, detail.gross_amount
            )));
        }
        let net = paid - detail.withholding_tax;
        if net < Decimal::ZERO {
            return Err(LedgerError::Validation(format!(
                "paid amount {} is below the withholding tax {}",
                paid, detail.withholding_tax
            )));
        }

        queries::record_distribution_detail_payment_tx(&tx, detail_id, paid, net, payment_date)
            .await?;
        queries::add_distribution_paid_tx(&tx, distribution_id, paid).await?;

        tx.commit().await?;

        info!(
            "Distribution payment recorded: distribution={} detail={} paid={} net={}",
            distribution_id, detail_id, paid, net
        );
        Ok(())
    }

    /// Apply every paid, not-yet-applied detail of a distribution to its
    /// commitment.
    ///
    /// Each applied detail increments `distributed_to_date` by the gross
    /// amount, and reduces the NAV estimate by the gross amount when the
    /// distribution type warrants it. Idempotent via the `settled_at`
    /// stamp, like [`Self::on_call_settled`].
    pub async fn on_distribution_paid(
        &self,
        distribution_id: Uuid,
    ) -> Result<SettlementOutcome, LedgerError> {
        debug!("Settling distribution: {}", distribution_id);

        let mut client = self.db.pool().get().await
            .map_err(|e| LedgerError::Database(crate::db::DatabaseError::ConnectionError(e.to_string())))?;
        let tx = client.transaction().await?;

        let distribution = queries::get_distribution_tx(&tx, distribution_id)
            .await?
            .ok_or_else(|| {
                LedgerError::NotFound(format!("Distribution not found: {}", distribution_id))
            })?;

        let details = queries::list_distribution_details_tx(&tx, distribution_id).await?;
        let mut applied = 0;
        for detail in details.iter().filter(|d| d.awaiting_application()) {
            let nav_reduction = if distribution.distribution_type.reduces_nav() {
                detail.gross_amount
            } else {
                Decimal::ZERO
            };
            queries::apply_distribution_settlement_tx(
                &tx,
                detail.commitment_id,
                detail.gross_amount,
                nav_reduction,
            )
            .await?;
            queries::mark_distribution_detail_settled_tx(&tx, detail.id).await?;
            applied += 1;
        }

        let completed = fully_paid(details.iter().map(|d| d.status));
        if completed && !distribution.status.is_terminal() {
            queries::set_distribution_status_tx(&tx, distribution_id, DistributionStatus::Complete)
                .await?;
        }

        tx.commit().await?;

        info!(
            "Distribution {} settled: {} details applied, complete={}",
            distribution_id, applied, completed
        );
        Ok(SettlementOutcome {
            applied_details: applied,
            completed,
        })
    }

    // ==========================================
    // READ SIDE
    // ==========================================

    /// Fund-level aggregation over the commitment table.
    pub async fn fund_summary(&self, fund_id: Uuid) -> Result<FundSummary, LedgerError> {
        queries::get_fund(self.db.pool(), fund_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("Fund not found: {}", fund_id)))?;

        let commitments = queries::list_fund_commitments(self.db.pool(), fund_id).await?;
        Ok(FundSummary::from_commitments(fund_id, &commitments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;

    fn commitment(amount: Decimal, called: Decimal, distributed: Decimal, nav: Decimal) -> CommitmentRecord {
        CommitmentRecord {
            id: Uuid::new_v4(),
            fund_id: Uuid::nil(),
            investor_id: Uuid::new_v4(),
            amount,
            commitment_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            called_to_date: called,
            distributed_to_date: distributed,
            nav_estimate: nav,
            ownership_pct: Decimal::ONE,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_summary_is_sum_of_commitment_fields() {
        let commitments = vec![
            commitment(dec!(100), dec!(40), dec!(10), dec!(35)),
            commitment(dec!(200), dec!(80), dec!(20), dec!(70)),
            commitment(dec!(50), dec!(0), dec!(0), dec!(0)),
        ];
        let s = FundSummary::from_commitments(Uuid::nil(), &commitments);
        assert_eq!(s.total_committed, dec!(350));
        assert_eq!(s.total_called, dec!(120));
        assert_eq!(s.total_distributed, dec!(30));
        assert_eq!(s.net_nav, dec!(105));
        assert_eq!(s.investor_count, 3);
    }

    #[test]
    fn test_summary_of_empty_fund_is_zero() {
        let s = FundSummary::from_commitments(Uuid::nil(), &[]);
        assert_eq!(s.total_committed, Decimal::ZERO);
        assert_eq!(s.net_nav, Decimal::ZERO);
        assert_eq!(s.investor_count, 0);
    }

    #[test]
    fn test_fully_paid_requires_every_detail() {
        assert!(fully_paid([DetailStatus::Paid, DetailStatus::Paid]));
        assert!(!fully_paid([DetailStatus::Paid, DetailStatus::Pending]));
        assert!(fully_paid([]));
    }

    #[test]
    fn test_terminal_records_reject_mutation() {
        let id = Uuid::new_v4();
        assert!(check_mutable(CallStatus::Sent.is_terminal(), "capital call", id).is_ok());

        let err = check_mutable(CallStatus::Complete.is_terminal(), "capital call", id).unwrap_err();
        match err {
            LedgerError::ImmutableRecord(msg) => {
                assert!(msg.contains(&id.to_string()));
            }
            other => panic!("expected ImmutableRecord, got {:?}", other),
        }
    }
}
