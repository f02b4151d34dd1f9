//! # Database Models
//!
//! This module defines the data structures that map to database tables,
//! plus the closed status enumerations used throughout the ledger.
//!
//! ## Table Overview
//!
//! | Table | Description |
//! |-------|-------------|
//! | `funds` | Fund master data (fee terms, lifecycle status) |
//! | `investors` | Investor master data |
//! | `commitments` | Fund/investor relationship with running totals |
//! | `capital_calls` | Fund-level call events |
//! | `capital_call_details` | Per-investor call portions |
//! | `distributions` | Fund-level distribution events |
//! | `distribution_details` | Per-investor distribution portions |
//!
//! ## Relationship Diagram
//!
//! ```text
//! ┌───────┐     ┌─────────────┐     ┌───────────┐
//! │ funds │────<│ commitments │>────│ investors │
//! └───┬───┘     └─────────────┘     └───────────┘
//!     │
//!     ├────<┌───────────────┐────<┌──────────────────────┐
//!     │     │ capital_calls │     │ capital_call_details │
//!     │     └───────────────┘     └──────────────────────┘
//!     │
//!     └────<┌───────────────┐────<┌──────────────────────┐
//!           │ distributions │     │ distribution_details │
//!           └───────────────┘     └──────────────────────┘
//! ```
//!
//! ## Status Values
//!
//! Statuses are stored as text but parsed into closed enums at the database
//! boundary, so a malformed value surfaces as a `DecodeError` rather than
//! leaking a loose string into the ledger.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================
// STATUS ENUMERATIONS
// ============================================

/// Lifecycle status of a fund. Transitions are externally driven
/// (administrator action), never computed by the ledger.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum FundStatus {
    /// Raising commitments from investors
    Fundraising,
    /// Deploying called capital
    Investing,
    /// Realizing and distributing proceeds
    Harvesting,
    /// Wound down
    Liquidated,
}

impl FundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FundStatus::Fundraising => "fundraising",
            FundStatus::Investing => "investing",
            FundStatus::Harvesting => "harvesting",
            FundStatus::Liquidated => "liquidated",
        }
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "fundraising" => Ok(FundStatus::Fundraising),
            "investing" => Ok(FundStatus::Investing),
            "harvesting" => Ok(FundStatus::Harvesting),
            "liquidated" => Ok(FundStatus::Liquidated),
            other => Err(format!("unknown fund status: {}", other)),
        }
    }
}

/// Investor classification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum InvestorType {
    Institutional,
    Corporate,
    FamilyOffice,
    /// High-net-worth individual
    Hnwi,
    FundOfFunds,
}

impl InvestorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvestorType::Institutional => "institutional",
            InvestorType::Corporate => "corporate",
            InvestorType::FamilyOffice => "familyOffice",
            InvestorType::Hnwi => "hnwi",
            InvestorType::FundOfFunds => "fundOfFunds",
        }
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "institutional" => Ok(InvestorType::Institutional),
            "corporate" => Ok(InvestorType::Corporate),
            "familyOffice" => Ok(InvestorType::FamilyOffice),
            "hnwi" => Ok(InvestorType::Hnwi),
            "fundOfFunds" => Ok(InvestorType::FundOfFunds),
            other => Err(format!("unknown investor type: {}", other)),
        }
    }
}

/// Status of a capital call. `Sent -> Complete`, never backward.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CallStatus {
    /// Call notices issued, payments outstanding
    Sent,
    /// All details paid and settled; terminal
    Complete,
}

impl CallStatus {
    /// Terminal states admit no further detail mutation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CallStatus::Complete)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Sent => "sent",
            CallStatus::Complete => "complete",
        }
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "sent" => Ok(CallStatus::Sent),
            "complete" => Ok(CallStatus::Complete),
            other => Err(format!("unknown call status: {}", other)),
        }
    }
}

/// Status of a distribution. `Processing -> Complete`, never backward.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DistributionStatus {
    /// Payments being disbursed
    Processing,
    /// All details paid and settled; terminal
    Complete,
}

impl DistributionStatus {
    /// Terminal states admit no further detail mutation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DistributionStatus::Complete)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DistributionStatus::Processing => "processing",
            DistributionStatus::Complete => "complete",
        }
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "processing" => Ok(DistributionStatus::Processing),
            "complete" => Ok(DistributionStatus::Complete),
            other => Err(format!("unknown distribution status: {}", other)),
        }
    }
}

/// Status of a per-investor detail row (call or distribution side).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DetailStatus {
    /// Awaiting payment
    Pending,
    /// Payment recorded
    Paid,
}

impl DetailStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetailStatus::Pending => "pending",
            DetailStatus::Paid => "paid",
        }
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "pending" => Ok(DetailStatus::Pending),
            "paid" => Ok(DetailStatus::Paid),
            other => Err(format!("unknown detail status: {}", other)),
        }
    }
}

/// Economic character of a distribution.
///
/// Only `ReturnOfCapital` and `CapitalGain` reduce the NAV estimate when
/// settled; `Income` is drawn from earnings, not invested capital.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DistributionType {
    Income,
    CapitalGain,
    ReturnOfCapital,
}

impl DistributionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistributionType::Income => "income",
            DistributionType::CapitalGain => "capitalGain",
            DistributionType::ReturnOfCapital => "returnOfCapital",
        }
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "income" => Ok(DistributionType::Income),
            "capitalGain" => Ok(DistributionType::CapitalGain),
            "returnOfCapital" => Ok(DistributionType::ReturnOfCapital),
            other => Err(format!("unknown distribution type: {}", other)),
        }
    }

    /// Whether settling a distribution of this type reduces NAV.
    pub fn reduces_nav(&self) -> bool {
        matches!(self, DistributionType::ReturnOfCapital | DistributionType::CapitalGain)
    }
}

// ============================================
// ROW STRUCTS
// ============================================

/// A fund record.
///
/// Fee rates and the hurdle rate are fractions of 1 (0.02 = 2%). They are
/// context carried for reporting; the ledger never computes fees from them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundRecord {
    pub id: Uuid,
    pub name: String,
    /// ISO 4217 currency code; drives allocation rounding precision.
    pub currency: String,
    pub target_size: Decimal,
    pub vintage_year: i32,
    pub inception_date: NaiveDate,
    pub term_months: i32,
    pub extension_months: i32,
    pub status: FundStatus,
    pub management_fee_rate: Decimal,
    pub performance_fee_rate: Decimal,
    pub hurdle_rate: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An investor record. Referenced by commitments, never owned by a fund.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestorRecord {
    pub id: Uuid,
    pub name: String,
    pub investor_type: InvestorType,
    pub domicile: String,
    pub contact_email: Option<String>,
    /// "active" or "inactive"
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A commitment: the relationship between one fund and one investor.
///
/// `amount` is fixed at creation and immutable. The running totals
/// (`called_to_date`, `distributed_to_date`, `nav_estimate`) are mutated
/// only by the ledger aggregator; `ownership_pct` is recomputed by the
/// commitment registry whenever a commitment is added to the fund.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitmentRecord {
    pub id: Uuid,
    pub fund_id: Uuid,
    pub investor_id: Uuid,
    /// Committed capital; invariant: `called_to_date <= amount`.
    pub amount: Decimal,
    pub commitment_date: NaiveDate,
    pub called_to_date: Decimal,
    pub distributed_to_date: Decimal,
    pub nav_estimate: Decimal,
    /// Fraction of 1: own amount / sum of all commitments in the fund.
    pub ownership_pct: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CommitmentRecord {
    /// Commitment headroom still available to call.
    pub fn uncalled(&self) -> Decimal {
        self.amount - self.called_to_date
    }
}

/// A fund-level capital call event.
///
/// Invariant: the sum of its details' `called_amount` equals `total_amount`
/// exactly (the allocator assigns the rounding residual deterministically).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapitalCallRecord {
    pub id: Uuid,
    pub fund_id: Uuid,
    /// Strictly increasing per fund.
    pub call_number: i32,
    pub call_date: NaiveDate,
    pub due_date: NaiveDate,
    pub total_amount: Decimal,
    pub received_amount: Decimal,
    pub status: CallStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A per-investor portion of a capital call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapitalCallDetailRecord {
    pub id: Uuid,
    pub call_id: Uuid,
    pub commitment_id: Uuid,
    pub investor_id: Uuid,
    pub called_amount: Decimal,
    pub received_amount: Option<Decimal>,
    pub received_date: Option<NaiveDate>,
    /// Stamped when the aggregator applies this detail to its commitment.
    /// Null means paid-but-unapplied or still pending.
    pub settled_at: Option<DateTime<Utc>>,
    pub status: DetailStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CapitalCallDetailRecord {
    /// Paid but not yet applied to its commitment. Settlement picks up
    /// exactly these rows, so a detail is applied at most once.
    pub fn awaiting_application(&self) -> bool {
        self.status == DetailStatus::Paid && self.settled_at.is_none()
    }
}

/// A fund-level distribution event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionRecord {
    pub id: Uuid,
    pub fund_id: Uuid,
    pub distribution_number: i32,
    pub distribution_date: NaiveDate,
    pub payment_date: NaiveDate,
    pub distribution_type: DistributionType,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub status: DistributionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A per-investor portion of a distribution.
///
/// Invariants: `withholding_tax >= 0`, `net_amount = paid_amount -
/// withholding_tax`, `net_amount >= 0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionDetailRecord {
    pub id: Uuid,
    pub distribution_id: Uuid,
    pub commitment_id: Uuid,
    pub investor_id: Uuid,
    pub gross_amount: Decimal,
    pub paid_amount: Option<Decimal>,
    pub withholding_tax: Decimal,
    pub net_amount: Option<Decimal>,
    pub payment_date: Option<NaiveDate>,
    pub settled_at: Option<DateTime<Utc>>,
    pub status: DetailStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DistributionDetailRecord {
    /// Paid but not yet applied to its commitment.
    pub fn awaiting_application(&self) -> bool {
        self.status == DetailStatus::Paid && self.settled_at.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_status_round_trips() {
        for s in [FundStatus::Fundraising, FundStatus::Investing, FundStatus::Harvesting, FundStatus::Liquidated] {
            assert_eq!(FundStatus::parse(s.as_str()).unwrap(), s);
        }
        for s in [CallStatus::Sent, CallStatus::Complete] {
            assert_eq!(CallStatus::parse(s.as_str()).unwrap(), s);
        }
        for s in [DistributionStatus::Processing, DistributionStatus::Complete] {
            assert_eq!(DistributionStatus::parse(s.as_str()).unwrap(), s);
        }
        for s in [DetailStatus::Pending, DetailStatus::Paid] {
            assert_eq!(DetailStatus::parse(s.as_str()).unwrap(), s);
        }
    }

    #[test]
    fn test_investor_type_camel_case() {
        assert_eq!(InvestorType::FamilyOffice.as_str(), "familyOffice");
        assert_eq!(InvestorType::parse("fundOfFunds").unwrap(), InvestorType::FundOfFunds);
        assert!(InvestorType::parse("family_office").is_err());
    }

    #[test]
    fn test_distribution_type_nav_policy() {
        assert!(!DistributionType::Income.reduces_nav());
        assert!(DistributionType::CapitalGain.reduces_nav());
        assert!(DistributionType::ReturnOfCapital.reduces_nav());
        assert_eq!(DistributionType::parse("capitalGain").unwrap(), DistributionType::CapitalGain);
        assert!(DistributionType::parse("dividend").is_err());
    }

    #[test]
    fn test_unknown_status_rejected() {
        assert!(CallStatus::parse("draft").is_err());
        assert!(FundStatus::parse("closed").is_err());
    }

    #[test]
    fn test_uncalled_headroom() {
        let c = CommitmentRecord {
            id: Uuid::nil(),
            fund_id: Uuid::nil(),
            investor_id: Uuid::nil(),
            amount: dec!(100),
            commitment_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            called_to_date: dec!(90),
            distributed_to_date: Decimal::ZERO,
            nav_estimate: dec!(90),
            ownership_pct: Decimal::ONE,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(c.uncalled(), dec!(10));
    }

    #[test]
    fn test_terminal_states() {
        assert!(!CallStatus::Sent.is_terminal());
        assert!(CallStatus::Complete.is_terminal());
        assert!(!DistributionStatus::Processing.is_terminal());
        assert!(DistributionStatus::Complete.is_terminal());
    }

    fn call_detail(status: DetailStatus, settled_at: Option<DateTime<Utc>>) -> CapitalCallDetailRecord {
        CapitalCallDetailRecord {
            id: Uuid::nil(),
            call_id: Uuid::nil(),
            commitment_id: Uuid::nil(),
            investor_id: Uuid::nil(),
            called_amount: dec!(100),
            received_amount: None,
            received_date: None,
            settled_at,
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_awaiting_application_requires_paid_and_unsettled() {
        // Pending rows and already-settled rows are never re-applied;
        // only paid-but-unstamped rows qualify, so settlement is
        // idempotent once the stamp lands.
        assert!(!call_detail(DetailStatus::Pending, None).awaiting_application());
        assert!(call_detail(DetailStatus::Paid, None).awaiting_application());
        assert!(!call_detail(DetailStatus::Paid, Some(Utc::now())).awaiting_application());
    }
}
