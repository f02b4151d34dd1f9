//! # API Request Models
//!
//! Structures for incoming API request bodies.
//! Each struct represents the expected JSON body for an endpoint.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{DistributionType, FundStatus, InvestorType};

/// Request to create a fund.
///
/// ## Example JSON
///
/// ```json
/// {
///     "name": "Growth Fund II",
///     "currency": "USD",
///     "targetSize": "250000000",
///     "vintageYear": 2024,
///     "inceptionDate": "2024-03-01",
///     "termMonths": 120,
///     "extensionMonths": 24,
///     "managementFeeRate": "0.02",
///     "performanceFeeRate": "0.20",
///     "hurdleRate": "0.08"
/// }
/// ```
///
/// Rates are fractions of 1 (0.02 = 2%). Fee terms are carried as context;
/// the ledger never computes fees from them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFundRequest {
    pub name: String,

    /// ISO 4217 currency code; drives allocation rounding precision.
    #[serde(default = "default_currency")]
    pub currency: String,

    pub target_size: Decimal,
    pub vintage_year: i32,
    pub inception_date: NaiveDate,
    pub term_months: i32,

    #[serde(default)]
    pub extension_months: i32,

    #[serde(default)]
    pub management_fee_rate: Decimal,

    #[serde(default)]
    pub performance_fee_rate: Decimal,

    #[serde(default)]
    pub hurdle_rate: Decimal,
}

fn default_currency() -> String {
    "USD".to_string()
}

/// Request to transition a fund's lifecycle status.
///
/// Status transitions are externally driven (administrator action); the
/// ledger never computes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFundStatusRequest {
    pub status: FundStatus,
}

/// Request to create an investor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvestorRequest {
    pub name: String,
    pub investor_type: InvestorType,
    pub domicile: String,
    pub contact_email: Option<String>,
}

/// Request to add an investor's commitment to a fund
/// ("add investor to fund" action).
///
/// ## Example JSON
///
/// ```json
/// {
///     "investorId": "550e8400-e29b-41d4-a716-446655440000",
///     "amount": "25000000",
///     "commitmentDate": "2024-04-15"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCommitmentRequest {
    pub investor_id: Uuid,
    pub amount: Decimal,
    pub commitment_date: NaiveDate,
}

/// Request to create a capital call for a fund.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCallRequest {
    /// Fund-level requested amount, at the fund currency's precision.
    pub total_amount: Decimal,
    pub call_date: NaiveDate,
    pub due_date: NaiveDate,
}

/// Request to create a distribution for a fund.
///
/// ## Example JSON
///
/// ```json
/// {
///     "totalAmount": "1000000",
///     "distributionDate": "2025-06-30",
///     "paymentDate": "2025-07-15",
///     "distributionType": "returnOfCapital",
///     "withholdingRate": "0.15",
///     "withholdingOverrides": {
///         "550e8400-e29b-41d4-a716-446655440000": "0.30"
///     }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDistributionRequest {
    pub total_amount: Decimal,
    pub distribution_date: NaiveDate,
    pub payment_date: NaiveDate,
    pub distribution_type: DistributionType,

    /// Default withholding-tax rate in [0, 1], externally supplied.
    #[serde(default)]
    pub withholding_rate: Decimal,

    /// Per-investor rate overrides for different tax treaties.
    #[serde(default)]
    pub withholding_overrides: HashMap<Uuid, Decimal>,
}

/// Request to record a payment against a call or distribution detail
/// ("mark as paid/received" action).
///
/// When `amount` is omitted the detail's full called/gross amount is used.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPaymentRequest {
    pub amount: Option<Decimal>,
    pub payment_date: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_distribution_request_defaults() {
        let json = r#"{
            "totalAmount": "100.00",
            "distributionDate": "2025-06-30",
            "paymentDate": "2025-07-15",
            "distributionType": "income"
        }"#;
        let req: CreateDistributionRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.distribution_type, DistributionType::Income);
        assert!(req.withholding_rate.is_zero());
        assert!(req.withholding_overrides.is_empty());
    }

    #[test]
    fn test_unknown_distribution_type_rejected() {
        let json = r#"{
            "totalAmount": "100.00",
            "distributionDate": "2025-06-30",
            "paymentDate": "2025-07-15",
            "distributionType": "dividend"
        }"#;
        assert!(serde_json::from_str::<CreateDistributionRequest>(json).is_err());
    }

    #[test]
    fn test_create_fund_request_camel_case() {
        let json = r#"{
            "name": "Growth Fund II",
            "targetSize": "250000000",
            "vintageYear": 2024,
            "inceptionDate": "2024-03-01",
            "termMonths": 120
        }"#;
        let req: CreateFundRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.currency, "USD");
        assert_eq!(req.extension_months, 0);
    }
}
