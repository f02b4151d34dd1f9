//! Deterministic demo data loader.
//!
//! Builds a small but realistic ledger through the same service layer the
//! API uses, so the seeded database obeys every invariant the services
//! enforce. Running it twice against the same database fails on the
//! duplicate fund names rather than silently doubling the data.
//!
//! ```bash
//! cargo run --bin seed
//! ```

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use uuid::Uuid;

use fund_ledger_backend::config::AppConfig;
use fund_ledger_backend::db::{
    queries, Database, DistributionType, FundRecord, FundStatus, InvestorRecord, InvestorType,
};
use fund_ledger_backend::utils::format_money;
use fund_ledger_backend::AppState;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid seed date")
}

fn money(s: &str) -> Decimal {
    s.parse().expect("valid seed amount")
}

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let db = Database::connect(&config.database_url, config.db_max_connections).await?;
    db.run_migrations().await?;

    let state = AppState::new(db.clone(), config);

    info!("Seeding demo ledger...");

    // =========================================
    // Fund
    // =========================================
    let now = chrono::Utc::now();
    let fund = FundRecord {
        id: Uuid::new_v4(),
        name: "Meridian Growth Partners II".to_string(),
        currency: "USD".to_string(),
        target_size: money("250000000"),
        vintage_year: 2024,
        inception_date: date(2024, 3, 1),
        term_months: 120,
        extension_months: 24,
        status: FundStatus::Fundraising,
        management_fee_rate: money("0.02"),
        performance_fee_rate: money("0.20"),
        hurdle_rate: money("0.08"),
        created_at: now,
        updated_at: now,
    };
    queries::insert_fund(db.pool(), &fund).await?;
    info!("Fund: {} ({})", fund.name, fund.id);

    // =========================================
    // Investors
    // =========================================
    let investors = [
        ("Calvert State Pension", InvestorType::Institutional, "US"),
        ("Auriga Holdings", InvestorType::Corporate, "DE"),
        ("Bluewater Family Office", InvestorType::FamilyOffice, "CH"),
        ("R. Hartwell", InvestorType::Hnwi, "US"),
        ("Kestrel Fund of Funds", InvestorType::FundOfFunds, "GB"),
    ];

    let mut investor_ids = Vec::new();
    for (name, investor_type, domicile) in investors {
        let investor = InvestorRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            investor_type,
            domicile: domicile.to_string(),
            contact_email: None,
            status: "active".to_string(),
            created_at: now,
            updated_at: now,
        };
        queries::insert_investor(db.pool(), &investor).await?;
        investor_ids.push(investor.id);
    }
    info!("Investors: {}", investor_ids.len());

    // =========================================
    // Commitments (totals to 200M)
    // =========================================
    let commitments = [
        ("60000000", date(2024, 3, 15)),
        ("50000000", date(2024, 3, 20)),
        ("40000000", date(2024, 4, 2)),
        ("30000000", date(2024, 4, 18)),
        ("20000000", date(2024, 5, 1)),
    ];
    for ((amount, commitment_date), investor_id) in commitments.iter().zip(&investor_ids) {
        state
            .registry
            .add_commitment(fund.id, *investor_id, money(amount), *commitment_date)
            .await?;
    }
    info!("Commitments added");

    queries::update_fund_status(db.pool(), fund.id, FundStatus::Investing).await?;

    // =========================================
    // Capital call: 10% of commitments, fully paid and settled
    // =========================================
    let call = state
        .call_allocator
        .create_call(fund.id, money("20000000"), date(2025, 1, 10), date(2025, 2, 10))
        .await?;
    info!("Capital call #{} created", call.call.call_number);

    for detail in &call.details {
        state
            .aggregator
            .record_call_payment(call.call.id, detail.id, None, date(2025, 2, 5))
            .await?;
    }
    let outcome = state.aggregator.on_call_settled(call.call.id).await?;
    info!(
        "Call settled: {} details applied, complete={}",
        outcome.applied_details, outcome.completed
    );

    // =========================================
    // Income distribution: 2M at 15% withholding, one treaty override
    // =========================================
    let mut overrides = HashMap::new();
    overrides.insert(investor_ids[2], money("0.05"));

    let distribution = state
        .distribution_allocator
        .create_distribution(
            fund.id,
            money("2000000"),
            date(2025, 6, 30),
            date(2025, 7, 15),
            DistributionType::Income,
            money("0.15"),
            &overrides,
        )
        .await?;
    info!(
        "Distribution #{} created",
        distribution.distribution.distribution_number
    );

    for detail in &distribution.details {
        state
            .aggregator
            .record_distribution_payment(
                distribution.distribution.id,
                detail.id,
                None,
                date(2025, 7, 15),
            )
            .await?;
    }
    let outcome = state
        .aggregator
        .on_distribution_paid(distribution.distribution.id)
        .await?;
    info!(
        "Distribution settled: {} details applied, complete={}",
        outcome.applied_details, outcome.completed
    );

    let summary = state.aggregator.fund_summary(fund.id).await?;
    info!(
        "Summary: committed={} called={} distributed={} nav={}",
        format_money(summary.total_committed, &fund.currency),
        format_money(summary.total_called, &fund.currency),
        format_money(summary.total_distributed, &fund.currency),
        format_money(summary.net_nav, &fund.currency)
    );

    info!("Seed complete");
    Ok(())
}
