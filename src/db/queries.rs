//! # Database Queries
//!
//! This module contains all the SQL for the ledger. Each function performs
//! one database operation.
//!
//! ## Query Organization
//!
//! Queries are grouped by the table they operate on:
//! - `*_fund*` - Fund table operations
//! - `*_investor*` - Investor table operations
//! - `*_commitment*` - Commitment table operations
//! - `*_call*` - Capital call and detail operations
//! - `*_distribution*` - Distribution and detail operations
//!
//! ## Pool vs Transaction
//!
//! Read paths take the connection `Pool`. Anything that participates in an
//! atomic ledger write (call creation, distribution creation, settlement)
//! takes a `tokio_postgres::Transaction` instead, suffixed `_tx`, so the
//! caller controls the transactional boundary and the per-fund lock.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use deadpool_postgres::Pool;
use rust_decimal::Decimal;
use tokio_postgres::{Row, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use super::models::*;
use super::DatabaseError;

// ============================================
// ROW MAPPERS
// ============================================

fn row_to_fund(row: &Row) -> Result<FundRecord, DatabaseError> {
    let status: &str = row.get("status");
    Ok(FundRecord {
        id: row.get("id"),
        name: row.get("name"),
        currency: row.get("currency"),
        target_size: row.get("target_size"),
        vintage_year: row.get("vintage_year"),
        inception_date: row.get("inception_date"),
        term_months: row.get("term_months"),
        extension_months: row.get("extension_months"),
        status: FundStatus::parse(status).map_err(DatabaseError::DecodeError)?,
        management_fee_rate: row.get("management_fee_rate"),
        performance_fee_rate: row.get("performance_fee_rate"),
        hurdle_rate: row.get("hurdle_rate"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_investor(row: &Row) -> Result<InvestorRecord, DatabaseError> {
    let investor_type: &str = row.get("investor_type");
    Ok(InvestorRecord {
        id: row.get("id"),
        name: row.get("name"),
        investor_type: InvestorType::parse(investor_type).map_err(DatabaseError::DecodeError)?,
        domicile: row.get("domicile"),
        contact_email: row.get("contact_email"),
        status: row.get("status"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_commitment(row: &Row) -> Result<CommitmentRecord, DatabaseError> {
    Ok(CommitmentRecord {
        id: row.get("id"),
        fund_id: row.get("fund_id"),
        investor_id: row.get("investor_id"),
        amount: row.get("amount"),
        commitment_date: row.get("commitment_date"),
        called_to_date: row.get("called_to_date"),
        distributed_to_date: row.get("distributed_to_date"),
        nav_estimate: row.get("nav_estimate"),
        ownership_pct: row.get("ownership_pct"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_call(row: &Row) -> Result<CapitalCallRecord, DatabaseError> {
    let status: &str = row.get("status");
    Ok(CapitalCallRecord {
        id: row.get("id"),
        fund_id: row.get("fund_id"),
        call_number: row.get("call_number"),
        call_date: row.get("call_date"),
        due_date: row.get("due_date"),
        total_amount: row.get("total_amount"),
        received_amount: row.get("received_amount"),
        status: CallStatus::parse(status).map_err(DatabaseError::DecodeError)?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_call_detail(row: &Row) -> Result<CapitalCallDetailRecord, DatabaseError> {
    let status: &str = row.get("status");
    Ok(CapitalCallDetailRecord {
        id: row.get("id"),
        call_id: row.get("call_id"),
        commitment_id: row.get("commitment_id"),
        investor_id: row.get("investor_id"),
        called_amount: row.get("called_amount"),
        received_amount: row.get("received_amount"),
        received_date: row.get("received_date"),
        settled_at: row.get("settled_at"),
        status: DetailStatus::parse(status).map_err(DatabaseError::DecodeError)?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_distribution(row: &Row) -> Result<DistributionRecord, DatabaseError> {
    let status: &str = row.get("status");
    let dist_type: &str = row.get("distribution_type");
    Ok(DistributionRecord {
        id: row.get("id"),
        fund_id: row.get("fund_id"),
        distribution_number: row.get("distribution_number"),
        distribution_date: row.get("distribution_date"),
        payment_date: row.get("payment_date"),
        distribution_type: DistributionType::parse(dist_type).map_err(DatabaseError::DecodeError)?,
        total_amount: row.get("total_amount"),
        paid_amount: row.get("paid_amount"),
        status: DistributionStatus::parse(status).map_err(DatabaseError::DecodeError)?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_distribution_detail(row: &Row) -> Result<DistributionDetailRecord, DatabaseError> {
    let status: &str = row.get("status");
    Ok(DistributionDetailRecord {
        id: row.get("id"),
        distribution_id: row.get("distribution_id"),
        commitment_id: row.get("commitment_id"),
        investor_id: row.get("investor_id"),
        gross_amount: row.get("gross_amount"),
        paid_amount: row.get("paid_amount"),
        withholding_tax: row.get("withholding_tax"),
        net_amount: row.get("net_amount"),
        payment_date: row.get("payment_date"),
        settled_at: row.get("settled_at"),
        status: DetailStatus::parse(status).map_err(DatabaseError::DecodeError)?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================
// FUND QUERIES
// ============================================

/// Insert a fund record.
pub async fn insert_fund(pool: &Pool, fund: &FundRecord) -> Result<(), DatabaseError> {
    debug!("Inserting fund: {} ({})", fund.name, fund.id);

    let client = pool.get().await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    client.execute(
        r#"
        INSERT INTO funds (
            id, name, currency, target_size, vintage_year, inception_date,
            term_months, extension_months, status,
            management_fee_rate, performance_fee_rate, hurdle_rate,
            created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        "#,
        &[
            &fund.id,
            &fund.name,
            &fund.currency,
            &fund.target_size,
            &fund.vintage_year,
            &fund.inception_date,
            &fund.term_months,
            &fund.extension_months,
            &fund.status.as_str(),
            &fund.management_fee_rate,
            &fund.performance_fee_rate,
            &fund.hurdle_rate,
            &fund.created_at,
            &fund.updated_at,
        ],
    ).await?;

    info!("Fund created: {} ({})", fund.name, fund.id);
    Ok(())
}

/// Get a fund by id.
pub async fn get_fund(pool: &Pool, id: Uuid) -> Result<Option<FundRecord>, DatabaseError> {
    let client = pool.get().await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    let rows = client.query(
        "SELECT * FROM funds WHERE id = $1",
        &[&id],
    ).await?;

    match rows.first() {
        Some(row) => Ok(Some(row_to_fund(row)?)),
        None => Ok(None),
    }
}

/// List all funds, newest vintage first.
pub async fn list_funds(pool: &Pool) -> Result<Vec<FundRecord>, DatabaseError> {
    let client = pool.get().await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    let rows = client.query(
        "SELECT * FROM funds ORDER BY vintage_year DESC, name ASC",
        &[],
    ).await?;

    let mut funds = Vec::with_capacity(rows.len());
    for row in &rows {
        funds.push(row_to_fund(row)?);
    }
    Ok(funds)
}

/// Update a fund's lifecycle status (externally driven transition).
pub async fn update_fund_status(
    pool: &Pool,
    id: Uuid,
    status: FundStatus,
) -> Result<(), DatabaseError> {
    let client = pool.get().await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    let rows_affected = client.execute(
        "UPDATE funds SET status = $2, updated_at = NOW() WHERE id = $1",
        &[&id, &status.as_str()],
    ).await?;

    if rows_affected == 0 {
        return Err(DatabaseError::NotFound(format!("Fund not found: {}", id)));
    }

    info!("Fund {} status set to {}", id, status.as_str());
    Ok(())
}

/// Lock a fund row for the duration of the surrounding transaction.
///
/// This is the per-fund serialization point: concurrent call or
/// distribution creation against the same fund queues behind this lock,
/// while other funds proceed in parallel.
pub async fn lock_fund_tx(
    tx: &Transaction<'_>,
    id: Uuid,
) -> Result<Option<FundRecord>, DatabaseError> {
    let rows = tx.query(
        "SELECT * FROM funds WHERE id = $1 FOR UPDATE",
        &[&id],
    ).await?;

    match rows.first() {
        Some(row) => Ok(Some(row_to_fund(row)?)),
        None => Ok(None),
    }
}

// ============================================
// INVESTOR QUERIES
// ============================================

/// Insert an investor record.
pub async fn insert_investor(pool: &Pool, investor: &InvestorRecord) -> Result<(), DatabaseError> {
    debug!("Inserting investor: {} ({})", investor.name, investor.id);

    let client = pool.get().await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    client.execute(
        r#"
        INSERT INTO investors (
            id, name, investor_type, domicile, contact_email, status,
            created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
        &[
            &investor.id,
            &investor.name,
            &investor.investor_type.as_str(),
            &investor.domicile,
            &investor.contact_email,
            &investor.status,
            &investor.created_at,
            &investor.updated_at,
        ],
    ).await?;

    info!("Investor created: {} ({})", investor.name, investor.id);
    Ok(())
}

/// Get an investor by id.
pub async fn get_investor(pool: &Pool, id: Uuid) -> Result<Option<InvestorRecord>, DatabaseError> {
    let client = pool.get().await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    let rows = client.query(
        "SELECT * FROM investors WHERE id = $1",
        &[&id],
    ).await?;

    match rows.first() {
        Some(row) => Ok(Some(row_to_investor(row)?)),
        None => Ok(None),
    }
}

/// List all investors, alphabetically.
pub async fn list_investors(pool: &Pool) -> Result<Vec<InvestorRecord>, DatabaseError> {
    let client = pool.get().await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    let rows = client.query(
        "SELECT * FROM investors ORDER BY name ASC",
        &[],
    ).await?;

    let mut investors = Vec::with_capacity(rows.len());
    for row in &rows {
        investors.push(row_to_investor(row)?);
    }
    Ok(investors)
}

/// Check whether an investor exists, inside a transaction.
pub async fn investor_exists_tx(tx: &Transaction<'_>, id: Uuid) -> Result<bool, DatabaseError> {
    let row = tx.query_one(
        "SELECT EXISTS(SELECT 1 FROM investors WHERE id = $1) AS present",
        &[&id],
    ).await?;
    Ok(row.get("present"))
}

// ============================================
// COMMITMENT QUERIES
// ============================================

/// Find an existing commitment for a (fund, investor) pair.
pub async fn find_commitment_tx(
    tx: &Transaction<'_>,
    fund_id: Uuid,
    investor_id: Uuid,
) -> Result<Option<CommitmentRecord>, DatabaseError> {
    let rows = tx.query(
        "SELECT * FROM commitments WHERE fund_id = $1 AND investor_id = $2",
        &[&fund_id, &investor_id],
    ).await?;

    match rows.first() {
        Some(row) => Ok(Some(row_to_commitment(row)?)),
        None => Ok(None),
    }
}

/// Insert a commitment row.
pub async fn insert_commitment_tx(
    tx: &Transaction<'_>,
    c: &CommitmentRecord,
) -> Result<(), DatabaseError> {
    tx.execute(
        r#"
        INSERT INTO commitments (
            id, fund_id, investor_id, amount, commitment_date,
            called_to_date, distributed_to_date, nav_estimate, ownership_pct,
            created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
        &[
            &c.id,
            &c.fund_id,
            &c.investor_id,
            &c.amount,
            &c.commitment_date,
            &c.called_to_date,
            &c.distributed_to_date,
            &c.nav_estimate,
            &c.ownership_pct,
            &c.created_at,
            &c.updated_at,
        ],
    ).await?;
    Ok(())
}

/// List a fund's commitments in the ledger's stable order:
/// commitment date ascending, then id.
pub async fn list_fund_commitments_tx(
    tx: &Transaction<'_>,
    fund_id: Uuid,
) -> Result<Vec<CommitmentRecord>, DatabaseError> {
    let rows = tx.query(
        "SELECT * FROM commitments WHERE fund_id = $1 ORDER BY commitment_date ASC, id ASC",
        &[&fund_id],
    ).await?;

    let mut commitments = Vec::with_capacity(rows.len());
    for row in &rows {
        commitments.push(row_to_commitment(row)?);
    }
    Ok(commitments)
}

/// Pool-side variant of [`list_fund_commitments_tx`] for read paths.
pub async fn list_fund_commitments(
    pool: &Pool,
    fund_id: Uuid,
) -> Result<Vec<CommitmentRecord>, DatabaseError> {
    let client = pool.get().await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    let rows = client.query(
        "SELECT * FROM commitments WHERE fund_id = $1 ORDER BY commitment_date ASC, id ASC",
        &[&fund_id],
    ).await?;

    let mut commitments = Vec::with_capacity(rows.len());
    for row in &rows {
        commitments.push(row_to_commitment(row)?);
    }
    Ok(commitments)
}

/// Overwrite a commitment's ownership percentage.
pub async fn update_ownership_tx(
    tx: &Transaction<'_>,
    commitment_id: Uuid,
    ownership_pct: Decimal,
) -> Result<(), DatabaseError> {
    tx.execute(
        "UPDATE commitments SET ownership_pct = $2, updated_at = NOW() WHERE id = $1",
        &[&commitment_id, &ownership_pct],
    ).await?;
    Ok(())
}

/// Apply a settled capital-call detail to its commitment: the received
/// amount becomes called (and invested) capital.
pub async fn apply_call_settlement_tx(
    tx: &Transaction<'_>,
    commitment_id: Uuid,
    amount: Decimal,
) -> Result<(), DatabaseError> {
    tx.execute(
        r#"
        UPDATE commitments
        SET called_to_date = called_to_date + $2,
            nav_estimate = nav_estimate + $2,
            updated_at = NOW()
        WHERE id = $1
        "#,
        &[&commitment_id, &amount],
    ).await?;
    Ok(())
}

/// Apply a settled distribution detail to its commitment.
///
/// `nav_reduction` is the gross amount for returnOfCapital/capitalGain
/// distributions and zero for income.
pub async fn apply_distribution_settlement_tx(
    tx: &Transaction<'_>,
    commitment_id: Uuid,
    gross_amount: Decimal,
    nav_reduction: Decimal,
) -> Result<(), DatabaseError> {
    tx.execute(
        r#"
        UPDATE commitments
        SET distributed_to_date = distributed_to_date + $2,
            nav_estimate = nav_estimate - $3,
            updated_at = NOW()
        WHERE id = $1
        "#,
        &[&commitment_id, &gross_amount, &nav_reduction],
    ).await?;
    Ok(())
}

// ============================================
// CAPITAL CALL QUERIES
// ============================================

/// Next strictly-increasing call number for a fund.
pub async fn next_call_number_tx(tx: &Transaction<'_>, fund_id: Uuid) -> Result<i32, DatabaseError> {
    let row = tx.query_one(
        "SELECT COALESCE(MAX(call_number), 0) + 1 AS next FROM capital_calls WHERE fund_id = $1",
        &[&fund_id],
    ).await?;
    Ok(row.get("next"))
}

/// Sum of called amounts still in flight per commitment: details of the
/// fund's calls that have not yet settled into `called_to_date`.
/// Commitments with no open details are absent from the map.
pub async fn outstanding_called_by_commitment_tx(
    tx: &Transaction<'_>,
    fund_id: Uuid,
) -> Result<HashMap<Uuid, Decimal>, DatabaseError> {
    let rows = tx.query(
        r#"
        SELECT d.commitment_id, SUM(d.called_amount) AS outstanding
        FROM capital_call_details d
        JOIN capital_calls c ON c.id = d.call_id
        WHERE c.fund_id = $1 AND d.settled_at IS NULL
        GROUP BY d.commitment_id
        "#,
        &[&fund_id],
    ).await?;

    let mut outstanding = HashMap::with_capacity(rows.len());
    for row in &rows {
        outstanding.insert(row.get("commitment_id"), row.get("outstanding"));
    }
    Ok(outstanding)
}

/// Insert a capital call row.
pub async fn insert_capital_call_tx(
    tx: &Transaction<'_>,
    call: &CapitalCallRecord,
) -> Result<(), DatabaseError> {
    tx.execute(
        r#"
        INSERT INTO capital_calls (
            id, fund_id, call_number, call_date, due_date,
            total_amount, received_amount, status, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
        &[
            &call.id,
            &call.fund_id,
            &call.call_number,
            &call.call_date,
            &call.due_date,
            &call.total_amount,
            &call.received_amount,
            &call.status.as_str(),
            &call.created_at,
            &call.updated_at,
        ],
    ).await?;
    Ok(())
}

/// Insert a capital call detail row.
pub async fn insert_call_detail_tx(
    tx: &Transaction<'_>,
    detail: &CapitalCallDetailRecord,
) -> Result<(), DatabaseError> {
    tx.execute(
        r#"
        INSERT INTO capital_call_details (
            id, call_id, commitment_id, investor_id, called_amount,
            received_amount, received_date, settled_at, status,
            created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
        &[
            &detail.id,
            &detail.call_id,
            &detail.commitment_id,
            &detail.investor_id,
            &detail.called_amount,
            &detail.received_amount,
            &detail.received_date,
            &detail.settled_at,
            &detail.status.as_str(),
            &detail.created_at,
            &detail.updated_at,
        ],
    ).await?;
    Ok(())
}

/// Get a capital call by id.
pub async fn get_capital_call(pool: &Pool, id: Uuid) -> Result<Option<CapitalCallRecord>, DatabaseError> {
    let client = pool.get().await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    let rows = client.query(
        "SELECT * FROM capital_calls WHERE id = $1",
        &[&id],
    ).await?;

    match rows.first() {
        Some(row) => Ok(Some(row_to_call(row)?)),
        None => Ok(None),
    }
}

/// Get a capital call by id, locked for the surrounding transaction.
pub async fn get_capital_call_tx(
    tx: &Transaction<'_>,
    id: Uuid,
) -> Result<Option<CapitalCallRecord>, DatabaseError> {
    let rows = tx.query(
        "SELECT * FROM capital_calls WHERE id = $1 FOR UPDATE",
        &[&id],
    ).await?;

    match rows.first() {
        Some(row) => Ok(Some(row_to_call(row)?)),
        None => Ok(None),
    }
}

/// List a fund's capital calls, oldest first.
pub async fn list_fund_calls(pool: &Pool, fund_id: Uuid) -> Result<Vec<CapitalCallRecord>, DatabaseError> {
    let client = pool.get().await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    let rows = client.query(
        "SELECT * FROM capital_calls WHERE fund_id = $1 ORDER BY call_number ASC",
        &[&fund_id],
    ).await?;

    let mut calls = Vec::with_capacity(rows.len());
    for row in &rows {
        calls.push(row_to_call(row)?);
    }
    Ok(calls)
}

/// List a call's details in allocation order.
pub async fn list_call_details(pool: &Pool, call_id: Uuid) -> Result<Vec<CapitalCallDetailRecord>, DatabaseError> {
    let client = pool.get().await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    let rows = client.query(
        "SELECT * FROM capital_call_details WHERE call_id = $1 ORDER BY created_at ASC, id ASC",
        &[&call_id],
    ).await?;

    let mut details = Vec::with_capacity(rows.len());
    for row in &rows {
        details.push(row_to_call_detail(row)?);
    }
    Ok(details)
}

/// Get one call detail inside a transaction.
pub async fn get_call_detail_tx(
    tx: &Transaction<'_>,
    detail_id: Uuid,
) -> Result<Option<CapitalCallDetailRecord>, DatabaseError> {
    let rows = tx.query(
        "SELECT * FROM capital_call_details WHERE id = $1 FOR UPDATE",
        &[&detail_id],
    ).await?;

    match rows.first() {
        Some(row) => Ok(Some(row_to_call_detail(row)?)),
        None => Ok(None),
    }
}

/// Record payment against a call detail.
pub async fn record_call_detail_payment_tx(
    tx: &Transaction<'_>,
    detail_id: Uuid,
    received_amount: Decimal,
    received_date: NaiveDate,
) -> Result<(), DatabaseError> {
    tx.execute(
        r#"
        UPDATE capital_call_details
        SET received_amount = $2,
            received_date = $3,
            status = 'paid',
            updated_at = NOW()
        WHERE id = $1
        "#,
        &[&detail_id, &received_amount, &received_date],
    ).await?;
    Ok(())
}

/// Add a received payment to the parent call's running total.
pub async fn add_call_received_tx(
    tx: &Transaction<'_>,
    call_id: Uuid,
    amount: Decimal,
) -> Result<(), DatabaseError> {
    tx.execute(
        "UPDATE capital_calls SET received_amount = received_amount + $2, updated_at = NOW() WHERE id = $1",
        &[&call_id, &amount],
    ).await?;
    Ok(())
}

/// All details of a call, locked. Settlement loads the full set, so
/// concurrent notifications for the same call serialize and both the
/// apply filter and the completion check work off one snapshot.
pub async fn list_call_details_tx(
    tx: &Transaction<'_>,
    call_id: Uuid,
) -> Result<Vec<CapitalCallDetailRecord>, DatabaseError> {
    let rows = tx.query(
        r#"
        SELECT * FROM capital_call_details
        WHERE call_id = $1
        ORDER BY id ASC
        FOR UPDATE
        "#,
        &[&call_id],
    ).await?;

    let mut details = Vec::with_capacity(rows.len());
    for row in &rows {
        details.push(row_to_call_detail(row)?);
    }
    Ok(details)
}

/// Stamp a call detail as applied to its commitment.
pub async fn mark_call_detail_settled_tx(
    tx: &Transaction<'_>,
    detail_id: Uuid,
) -> Result<(), DatabaseError> {
    tx.execute(
        "UPDATE capital_call_details SET settled_at = $2, updated_at = NOW() WHERE id = $1",
        &[&detail_id, &Utc::now()],
    ).await?;
    Ok(())
}

/// Set a capital call's status.
pub async fn set_call_status_tx(
    tx: &Transaction<'_>,
    call_id: Uuid,
    status: CallStatus,
) -> Result<(), DatabaseError> {
    tx.execute(
        "UPDATE capital_calls SET status = $2, updated_at = NOW() WHERE id = $1",
        &[&call_id, &status.as_str()],
    ).await?;
    Ok(())
}

// ============================================
// DISTRIBUTION QUERIES
// ============================================

/// Next strictly-increasing distribution number for a fund.
pub async fn next_distribution_number_tx(tx: &Transaction<'_>, fund_id: Uuid) -> Result<i32, DatabaseError> {
    let row = tx.query_one(
        "SELECT COALESCE(MAX(distribution_number), 0) + 1 AS next FROM distributions WHERE fund_id = $1",
        &[&fund_id],
    ).await?;
    Ok(row.get("next"))
}

/// Insert a distribution row.
pub async fn insert_distribution_tx(
    tx: &Transaction<'_>,
    dist: &DistributionRecord,
) -> Result<(), DatabaseError> {
    tx.execute(
        r#"
        INSERT INTO distributions (
            id, fund_id, distribution_number, distribution_date, payment_date,
            distribution_type, total_amount, paid_amount, status,
            created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
        &[
            &dist.id,
            &dist.fund_id,
            &dist.distribution_number,
            &dist.distribution_date,
            &dist.payment_date,
            &dist.distribution_type.as_str(),
            &dist.total_amount,
            &dist.paid_amount,
            &dist.status.as_str(),
            &dist.created_at,
            &dist.updated_at,
        ],
    ).await?;
    Ok(())
}

/// Insert a distribution detail row.
pub async fn insert_distribution_detail_tx(
    tx: &Transaction<'_>,
    detail: &DistributionDetailRecord,
) -> Result<(), DatabaseError> {
    tx.execute(
        r#"
        INSERT INTO distribution_details (
            id, distribution_id, commitment_id, investor_id, gross_amount,
            paid_amount, withholding_tax, net_amount, payment_date,
            settled_at, status, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        "#,
        &[
            &detail.id,
            &detail.distribution_id,
            &detail.commitment_id,
            &detail.investor_id,
            &detail.gross_amount,
            &detail.paid_amount,
            &detail.withholding_tax,
            &detail.net_amount,
            &detail.payment_date,
            &detail.settled_at,
            &detail.status.as_str(),
            &detail.created_at,
            &detail.updated_at,
        ],
    ).await?;
    Ok(())
}

/// Get a distribution by id.
pub async fn get_distribution(pool: &Pool, id: Uuid) -> Result<Option<DistributionRecord>, DatabaseError> {
    let client = pool.get().await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    let rows = client.query(
        "SELECT * FROM distributions WHERE id = $1",
        &[&id],
    ).await?;

    match rows.first() {
        Some(row) => Ok(Some(row_to_distribution(row)?)),
        None => Ok(None),
    }
}

/// Get a distribution by id, locked for the surrounding transaction.
pub async fn get_distribution_tx(
    tx: &Transaction<'_>,
    id: Uuid,
) -> Result<Option<DistributionRecord>, DatabaseError> {
    let rows = tx.query(
        "SELECT * FROM distributions WHERE id = $1 FOR UPDATE",
        &[&id],
    ).await?;

    match rows.first() {
        Some(row) => Ok(Some(row_to_distribution(row)?)),
        None => Ok(None),
    }
}

/// List a fund's distributions, oldest first.
pub async fn list_fund_distributions(pool: &Pool, fund_id: Uuid) -> Result<Vec<DistributionRecord>, DatabaseError> {
    let client = pool.get().await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    let rows = client.query(
        "SELECT * FROM distributions WHERE fund_id = $1 ORDER BY distribution_number ASC",
        &[&fund_id],
    ).await?;

    let mut distributions = Vec::with_capacity(rows.len());
    for row in &rows {
        distributions.push(row_to_distribution(row)?);
    }
    Ok(distributions)
}

/// List a distribution's details in allocation order.
pub async fn list_distribution_details(
    pool: &Pool,
    distribution_id: Uuid,
) -> Result<Vec<DistributionDetailRecord>, DatabaseError> {
    let client = pool.get().await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    let rows = client.query(
        "SELECT * FROM distribution_details WHERE distribution_id = $1 ORDER BY created_at ASC, id ASC",
        &[&distribution_id],
    ).await?;

    let mut details = Vec::with_capacity(rows.len());
    for row in &rows {
        details.push(row_to_distribution_detail(row)?);
    }
    Ok(details)
}

/// Get one distribution detail inside a transaction.
pub async fn get_distribution_detail_tx(
    tx: &Transaction<'_>,
    detail_id: Uuid,
) -> Result<Option<DistributionDetailRecord>, DatabaseError> {
    let rows = tx.query(
        "SELECT * FROM distribution_details WHERE id = $1 FOR UPDATE",
        &[&detail_id],
    ).await?;

    match rows.first() {
        Some(row) => Ok(Some(row_to_distribution_detail(row)?)),
        None => Ok(None),
    }
}

/// Record payment against a distribution detail.
///
/// `net_amount` is stored alongside so the `net = paid - withholding`
/// invariant is queryable without recomputation.
pub async fn record_distribution_detail_payment_tx(
    tx: &Transaction<'_>,
    detail_id: Uuid,
    paid_amount: Decimal,
    net_amount: Decimal,
    payment_date: NaiveDate,
) -> Result<(), DatabaseError> {
    tx.execute(
        r#"
        UPDATE distribution_details
        SET paid_amount = $2,
            net_amount = $3,
            payment_date = $4,
            status = 'paid',
            updated_at = NOW()
        WHERE id = $1
        "#,
        &[&detail_id, &paid_amount, &net_amount, &payment_date],
    ).await?;
    Ok(())
}

/// Add a paid amount to the parent distribution's running total.
pub async fn add_distribution_paid_tx(
    tx: &Transaction<'_>,
    distribution_id: Uuid,
    amount: Decimal,
) -> Result<(), DatabaseError> {
    tx.execute(
        "UPDATE distributions SET paid_amount = paid_amount + $2, updated_at = NOW() WHERE id = $1",
        &[&distribution_id, &amount],
    ).await?;
    Ok(())
}

/// All details of a distribution, locked for settlement.
pub async fn list_distribution_details_tx(
    tx: &Transaction<'_>,
    distribution_id: Uuid,
) -> Result<Vec<DistributionDetailRecord>, DatabaseError> {
    let rows = tx.query(
        r#"
        SELECT * FROM distribution_details
        WHERE distribution_id = $1
        ORDER BY id ASC
        FOR UPDATE
        "#,
        &[&distribution_id],
    ).await?;

    let mut details = Vec::with_capacity(rows.len());
    for row in &rows {
        details.push(row_to_distribution_detail(row)?);
    }
    Ok(details)
}

/// Stamp a distribution detail as applied to its commitment.
pub async fn mark_distribution_detail_settled_tx(
    tx: &Transaction<'_>,
    detail_id: Uuid,
) -> Result<(), DatabaseError> {
    tx.execute(
        "UPDATE distribution_details SET settled_at = $2, updated_at = NOW() WHERE id = $1",
        &[&detail_id, &Utc::now()],
    ).await?;
    Ok(())
}

/// Set a distribution's status.
pub async fn set_distribution_status_tx(
    tx: &Transaction<'_>,
    distribution_id: Uuid,
    status: DistributionStatus,
) -> Result<(), DatabaseError> {
    tx.execute(
        "UPDATE distributions SET status = $2, updated_at = NOW() WHERE id = $1",
        &[&distribution_id, &status.as_str()],
    ).await?;
    Ok(())
}
