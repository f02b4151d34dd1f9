//! # API Request Handlers
//!
//! This module contains the handler functions for each API endpoint.
//! Each handler:
//! 1. Extracts request data
//! 2. Validates input
//! 3. Calls the appropriate service
//! 4. Returns a formatted response
//!
//! ## Error Handling
//!
//! All errors are caught and returned as JSON:
//!
//! ```json
//! {
//!     "success": false,
//!     "error": {
//!         "code": "OVER_COMMITMENT_EXCEEDED",
//!         "message": "Call exceeds remaining commitment for investor ..."
//!     }
//! }
//! ```
//!
//! | LedgerError | HTTP status |
//! |-------------|-------------|
//! | NotFound | 404 |
//! | DuplicateCommitment, ImmutableRecord | 409 |
//! | Validation, OverCommitmentExceeded, InvalidAllocation | 400 |
//! | Database | 500 |

use std::sync::Arc;

use actix_web::{web, HttpResponse};
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use crate::db::{queries, DatabaseError, FundRecord, FundStatus, InvestorRecord};
use crate::models::{
    AddCommitmentRequest, ApiResponse, CapitalCallResponse, CreateCallRequest,
    CreateDistributionRequest, CreateFundRequest, CreateInvestorRequest, DistributionResponse,
    HealthResponse, RecordPaymentRequest, UpdateFundStatusRequest,
};
use crate::services::LedgerError;
use crate::AppState;

/// Map a ledger error onto the response envelope and an HTTP status.
fn ledger_error_response(e: &LedgerError) -> HttpResponse {
    let body = ApiResponse::<()>::error(e.code(), &e.to_string());
    match e {
        LedgerError::NotFound(_) => HttpResponse::NotFound().json(body),
        LedgerError::DuplicateCommitment { .. } | LedgerError::ImmutableRecord(_) => {
            HttpResponse::Conflict().json(body)
        }
        LedgerError::Database(_) => {
            error!("Ledger database error: {}", e);
            HttpResponse::InternalServerError().json(body)
        }
        _ => HttpResponse::BadRequest().json(body),
    }
}

/// Map a raw database error (CRUD paths) onto the envelope.
fn db_error_response(e: &DatabaseError) -> HttpResponse {
    match e {
        DatabaseError::NotFound(msg) => {
            HttpResponse::NotFound().json(ApiResponse::<()>::error("NOT_FOUND", msg))
        }
        other => {
            error!("Database error: {}", other);
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("DATABASE_ERROR", &other.to_string()))
        }
    }
}

/// API information endpoint (root).
///
/// Returns information about available API endpoints.
///
/// ## Endpoint
///
/// `GET /`
pub async fn api_info() -> HttpResponse {
    let info = json!({
        "name": "Fund Ledger API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Capital account ledger for fund administration",
        "endpoints": {
            "health": { "method": "GET", "path": "/health" },
            "funds": {
                "create": { "method": "POST", "path": "/funds" },
                "list": { "method": "GET", "path": "/funds" },
                "get": { "method": "GET", "path": "/funds/{id}" },
                "updateStatus": { "method": "PUT", "path": "/funds/{id}/status" },
                "summary": { "method": "GET", "path": "/funds/{id}/summary" },
                "commitments": {
                    "add": { "method": "POST", "path": "/funds/{id}/commitments" },
                    "list": { "method": "GET", "path": "/funds/{id}/commitments" }
                },
                "capitalCalls": {
                    "create": { "method": "POST", "path": "/funds/{id}/capital-calls" },
                    "list": { "method": "GET", "path": "/funds/{id}/capital-calls" }
                },
                "distributions": {
                    "create": { "method": "POST", "path": "/funds/{id}/distributions" },
                    "list": { "method": "GET", "path": "/funds/{id}/distributions" }
                }
            },
            "investors": {
                "create": { "method": "POST", "path": "/investors" },
                "list": { "method": "GET", "path": "/investors" },
                "get": { "method": "GET", "path": "/investors/{id}" }
            },
            "capitalCalls": {
                "get": { "method": "GET", "path": "/capital-calls/{id}" },
                "recordPayment": { "method": "POST", "path": "/capital-calls/{id}/details/{detailId}/payment" },
                "settle": { "method": "POST", "path": "/capital-calls/{id}/settle" }
            },
            "distributions": {
                "get": { "method": "GET", "path": "/distributions/{id}" },
                "recordPayment": { "method": "POST", "path": "/distributions/{id}/details/{detailId}/payment" },
                "settle": { "method": "POST", "path": "/distributions/{id}/settle" }
            }
        }
    });

    HttpResponse::Ok().json(ApiResponse::success(info))
}

/// Health check endpoint.
///
/// ## Endpoint
///
/// `GET /health`
///
/// ## Example
///
/// ```bash
/// curl http://127.0.0.1:8080/health
/// ```
pub async fn health_check(state: web::Data<Arc<AppState>>) -> HttpResponse {
    let db_healthy = state.db.pool().get().await.is_ok();

    let response = HealthResponse {
        status: if db_healthy { "healthy" } else { "unhealthy" }.to_string(),
        database: db_healthy,
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    };

    let status_code = if db_healthy {
        actix_web::http::StatusCode::OK
    } else {
        actix_web::http::StatusCode::SERVICE_UNAVAILABLE
    };

    HttpResponse::build(status_code).json(ApiResponse::success(response))
}

// ==========================================
// FUND CRUD
// ==========================================

/// Create a fund.
///
/// Funds start in `fundraising` status; the ledger never transitions
/// status on its own.
///
/// ## Endpoint
///
/// `POST /funds`
///
/// ## Example
///
/// ```bash
/// curl -X POST http://127.0.0.1:8080/funds \
///   -H "Content-Type: application/json" \
///   -d '{
///     "name": "Growth Fund II",
///     "currency": "USD",
///     "targetSize": "250000000",
///     "vintageYear": 2024,
///     "inceptionDate": "2024-03-01",
///     "termMonths": 120
///   }'
/// ```
pub async fn create_fund(
    state: web::Data<Arc<AppState>>,
    body: web::Json<CreateFundRequest>,
) -> HttpResponse {
    let req = body.into_inner();

    if req.target_size <= Decimal::ZERO {
        return HttpResponse::BadRequest().json(ApiResponse::<()>::error(
            "VALIDATION_ERROR",
            "targetSize must be greater than 0",
        ));
    }
    if req.name.trim().is_empty() {
        return HttpResponse::BadRequest().json(ApiResponse::<()>::error(
            "VALIDATION_ERROR",
            "name must not be empty",
        ));
    }

    let now = Utc::now();
    let fund = FundRecord {
        id: Uuid::new_v4(),
        name: req.name,
        currency: req.currency.to_ascii_uppercase(),
        target_size: req.target_size,
        vintage_year: req.vintage_year,
        inception_date: req.inception_date,
        term_months: req.term_months,
        extension_months: req.extension_months,
        status: FundStatus::Fundraising,
        management_fee_rate: req.management_fee_rate,
        performance_fee_rate: req.performance_fee_rate,
        hurdle_rate: req.hurdle_rate,
        created_at: now,
        updated_at: now,
    };

    match queries::insert_fund(state.db.pool(), &fund).await {
        Ok(()) => HttpResponse::Created().json(ApiResponse::success(fund)),
        Err(e) => db_error_response(&e),
    }
}

/// List all funds.
///
/// `GET /funds`
pub async fn list_funds(state: web::Data<Arc<AppState>>) -> HttpResponse {
    match queries::list_funds(state.db.pool()).await {
        Ok(funds) => HttpResponse::Ok().json(ApiResponse::success(funds)),
        Err(e) => db_error_response(&e),
    }
}

/// Get one fund.
///
/// `GET /funds/{id}`
pub async fn get_fund(
    state: web::Data<Arc<AppState>>,
    path: web::Path<Uuid>,
) -> HttpResponse {
    let id = path.into_inner();
    match queries::get_fund(state.db.pool(), id).await {
        Ok(Some(fund)) => HttpResponse::Ok().json(ApiResponse::success(fund)),
        Ok(None) => HttpResponse::NotFound().json(ApiResponse::<()>::error(
            "NOT_FOUND",
            &format!("Fund not found: {}", id),
        )),
        Err(e) => db_error_response(&e),
    }
}

/// Transition a fund's lifecycle status (externally driven).
///
/// `PUT /funds/{id}/status`
pub async fn update_fund_status(
    state: web::Data<Arc<AppState>>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateFundStatusRequest>,
) -> HttpResponse {
    let id = path.into_inner();
    match queries::update_fund_status(state.db.pool(), id, body.status).await {
        Ok(()) => HttpResponse::Ok().json(ApiResponse::success(json!({
            "fundId": id,
            "status": body.status,
        }))),
        Err(e) => db_error_response(&e),
    }
}

// ==========================================
// INVESTOR CRUD
// ==========================================

/// Create an investor.
///
/// `POST /investors`
pub async fn create_investor(
    state: web::Data<Arc<AppState>>,
    body: web::Json<CreateInvestorRequest>,
) -> HttpResponse {
    let req = body.into_inner();

    if req.name.trim().is_empty() {
        return HttpResponse::BadRequest().json(ApiResponse::<()>::error(
            "VALIDATION_ERROR",
            "name must not be empty",
        ));
    }

    let now = Utc::now();
    let investor = InvestorRecord {
        id: Uuid::new_v4(),
        name: req.name,
        investor_type: req.investor_type,
        domicile: req.domicile,
        contact_email: req.contact_email,
        status: "active".to_string(),
        created_at: now,
        updated_at: now,
    };

    match queries::insert_investor(state.db.pool(), &investor).await {
        Ok(()) => HttpResponse::Created().json(ApiResponse::success(investor)),
        Err(e) => db_error_response(&e),
    }
}

/// List all investors.
///
/// `GET /investors`
pub async fn list_investors(state: web::Data<Arc<AppState>>) -> HttpResponse {
    match queries::list_investors(state.db.pool()).await {
        Ok(investors) => HttpResponse::Ok().json(ApiResponse::success(investors)),
        Err(e) => db_error_response(&e),
    }
}

/// Get one investor.
///
/// `GET /investors/{id}`
pub async fn get_investor(
    state: web::Data<Arc<AppState>>,
    path: web::Path<Uuid>,
) -> HttpResponse {
    let id = path.into_inner();
    match queries::get_investor(state.db.pool(), id).await {
        Ok(Some(investor)) => HttpResponse::Ok().json(ApiResponse::success(investor)),
        Ok(None) => HttpResponse::NotFound().json(ApiResponse::<()>::error(
            "NOT_FOUND",
            &format!("Investor not found: {}", id),
        )),
        Err(e) => db_error_response(&e),
    }
}

// ==========================================
// COMMITMENTS
// ==========================================

/// Add an investor's commitment to a fund.
///
/// Recomputes ownership percentages for every existing commitment in the
/// fund as a side effect.
///
/// ## Endpoint
///
/// `POST /funds/{id}/commitments`
///
/// ## Example
///
/// ```bash
/// curl -X POST http://127.0.0.1:8080/funds/FUND_ID/commitments \
///   -H "Content-Type: application/json" \
///   -d '{
///     "investorId": "INVESTOR_ID",
///     "amount": "25000000",
///     "commitmentDate": "2024-04-15"
///   }'
/// ```
pub async fn add_commitment(
    state: web::Data<Arc<AppState>>,
    path: web::Path<Uuid>,
    body: web::Json<AddCommitmentRequest>,
) -> HttpResponse {
    let fund_id = path.into_inner();
    let req = body.into_inner();

    match state
        .registry
        .add_commitment(fund_id, req.investor_id, req.amount, req.commitment_date)
        .await
    {
        Ok(commitment) => HttpResponse::Created().json(ApiResponse::success(commitment)),
        Err(e) => ledger_error_response(&e),
    }
}

/// List a fund's commitments in stable order.
///
/// `GET /funds/{id}/commitments`
pub async fn list_commitments(
    state: web::Data<Arc<AppState>>,
    path: web::Path<Uuid>,
) -> HttpResponse {
    let fund_id = path.into_inner();
    match state.registry.get_commitments(fund_id).await {
        Ok(commitments) => HttpResponse::Ok().json(ApiResponse::success(commitments)),
        Err(e) => ledger_error_response(&e),
    }
}

// ==========================================
// CAPITAL CALLS
// ==========================================

/// Create a capital call.
///
/// Allocates the fund-level amount pro-rata across all commitments; the
/// call and its details become visible atomically.
///
/// ## Endpoint
///
/// `POST /funds/{id}/capital-calls`
///
/// ## Example
///
/// ```bash
/// curl -X POST http://127.0.0.1:8080/funds/FUND_ID/capital-calls \
///   -H "Content-Type: application/json" \
///   -d '{
///     "totalAmount": "10000000",
///     "callDate": "2025-01-10",
///     "dueDate": "2025-02-10"
///   }'
/// ```
pub async fn create_capital_call(
    state: web::Data<Arc<AppState>>,
    path: web::Path<Uuid>,
    body: web::Json<CreateCallRequest>,
) -> HttpResponse {
    let fund_id = path.into_inner();
    let req = body.into_inner();

    info!(
        "Capital call requested: fund={} total={}",
        fund_id, req.total_amount
    );

    match state
        .call_allocator
        .create_call(fund_id, req.total_amount, req.call_date, req.due_date)
        .await
    {
        Ok(created) => {
            HttpResponse::Created().json(ApiResponse::success(CapitalCallResponse::from(created)))
        }
        Err(e) => ledger_error_response(&e),
    }
}

/// List a fund's capital calls, each with its per-investor details.
///
/// `GET /funds/{id}/capital-calls`
pub async fn list_capital_calls(
    state: web::Data<Arc<AppState>>,
    path: web::Path<Uuid>,
) -> HttpResponse {
    let fund_id = path.into_inner();

    let calls = match queries::list_fund_calls(state.db.pool(), fund_id).await {
        Ok(calls) => calls,
        Err(e) => return db_error_response(&e),
    };

    let mut out = Vec::with_capacity(calls.len());
    for call in calls {
        match queries::list_call_details(state.db.pool(), call.id).await {
            Ok(details) => out.push(CapitalCallResponse { call, details }),
            Err(e) => return db_error_response(&e),
        }
    }

    HttpResponse::Ok().json(ApiResponse::success(out))
}

/// Get one capital call with its details.
///
/// `GET /capital-calls/{id}`
pub async fn get_capital_call(
    state: web::Data<Arc<AppState>>,
    path: web::Path<Uuid>,
) -> HttpResponse {
    let call_id = path.into_inner();

    let call = match queries::get_capital_call(state.db.pool(), call_id).await {
        Ok(Some(call)) => call,
        Ok(None) => {
            return HttpResponse::NotFound().json(ApiResponse::<()>::error(
                "NOT_FOUND",
                &format!("Capital call not found: {}", call_id),
            ))
        }
        Err(e) => return db_error_response(&e),
    };

    match queries::list_call_details(state.db.pool(), call_id).await {
        Ok(details) => {
            HttpResponse::Ok().json(ApiResponse::success(CapitalCallResponse { call, details }))
        }
        Err(e) => db_error_response(&e),
    }
}

/// Record an investor's payment against a call detail.
///
/// `POST /capital-calls/{id}/details/{detailId}/payment`
pub async fn record_call_payment(
    state: web::Data<Arc<AppState>>,
    path: web::Path<(Uuid, Uuid)>,
    body: web::Json<RecordPaymentRequest>,
) -> HttpResponse {
    let (call_id, detail_id) = path.into_inner();
    let req = body.into_inner();

    match state
        .aggregator
        .record_call_payment(call_id, detail_id, req.amount, req.payment_date)
        .await
    {
        Ok(()) => HttpResponse::Ok().json(ApiResponse::success(json!({
            "callId": call_id,
            "detailId": detail_id,
            "status": "paid",
        }))),
        Err(e) => ledger_error_response(&e),
    }
}

/// Settle a capital call: apply all paid details to their commitments.
///
/// Idempotent; safe to invoke from retried settlement notifications.
///
/// `POST /capital-calls/{id}/settle`
pub async fn settle_capital_call(
    state: web::Data<Arc<AppState>>,
    path: web::Path<Uuid>,
) -> HttpResponse {
    let call_id = path.into_inner();
    match state.aggregator.on_call_settled(call_id).await {
        Ok(outcome) => HttpResponse::Ok().json(ApiResponse::success(outcome)),
        Err(e) => ledger_error_response(&e),
    }
}

// ==========================================
// DISTRIBUTIONS
// ==========================================

/// Create a distribution.
///
/// Allocates by current ownership percentage and applies withholding tax
/// per investor.
///
/// ## Endpoint
///
/// `POST /funds/{id}/distributions`
pub async fn create_distribution(
    state: web::Data<Arc<AppState>>,
    path: web::Path<Uuid>,
    body: web::Json<CreateDistributionRequest>,
) -> HttpResponse {
    let fund_id = path.into_inner();
    let req = body.into_inner();

    info!(
        "Distribution requested: fund={} total={} type={:?}",
        fund_id, req.total_amount, req.distribution_type
    );

    match state
        .distribution_allocator
        .create_distribution(
            fund_id,
            req.total_amount,
            req.distribution_date,
            req.payment_date,
            req.distribution_type,
            req.withholding_rate,
            &req.withholding_overrides,
        )
        .await
    {
        Ok(created) => {
            HttpResponse::Created().json(ApiResponse::success(DistributionResponse::from(created)))
        }
        Err(e) => ledger_error_response(&e),
    }
}

/// List a fund's distributions (without details).
///
/// `GET /funds/{id}/distributions`
pub async fn list_distributions(
    state: web::Data<Arc<AppState>>,
    path: web::Path<Uuid>,
) -> HttpResponse {
    let fund_id = path.into_inner();
    match queries::list_fund_distributions(state.db.pool(), fund_id).await {
        Ok(distributions) => HttpResponse::Ok().json(ApiResponse::success(distributions)),
        Err(e) => db_error_response(&e),
    }
}

/// Get one distribution with its details.
///
/// `GET /distributions/{id}`
pub async fn get_distribution(
    state: web::Data<Arc<AppState>>,
    path: web::Path<Uuid>,
) -> HttpResponse {
    let distribution_id = path.into_inner();

    let distribution = match queries::get_distribution(state.db.pool(), distribution_id).await {
        Ok(Some(d)) => d,
        Ok(None) => {
            return HttpResponse::NotFound().json(ApiResponse::<()>::error(
                "NOT_FOUND",
                &format!("Distribution not found: {}", distribution_id),
            ))
        }
        Err(e) => return db_error_response(&e),
    };

    match queries::list_distribution_details(state.db.pool(), distribution_id).await {
        Ok(details) => HttpResponse::Ok().json(ApiResponse::success(DistributionResponse {
            distribution,
            details,
        })),
        Err(e) => db_error_response(&e),
    }
}

/// Record a payout against a distribution detail.
///
/// `POST /distributions/{id}/details/{detailId}/payment`
pub async fn record_distribution_payment(
    state: web::Data<Arc<AppState>>,
    path: web::Path<(Uuid, Uuid)>,
    body: web::Json<RecordPaymentRequest>,
) -> HttpResponse {
    let (distribution_id, detail_id) = path.into_inner();
    let req = body.into_inner();

    match state
        .aggregator
        .record_distribution_payment(distribution_id, detail_id, req.amount, req.payment_date)
        .await
    {
        Ok(()) => HttpResponse::Ok().json(ApiResponse::success(json!({
            "distributionId": distribution_id,
            "detailId": detail_id,
            "status": "paid",
        }))),
        Err(e) => ledger_error_response(&e),
    }
}

/// Settle a distribution: apply all paid details to their commitments.
///
/// `POST /distributions/{id}/settle`
pub async fn settle_distribution(
    state: web::Data<Arc<AppState>>,
    path: web::Path<Uuid>,
) -> HttpResponse {
    let distribution_id = path.into_inner();
    match state.aggregator.on_distribution_paid(distribution_id).await {
        Ok(outcome) => HttpResponse::Ok().json(ApiResponse::success(outcome)),
        Err(e) => ledger_error_response(&e),
    }
}

// ==========================================
// SUMMARY
// ==========================================

/// Fund-level roll-up of committed/called/distributed/NAV.
///
/// ## Endpoint
///
/// `GET /funds/{id}/summary`
///
/// ## Example Response
///
/// ```json
/// {
///     "success": true,
///     "data": {
///         "fundId": "...",
///         "totalCommitted": "200000000",
///         "totalCalled": "50000000",
///         "totalDistributed": "10000000",
///         "netNav": "40000000",
///         "investorCount": 12
///     }
/// }
/// ```
pub async fn fund_summary(
    state: web::Data<Arc<AppState>>,
    path: web::Path<Uuid>,
) -> HttpResponse {
    let fund_id = path.into_inner();
    match state.aggregator.fund_summary(fund_id).await {
        Ok(summary) => HttpResponse::Ok().json(ApiResponse::success(summary)),
        Err(e) => ledger_error_response(&e),
    }
}
