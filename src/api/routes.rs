//! # API Route Configuration
//!
//! This module sets up all the HTTP routes for the API.

use actix_web::web;

use super::handlers;

/// Configure all API routes.
///
/// This function is called from main.rs to set up
/// all the endpoint routes.
///
/// ## Route Structure
///
/// ```text
/// /
/// ├── /health                      GET  - Health check
/// ├── /funds
/// │   ├── /                        POST - Create fund, GET - List funds
/// │   └── /{id}
/// │       ├── /                    GET  - Get fund
/// │       ├── /status              PUT  - Update lifecycle status
/// │       ├── /summary             GET  - Fund roll-up
/// │       ├── /commitments         POST - Add commitment, GET - List
/// │       ├── /capital-calls       POST - Create call, GET - List
/// │       └── /distributions       POST - Create distribution, GET - List
/// ├── /investors
/// │   ├── /                        POST - Create investor, GET - List
/// │   └── /{id}                    GET  - Get investor
/// ├── /capital-calls/{id}
/// │   ├── /                        GET  - Get call with details
/// │   ├── /details/{detailId}/payment  POST - Record payment
/// │   └── /settle                  POST - Settle paid details
/// └── /distributions/{id}
///     ├── /                        GET  - Get distribution with details
///     ├── /details/{detailId}/payment  POST - Record payout
///     └── /settle                  POST - Settle paid details
/// ```
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg
        // Root endpoint - API information
        .route("/", web::get().to(handlers::api_info))

        // Health check endpoint
        .route("/health", web::get().to(handlers::health_check))

        // Fund endpoints
        .service(
            web::scope("/funds")
                // Create a fund
                .route("", web::post().to(handlers::create_fund))

                // List all funds
                .route("", web::get().to(handlers::list_funds))

                // Get one fund
                .route("/{id}", web::get().to(handlers::get_fund))

                // Update lifecycle status (externally driven)
                .route("/{id}/status", web::put().to(handlers::update_fund_status))

                // Fund-level roll-up
                .route("/{id}/summary", web::get().to(handlers::fund_summary))

                // Add a commitment
                .route(
                    "/{id}/commitments",
                    web::post().to(handlers::add_commitment),
                )

                // List commitments in stable order
                .route(
                    "/{id}/commitments",
                    web::get().to(handlers::list_commitments),
                )

                // Issue a capital call
                .route(
                    "/{id}/capital-calls",
                    web::post().to(handlers::create_capital_call),
                )

                // List the fund's capital calls
                .route(
                    "/{id}/capital-calls",
                    web::get().to(handlers::list_capital_calls),
                )

                // Declare a distribution
                .route(
                    "/{id}/distributions",
                    web::post().to(handlers::create_distribution),
                )

                // List the fund's distributions
                .route(
                    "/{id}/distributions",
                    web::get().to(handlers::list_distributions),
                ),
        )

        // Investor endpoints
        .service(
            web::scope("/investors")
                // Create an investor
                .route("", web::post().to(handlers::create_investor))

                // List all investors
                .route("", web::get().to(handlers::list_investors))

                // Get one investor
                .route("/{id}", web::get().to(handlers::get_investor)),
        )

        // Capital call endpoints (call-scoped)
        .service(
            web::scope("/capital-calls")
                // Get a call with its per-investor details
                .route("/{id}", web::get().to(handlers::get_capital_call))

                // Record an investor payment against a detail
                .route(
                    "/{id}/details/{detailId}/payment",
                    web::post().to(handlers::record_call_payment),
                )

                // Apply paid details to commitments (idempotent)
                .route("/{id}/settle", web::post().to(handlers::settle_capital_call)),
        )

        // Distribution endpoints (distribution-scoped)
        .service(
            web::scope("/distributions")
                // Get a distribution with its per-investor details
                .route("/{id}", web::get().to(handlers::get_distribution))

                // Record a payout against a detail
                .route(
                    "/{id}/details/{detailId}/payment",
                    web::post().to(handlers::record_distribution_payment),
                )

                // Apply paid details to the ledger (idempotent)
                .route(
                    "/{id}/settle",
                    web::post().to(handlers::settle_distribution),
                ),
        );
}
