//! # API Response Models
//!
//! Structures for outgoing API response bodies.
//! All responses are wrapped in a standard format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{CapitalCallDetailRecord, CapitalCallRecord, DistributionDetailRecord, DistributionRecord};
use crate::services::call_allocator::CreatedCall;
use crate::services::distribution_allocator::CreatedDistribution;

/// Standard API response wrapper.
///
/// All API responses follow this format:
///
/// ## Success Response
///
/// ```json
/// {
///     "success": true,
///     "data": { ... },
///     "error": null
/// }
/// ```
///
/// ## Error Response
///
/// ```json
/// {
///     "success": false,
///     "data": null,
///     "error": {
///         "code": "OVER_COMMITMENT_EXCEEDED",
///         "message": "Call exceeds remaining commitment for investor ..."
///     }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    /// Whether the request was successful.
    pub success: bool,

    /// Response data (null on error).
    pub data: Option<T>,

    /// Error information (null on success).
    pub error: Option<ApiError>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response with data.
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(code: &str, message: &str) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.to_string(),
                message: message.to_string(),
            }),
        }
    }
}

/// API error information.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Error code (e.g., "OVER_COMMITMENT_EXCEEDED").
    pub code: String,

    /// Human-readable error message.
    pub message: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// "healthy" or "unhealthy"
    pub status: String,

    /// Whether the database responded.
    pub database: bool,

    /// Backend version (from Cargo.toml).
    pub version: String,

    /// When the check was performed.
    pub timestamp: DateTime<Utc>,
}

/// A capital call together with its per-investor details.
///
/// Returned by call creation and call queries so the caller can display
/// the whole aggregate at once.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapitalCallResponse {
    #[serde(flatten)]
    pub call: CapitalCallRecord,
    pub details: Vec<CapitalCallDetailRecord>,
}

impl From<CreatedCall> for CapitalCallResponse {
    fn from(created: CreatedCall) -> Self {
        Self {
            call: created.call,
            details: created.details,
        }
    }
}

/// A distribution together with its per-investor details.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionResponse {
    #[serde(flatten)]
    pub distribution: DistributionRecord,
    pub details: Vec<DistributionDetailRecord>,
}

impl From<CreatedDistribution> for DistributionResponse {
    fn from(created: CreatedDistribution) -> Self {
        Self {
            distribution: created.distribution,
            details: created.details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_response_success_shape() {
        let resp = ApiResponse::success(42);
        assert!(resp.success);
        assert_eq!(resp.data, Some(42));
        assert!(resp.error.is_none());
    }

    #[test]
    fn test_api_response_error_shape() {
        let resp: ApiResponse<()> = ApiResponse::error("NOT_FOUND", "no such fund");
        assert!(!resp.success);
        assert!(resp.data.is_none());
        let err = resp.error.unwrap();
        assert_eq!(err.code, "NOT_FOUND");
        assert_eq!(err.message, "no such fund");
    }
}
