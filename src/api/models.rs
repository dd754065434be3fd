// API request/response models (DTOs)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::diamonds::{DiamondRecord, FilterRequest, RefineCriteria, SortOrder};

/// Standard API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            meta: Some(Meta::now()),
        }
    }

    pub fn error(detail: ErrorDetail) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(detail),
            meta: Some(Meta::now()),
        }
    }
}

/// Metadata included in all API responses
#[derive(Debug, Serialize, Deserialize)]
pub struct Meta {
    pub timestamp: DateTime<Utc>,
    pub request_id: String,
    pub version: String,
}

impl Meta {
    pub fn now() -> Self {
        Self {
            timestamp: Utc::now(),
            request_id: uuid::Uuid::new_v4().to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Machine-readable error body. `field` is set for argument errors.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorDetail {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            field: None,
        }
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// Whether a session token is currently cached; no upstream call is made.
    pub token_cached: bool,
    pub uptime_seconds: u64,
}

/// Search body as product pages send it. Filter fields sit at the top level.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(flatten)]
    pub filter: FilterRequest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortOrder>,
}

/// A previously fetched batch plus the local filters to apply to it.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RefineRequest {
    pub items: Vec<DiamondRecord>,
    #[serde(default)]
    pub criteria: RefineCriteria,
    #[serde(default)]
    pub sort: SortOrder,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefineResponse {
    pub items: Vec<DiamondRecord>,
    pub count: usize,
}
