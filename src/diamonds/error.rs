use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

/// Failures surfaced by the diamond search pipeline.
///
/// Nothing here is retried automatically; callers decide whether to fall back.
#[derive(Error, Debug)]
pub enum DiamondError {
    /// Missing credentials, or the client was used outside a trusted process.
    #[error("configuration: {0}")]
    Configuration(String),
    /// Caller-supplied filter criteria are missing a field or contradict themselves.
    #[error("invalid argument `{field}`: {reason}")]
    InvalidArgument { field: &'static str, reason: String },
    /// The authenticate exchange failed; the token cache is empty afterwards.
    #[error("authentication failed: {0}")]
    AuthenticationFailure(String),
    /// Non-2xx status or a GraphQL error envelope on the search call.
    #[error("upstream error (status={status:?}): {message}")]
    UpstreamError {
        status: Option<u16>,
        message: String,
        payload: Option<Value>,
    },
    /// Body was not JSON, or (strict mode) the expected nested path was absent.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    /// A caller-supplied deadline elapsed before the upstream answered.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl DiamondError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        DiamondError::InvalidArgument {
            field,
            reason: reason.into(),
        }
    }

    pub fn upstream(
        status: Option<u16>,
        message: impl Into<String>,
        payload: Option<Value>,
    ) -> Self {
        DiamondError::UpstreamError {
            status,
            message: message.into(),
            payload,
        }
    }

    /// Whether the failure was caused by the upstream rejecting our bearer token.
    pub fn is_authorization(&self) -> bool {
        match self {
            DiamondError::AuthenticationFailure(_) => true,
            DiamondError::UpstreamError {
                status: Some(401 | 403),
                ..
            } => true,
            _ => false,
        }
    }

    /// Stable machine-readable code used by the HTTP surface.
    pub fn code(&self) -> &'static str {
        match self {
            DiamondError::Configuration(_) => "configuration_error",
            DiamondError::InvalidArgument { .. } => "invalid_argument",
            DiamondError::AuthenticationFailure(_) => "authentication_failure",
            DiamondError::UpstreamError { .. } => "upstream_error",
            DiamondError::MalformedResponse(_) => "malformed_response",
            DiamondError::Timeout(_) => "timeout",
        }
    }
}
