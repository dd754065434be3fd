//! Search orchestrator for the Nivoda diamond inventory.
//!
//! `NivodaClient::search` runs the whole pipeline: token from the cache, query
//! translation, one POST, and normalization of the nested response into a
//! [`SearchResult`].

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::config::{ExecutionContext, NivodaConfig, ResponsePolicy};
use super::criteria::FilterCriteria;
use super::error::DiamondError;
use super::model::{DiamondRecord, SearchResult};
use super::query::{authenticate_body, search_body};
use super::token::{Authenticator, Clock, SystemClock, TokenCache};
use super::transport::{GraphqlTransport, ReqwestTransport, TransportError};

const TOKEN_POINTER: &str = "/data/authenticate/username_and_password/token";
const RESULTS_POINTER: &str = "/data/as/diamonds_by_query";
const LOG_BODY_LIMIT: usize = 512;

fn truncate_for_log(mut s: String, max_len: usize) -> String {
    if s.len() > max_len {
        let mut cut = max_len;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        s.truncate(cut);
        s.push('…');
    }
    s
}

/// Non-empty GraphQL `errors` array, if the body carries one.
fn error_envelope(v: &Value) -> Option<&Vec<Value>> {
    v.get("errors")
        .and_then(|e| e.as_array())
        .filter(|errs| !errs.is_empty())
}

fn envelope_message(errors: &[Value]) -> String {
    let messages: Vec<&str> = errors
        .iter()
        .filter_map(|e| e.get("message").and_then(|m| m.as_str()))
        .collect();
    if messages.is_empty() {
        "upstream returned an error envelope".to_string()
    } else {
        messages.join("; ")
    }
}

/// GraphQL errors that mean the bearer token was rejected.
fn envelope_is_unauthorized(errors: &[Value]) -> bool {
    errors.iter().any(|err| {
        let code = err
            .get("extensions")
            .and_then(|ex| ex.get("code"))
            .and_then(|c| c.as_str())
            .unwrap_or("");
        let msg = err
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        code.eq_ignore_ascii_case("UNAUTHENTICATED")
            || msg.contains("unauthorized")
            || msg.contains("not authenticated")
            || msg.contains("invalid token")
            || msg.contains("token expired")
    })
}

/// Authenticates against the inventory service's `authenticate` query.
pub struct NivodaAuthenticator {
    transport: Arc<dyn GraphqlTransport>,
    config: NivodaConfig,
}

impl NivodaAuthenticator {
    pub fn new(transport: Arc<dyn GraphqlTransport>, config: NivodaConfig) -> Self {
        Self { transport, config }
    }
}

#[async_trait]
impl Authenticator for NivodaAuthenticator {
    async fn authenticate(&self) -> Result<String, DiamondError> {
        self.config.context.ensure_trusted()?;
        let creds = self.config.credentials()?;

        debug!(username = %creds.username, "nivoda: authenticating");
        let body = authenticate_body(&creds.username, &creds.password);
        let reply = self
            .transport
            .post(&body, None)
            .await
            .map_err(|e| DiamondError::AuthenticationFailure(format!("request failed: {e}")))?;

        if !reply.is_success() {
            return Err(DiamondError::AuthenticationFailure(format!(
                "status={}: {}",
                reply.status,
                truncate_for_log(reply.body, LOG_BODY_LIMIT)
            )));
        }

        let parsed: Value = serde_json::from_str(&reply.body).map_err(|e| {
            DiamondError::AuthenticationFailure(format!("response is not JSON ({e})"))
        })?;
        if let Some(errors) = error_envelope(&parsed) {
            return Err(DiamondError::AuthenticationFailure(envelope_message(errors)));
        }

        parsed
            .pointer(TOKEN_POINTER)
            .and_then(|t| t.as_str())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                DiamondError::AuthenticationFailure("response did not include a token".into())
            })
    }
}

pub struct NivodaClient {
    transport: Arc<dyn GraphqlTransport>,
    tokens: TokenCache,
    policy: ResponsePolicy,
    context: ExecutionContext,
    request_timeout: Duration,
}

impl NivodaClient {
    pub fn from_env() -> Result<Self, DiamondError> {
        Self::new(NivodaConfig::from_env())
    }

    pub fn new(cfg: NivodaConfig) -> Result<Self, DiamondError> {
        cfg.context.ensure_trusted()?;
        let transport = Arc::new(ReqwestTransport::new(&cfg)?);
        Ok(Self::with_parts(cfg, transport, Arc::new(SystemClock)))
    }

    /// Build from explicit collaborators. Tests pass a scripted transport and fake clock.
    pub fn with_parts(
        cfg: NivodaConfig,
        transport: Arc<dyn GraphqlTransport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let authenticator = Arc::new(NivodaAuthenticator::new(transport.clone(), cfg.clone()));
        Self {
            transport,
            tokens: TokenCache::new(authenticator, clock, cfg.token_ttl),
            policy: cfg.response_policy,
            context: cfg.context,
            request_timeout: cfg.timeout,
        }
    }

    /// Current bearer token, authenticating if needed.
    pub async fn token(&self) -> Result<String, DiamondError> {
        self.tokens.get_token().await
    }

    pub async fn token_expires_at(&self) -> Option<DateTime<Utc>> {
        self.tokens.expires_at().await
    }

    /// [`search`](Self::search) bounded by a caller deadline covering auth and search.
    pub async fn search_with_timeout(
        &self,
        criteria: &FilterCriteria,
        deadline: Duration,
    ) -> Result<SearchResult, DiamondError> {
        tokio::time::timeout(deadline, self.search(criteria))
            .await
            .map_err(|_| DiamondError::Timeout(deadline))?
    }

    #[instrument(
        skip_all,
        fields(shape = %criteria.shape(), limit = criteria.limit(), offset = criteria.offset())
    )]
    pub async fn search(&self, criteria: &FilterCriteria) -> Result<SearchResult, DiamondError> {
        self.context.ensure_trusted()?;
        let token = self.tokens.get_token().await?;
        let body = search_body(criteria, &token);

        let reply = self
            .transport
            .post(&body, Some(&token))
            .await
            .map_err(|e| match e {
                TransportError::Timeout => DiamondError::Timeout(self.request_timeout),
                TransportError::Network(msg) => DiamondError::upstream(None, msg, None),
            })?;

        if !reply.is_success() {
            if reply.status == 401 || reply.status == 403 {
                self.tokens.invalidate_if(&token).await;
            }
            let payload = serde_json::from_str::<Value>(&reply.body).ok();
            warn!(status = reply.status, "nivoda: search request rejected");
            return Err(DiamondError::upstream(
                Some(reply.status),
                truncate_for_log(reply.body, LOG_BODY_LIMIT),
                payload,
            ));
        }

        let parsed: Value = serde_json::from_str(&reply.body)
            .map_err(|e| DiamondError::MalformedResponse(format!("body is not JSON ({e})")))?;

        if let Some(errors) = error_envelope(&parsed) {
            if envelope_is_unauthorized(errors) {
                self.tokens.invalidate_if(&token).await;
            }
            let message = envelope_message(errors);
            warn!(%message, "nivoda: search returned GraphQL errors");
            return Err(DiamondError::upstream(
                Some(reply.status),
                message,
                Some(Value::Array(errors.clone())),
            ));
        }

        let result = self.normalize(&parsed, criteria)?;
        info!(
            returned = result.page_size,
            kept = result.items.len(),
            total_count = result.total_count,
            has_more = result.has_more,
            "nivoda: search complete"
        );
        Ok(result)
    }

    fn normalize(
        &self,
        parsed: &Value,
        criteria: &FilterCriteria,
    ) -> Result<SearchResult, DiamondError> {
        let strict = self.policy == ResponsePolicy::Strict;
        let Some(node) = parsed.pointer(RESULTS_POINTER).filter(|n| !n.is_null()) else {
            if strict {
                return Err(DiamondError::MalformedResponse(format!(
                    "missing {RESULTS_POINTER}"
                )));
            }
            warn!(path = RESULTS_POINTER, "nivoda: results path absent; treating as zero results");
            return Ok(SearchResult::empty(criteria.offset()));
        };

        let raw_items: &[Value] = match node.get("items") {
            Some(Value::Array(items)) => items.as_slice(),
            Some(Value::Null) | None if !strict => &[],
            _ => {
                return Err(DiamondError::MalformedResponse(
                    "diamonds_by_query.items is not a list".into(),
                ));
            }
        };

        let mut items = Vec::with_capacity(raw_items.len());
        for raw in raw_items {
            match serde_json::from_value::<DiamondRecord>(raw.clone()) {
                Ok(record) => items.push(record),
                Err(e) if strict => {
                    return Err(DiamondError::MalformedResponse(format!(
                        "unreadable item ({e})"
                    )));
                }
                Err(e) => warn!(error = %e, "nivoda: skipping unreadable item"),
            }
        }

        let page_size = raw_items.len();
        let total_count = node
            .get("total_count")
            .and_then(|t| t.as_u64())
            .unwrap_or(page_size as u64);

        items.retain(DiamondRecord::has_image);
        items.sort_by(|a, b| cmp_price(a, b));

        Ok(SearchResult {
            items,
            total_count,
            has_more: page_size > 0 && page_size == criteria.limit() as usize,
            page_size,
            offset: criteria.offset(),
        })
    }
}

/// Ascending price, unpriced stones last.
fn cmp_price(a: &DiamondRecord, b: &DiamondRecord) -> Ordering {
    match (a.price, b.price) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
