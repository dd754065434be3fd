//! Bearer-token cache for the inventory service.
//!
//! The cache owns one token at a time. Refreshes happen while the slot lock is
//! held, so concurrent callers arriving during expiry wait for the single
//! in-flight authentication instead of starting their own.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::error::DiamondError;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Exchanges credentials for a fresh bearer token.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self) -> Result<String, DiamondError>;
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

pub struct TokenCache {
    authenticator: Arc<dyn Authenticator>,
    clock: Arc<dyn Clock>,
    ttl: chrono::Duration,
    slot: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        clock: Arc<dyn Clock>,
        ttl: chrono::Duration,
    ) -> Self {
        Self {
            authenticator,
            clock,
            ttl,
            slot: Mutex::new(None),
        }
    }

    /// Cached token if still valid, otherwise authenticate once and cache the result.
    ///
    /// On failure the cache is left empty and the error is returned as-is.
    pub async fn get_token(&self) -> Result<String, DiamondError> {
        let mut slot = self.slot.lock().await;
        if let Some(token) = slot.as_ref() {
            if self.clock.now() < token.expires_at {
                return Ok(token.value.clone());
            }
            debug!(expired_at = %token.expires_at, "nivoda: cached token expired");
        }
        *slot = None;

        match self.authenticator.authenticate().await {
            Ok(value) => {
                let expires_at = self.clock.now() + self.ttl;
                info!(%expires_at, "nivoda: bearer token refreshed");
                *slot = Some(CachedToken {
                    value: value.clone(),
                    expires_at,
                });
                Ok(value)
            }
            Err(err) => {
                warn!(error = %err, "nivoda: authentication failed; token cache cleared");
                Err(err)
            }
        }
    }

    /// Drop the cached token if it is still `failed`, so the next call re-authenticates.
    ///
    /// A rejection that arrives after another caller already refreshed refers to the
    /// old token and leaves the new one in place.
    pub async fn invalidate_if(&self, failed: &str) {
        let mut slot = self.slot.lock().await;
        match slot.as_ref() {
            Some(token) if token.value == failed => {
                *slot = None;
                debug!("nivoda: cached token invalidated");
            }
            Some(_) => debug!("nivoda: stale rejection ignored; token already refreshed"),
            None => {}
        }
    }

    pub async fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.slot.lock().await.as_ref().map(|t| t.expires_at)
    }
}
