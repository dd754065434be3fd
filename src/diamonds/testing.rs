//! Fakes shared by unit tests: a settable clock, a counting authenticator and a
//! scripted GraphQL transport.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use super::error::DiamondError;
use super::token::{Authenticator, Clock};
use super::transport::{GraphqlTransport, HttpReply, TransportError};

pub struct FakeClock {
    now: Mutex<DateTime<Utc>>,
}

impl Default for FakeClock {
    fn default() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()),
        }
    }
}

impl FakeClock {
    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap();
        *now = *now + by;
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

pub struct CountingAuthenticator {
    token: String,
    fail_first: bool,
    numbered: bool,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl CountingAuthenticator {
    pub fn ok(token: &str) -> Self {
        Self {
            token: token.to_string(),
            fail_first: false,
            numbered: false,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_then_ok(token: &str) -> Self {
        Self {
            fail_first: true,
            ..Self::ok(token)
        }
    }

    /// Hands out `token-1`, `token-2`, ... so refreshes are distinguishable.
    pub fn numbered(token: &str) -> Self {
        Self {
            numbered: true,
            ..Self::ok(token)
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Authenticator for CountingAuthenticator {
    async fn authenticate(&self) -> Result<String, DiamondError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_first && n == 0 {
            return Err(DiamondError::AuthenticationFailure("scripted failure".into()));
        }
        if self.numbered {
            return Ok(format!("{}-{}", self.token, n + 1));
        }
        Ok(self.token.clone())
    }
}

/// A request the scripted transport received.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub body: Value,
    pub bearer: Option<String>,
}

#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<HttpReply, TransportError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, status: u16, body: Value) -> Self {
        self.reply_raw(status, &body.to_string())
    }

    pub fn reply_raw(self, status: u16, body: &str) -> Self {
        self.replies.lock().unwrap().push_back(Ok(HttpReply {
            status,
            body: body.to_string(),
        }));
        self
    }

    pub fn fail(self, err: TransportError) -> Self {
        self.replies.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests whose GraphQL document is the authenticate query.
    pub fn auth_calls(&self) -> usize {
        self.requests()
            .iter()
            .filter(|r| {
                r.body["query"]
                    .as_str()
                    .is_some_and(|q| q.contains("username_and_password"))
            })
            .count()
    }
}

#[async_trait]
impl GraphqlTransport for ScriptedTransport {
    async fn post(&self, body: &Value, bearer: Option<&str>) -> Result<HttpReply, TransportError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            body: body.clone(),
            bearer: bearer.map(str::to_string),
        });
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Network("script exhausted".into())))
    }
}
