use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;

use super::config::NivodaConfig;
use super::error::DiamondError;

/// Raw HTTP answer; status and body are interpreted by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("network: {0}")]
    Network(String),
}

/// Outbound seam to the GraphQL endpoint. The production impl is [`ReqwestTransport`].
#[async_trait]
pub trait GraphqlTransport: Send + Sync {
    /// POST `body` as JSON. When `bearer` is set it is sent as `Authorization: Bearer`.
    async fn post(&self, body: &Value, bearer: Option<&str>) -> Result<HttpReply, TransportError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: Client,
    endpoint: String,
}

impl ReqwestTransport {
    pub fn new(cfg: &NivodaConfig) -> Result<Self, DiamondError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let http = Client::builder()
            .default_headers(headers)
            .user_agent(cfg.user_agent.clone())
            .timeout(cfg.timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| DiamondError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            endpoint: cfg.api_url.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl GraphqlTransport for ReqwestTransport {
    async fn post(&self, body: &Value, bearer: Option<&str>) -> Result<HttpReply, TransportError> {
        let mut req = self.http.post(&self.endpoint).json(body);
        if let Some(token) = bearer {
            req = req.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let response = req.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify)?;
        Ok(HttpReply { status, body })
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_success_range() {
        assert!(HttpReply {
            status: 204,
            body: String::new()
        }
        .is_success());
        assert!(!HttpReply {
            status: 401,
            body: String::new()
        }
        .is_success());
    }

    #[tokio::test]
    async fn transport_uses_configured_endpoint() {
        let cfg = NivodaConfig::for_endpoint("https://example.invalid/graphql");
        let transport = ReqwestTransport::new(&cfg).unwrap();
        assert_eq!(transport.endpoint(), "https://example.invalid/graphql");
    }
}
