use std::fmt;
use std::time::Duration;

use crate::util::env::{env_flag, env_opt, env_parse};

use tracing::warn;

use super::error::DiamondError;

pub const DEFAULT_API_URL: &str = "https://integrations.nivoda.net/api/diamonds";
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;
/// Upstream tokens live six hours; we stop using them half an hour early.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 5 * 3600 + 30 * 60;

/// Inventory-service login. Deliberately not `Serialize`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Where the client is running. Credentials may only be used from a trusted process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionContext {
    #[default]
    Trusted,
    Untrusted,
}

impl ExecutionContext {
    /// Unknown values fail closed: a typo must not grant access to credentials.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "trusted" | "server" => ExecutionContext::Trusted,
            "untrusted" | "browser" | "client" => ExecutionContext::Untrusted,
            other => {
                warn!(
                    value = %other,
                    "unrecognised NIVODA_EXECUTION_CONTEXT; treating as untrusted"
                );
                ExecutionContext::Untrusted
            }
        }
    }

    pub fn ensure_trusted(&self) -> Result<(), DiamondError> {
        match self {
            ExecutionContext::Trusted => Ok(()),
            ExecutionContext::Untrusted => Err(DiamondError::Configuration(
                "diamond search must run in a trusted server process".into(),
            )),
        }
    }
}

/// What to do when the search response lacks the nested item path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponsePolicy {
    /// Treat as zero results and log a warning.
    #[default]
    Lenient,
    /// Surface `MalformedResponse`.
    Strict,
}

#[derive(Debug, Clone)]
pub struct NivodaConfig {
    pub api_url: String,
    pub credentials: Option<Credentials>,
    pub timeout: Duration,
    pub token_ttl: chrono::Duration,
    pub response_policy: ResponsePolicy,
    pub user_agent: String,
    pub context: ExecutionContext,
}

impl NivodaConfig {
    /// Read `NIVODA_*` variables. Missing credentials are not an error here; the
    /// first authentication attempt reports them.
    pub fn from_env() -> Self {
        let credentials = match (env_opt("NIVODA_USERNAME"), env_opt("NIVODA_PASSWORD")) {
            (Some(username), Some(password)) => Some(Credentials { username, password }),
            _ => None,
        };
        let ttl_secs: i64 = env_parse("NIVODA_TOKEN_TTL_SECS", DEFAULT_TOKEN_TTL_SECS).max(60);
        Self {
            api_url: env_opt("NIVODA_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            credentials,
            timeout: Duration::from_secs(
                env_parse("NIVODA_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS).max(1),
            ),
            token_ttl: chrono::Duration::seconds(ttl_secs),
            response_policy: if env_flag("NIVODA_STRICT_RESPONSES", false) {
                ResponsePolicy::Strict
            } else {
                ResponsePolicy::Lenient
            },
            user_agent: env_opt("NIVODA_USER_AGENT").unwrap_or_else(default_user_agent),
            context: env_opt("NIVODA_EXECUTION_CONTEXT")
                .map(|raw| ExecutionContext::parse(&raw))
                .unwrap_or_default(),
        }
    }

    /// Defaults pointed at `api_url`, without credentials.
    pub fn for_endpoint(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            credentials: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            token_ttl: chrono::Duration::seconds(DEFAULT_TOKEN_TTL_SECS),
            response_policy: ResponsePolicy::default(),
            user_agent: default_user_agent(),
            context: ExecutionContext::default(),
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn credentials(&self) -> Result<&Credentials, DiamondError> {
        self.credentials.as_ref().ok_or_else(|| {
            DiamondError::Configuration(
                "NIVODA_USERNAME and NIVODA_PASSWORD must both be set".into(),
            )
        })
    }
}

fn default_user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_password() {
        let creds = Credentials::new("shop@example.com", "hunter2");
        let shown = format!("{creds:?}");
        assert!(shown.contains("shop@example.com"));
        assert!(!shown.contains("hunter2"));
    }

    #[test]
    fn missing_credentials_is_a_configuration_error() {
        let cfg = NivodaConfig::for_endpoint(DEFAULT_API_URL);
        assert!(matches!(
            cfg.credentials(),
            Err(DiamondError::Configuration(_))
        ));
        let cfg = cfg.with_credentials(Credentials::new("u", "p"));
        assert_eq!(cfg.credentials().unwrap().username, "u");
    }

    #[test]
    fn execution_context_parsing() {
        assert_eq!(ExecutionContext::parse("browser"), ExecutionContext::Untrusted);
        assert_eq!(ExecutionContext::parse("server"), ExecutionContext::Trusted);
        assert_eq!(ExecutionContext::parse(" Trusted "), ExecutionContext::Trusted);
    }

    #[test]
    fn unknown_execution_context_fails_closed() {
        let ctx = ExecutionContext::parse("untrsuted");
        assert_eq!(ctx, ExecutionContext::Untrusted);
        assert!(matches!(
            ctx.ensure_trusted(),
            Err(DiamondError::Configuration(_))
        ));
        assert!(ExecutionContext::Untrusted.ensure_trusted().is_err());
        assert!(ExecutionContext::Trusted.ensure_trusted().is_ok());
    }

    #[test]
    fn default_ttl_is_five_and_a_half_hours() {
        let cfg = NivodaConfig::for_endpoint(DEFAULT_API_URL);
        assert_eq!(cfg.token_ttl.num_minutes(), 330);
    }
}
