//! Client configuration.
//!
//! # Design
//! `ClientConfig` is immutable once built. The builder mirrors the optional
//! arguments of the API: an account id plus an API key or a bearer token.
//! Empty strings are treated the same as absent values. When both credentials
//! are given the API key wins.

use std::fmt;

use crate::auth::Auth;
use crate::error::ConfigError;

/// Root of the Drip v2 REST API.
pub const DEFAULT_BASE_URL: &str = "https://api.getdrip.com/v2";

/// Value of the `user-agent` header sent with every request.
pub const USER_AGENT: &str = concat!("drip-core/", env!("CARGO_PKG_VERSION"));

pub const ENV_ACCOUNT_ID: &str = "DRIP_ACCOUNT_ID";
pub const ENV_API_KEY: &str = "DRIP_API_KEY";
pub const ENV_API_TOKEN: &str = "DRIP_API_TOKEN";
pub const ENV_BASE_URL: &str = "DRIP_BASE_URL";

/// Validated, immutable configuration for a `DripClient`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    account_id: String,
    auth: Auth,
    base_url: String,
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Read configuration from `DRIP_ACCOUNT_ID`, `DRIP_API_KEY`,
    /// `DRIP_API_TOKEN` and the optional `DRIP_BASE_URL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as `from_env`, with variables resolved through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = ClientConfigBuilder {
            account_id: lookup(ENV_ACCOUNT_ID),
            api_key: lookup(ENV_API_KEY),
            token: lookup(ENV_API_TOKEN),
            base_url: None,
        };
        if let Some(url) = lookup(ENV_BASE_URL).filter(|url| !url.is_empty()) {
            builder = builder.base_url(url);
        }
        builder.build()
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Headers attached to every request, credential included.
    pub fn headers(&self) -> Vec<(String, String)> {
        vec![
            (
                "content-type".to_string(),
                "application/vnd.api+json".to_string(),
            ),
            ("accept".to_string(), "*/*".to_string()),
            ("user-agent".to_string(), USER_AGENT.to_string()),
            ("authorization".to_string(), self.auth.header_value()),
        ]
    }
}

/// Builder for `ClientConfig`. Validation happens in `build`.
#[derive(Default, Clone)]
pub struct ClientConfigBuilder {
    account_id: Option<String>,
    api_key: Option<String>,
    token: Option<String>,
    base_url: Option<String>,
}

impl fmt::Debug for ClientConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("ClientConfigBuilder")
            .field("account_id", &self.account_id)
            .field("api_key", &redact(&self.api_key))
            .field("token", &redact(&self.token))
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl ClientConfigBuilder {
    pub fn account_id(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    /// Authenticate with HTTP basic auth. Takes precedence over `token`.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Authenticate with a bearer token.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Point the client at a different API root, e.g. a local test server.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }

    pub fn build(self) -> Result<ClientConfig, ConfigError> {
        let account_id = non_empty(self.account_id).ok_or(ConfigError::MissingAccountId)?;
        let auth = match (non_empty(self.api_key), non_empty(self.token)) {
            (Some(api_key), _) => Auth::Basic { api_key },
            (None, Some(token)) => Auth::Bearer { token },
            (None, None) => return Err(ConfigError::MissingCredential),
        };
        Ok(ClientConfig {
            account_id,
            auth,
            base_url: self
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
