//! Client configuration.
//!
//! A `ClientConfig` is built once and owned by a `FomoClient`; nothing in the
//! crate keeps process-wide state.
//!
//! Environment variables read by [`ClientConfig::from_env`]:
//!
//! - `FOMO_API_TOKEN` (required) - the application's auth token
//! - `FOMO_API_URL` (optional) - base endpoint, defaults to `https://api.fomo.com`

use std::fmt;

use crate::error::ApiError;

pub const DEFAULT_ENDPOINT: &str = "https://api.fomo.com";
pub const TOKEN_ENV: &str = "FOMO_API_TOKEN";
pub const ENDPOINT_ENV: &str = "FOMO_API_URL";

/// Immutable settings shared by every request a client builds.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    token: String,
    endpoint: String,
    user_agent: String,
}

impl ClientConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            user_agent: default_user_agent(),
        }
    }

    /// Point the client at another base URL. A trailing `/` is dropped.
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Load the configuration from `FOMO_API_TOKEN` and `FOMO_API_URL`.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        let token = lookup(TOKEN_ENV)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ApiError::Config(format!("{TOKEN_ENV} is not set")))?;
        let config = Self::new(token);
        Ok(match lookup(ENDPOINT_ENV) {
            Some(endpoint) if !endpoint.is_empty() => config.with_endpoint(&endpoint),
            _ => config,
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("token", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

fn default_user_agent() -> String {
    format!("Fomo/Rust/{}", env!("CARGO_PKG_VERSION"))
}
