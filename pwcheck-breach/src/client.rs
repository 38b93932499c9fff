use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use crate::error::Error;
use crate::hash::{sha1_hex_upper, split_range_key};
use crate::provider::BreachProvider;

const PROVIDER_NAME: &str = "Have I Been Pwned";

/// Client for the Have I Been Pwned password range API.
///
/// Only the 5-character hash prefix is sent; the response lists every known suffix
/// under that prefix as `SUFFIX:count` lines and the match happens locally.
#[derive(Debug, Clone)]
pub struct RemoteBreachClient {
    base_url: String,
    http: reqwest::Client,
}

impl RemoteBreachClient {
    /// Creates a client for `base_url` (e.g. `https://api.pwnedpasswords.com/range`).
    ///
    /// Every request is bounded by `timeout` and carries `user_agent`.
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> Result<Self, Error> {
        let base_url = base_url.trim();
        if base_url.is_empty() {
            return Err(Error::validation("base URL cannot be empty"));
        }
        if user_agent.trim().is_empty() {
            return Err(Error::validation("user agent cannot be empty"));
        }
        if timeout.is_zero() {
            return Err(Error::validation("timeout must be greater than zero"));
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|source| Error::Network { source })?;

        Ok(Self { base_url: base_url.trim_end_matches('/').to_string(), http })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl BreachProvider for RemoteBreachClient {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn is_breached(&self, password: &str) -> Result<bool, Error> {
        if password.is_empty() {
            return Err(Error::validation("password must not be empty"));
        }

        let digest = sha1_hex_upper(password);
        let (prefix, suffix) = split_range_key(&digest);
        let url = format!("{}/{}", self.base_url, prefix);

        let response = self
            .http
            .get(&url)
            .header("Add-Padding", "true")
            .send()
            .await
            .map_err(|source| Error::Network { source })?;

        let status = response.status();
        debug!(prefix, %status, "breach range lookup");

        match status {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => return Ok(false),
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(Error::RateLimited { status: status.to_string() });
            }
            _ => return Err(Error::UnexpectedResponse { status: status.to_string() }),
        }

        let body = response.text().await.map_err(|source| Error::Network { source })?;

        Ok(body.split('\n').filter(|line| !line.is_empty()).any(|line| line.starts_with(suffix)))
    }
}
