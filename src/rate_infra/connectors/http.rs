use std::time::Duration;
use reqwest::Client;
use serde::de::DeserializeOwned;
use crate::config::sources::SourceConfig;
use crate::error::{Error, FetchError, Result};
use crate::rate_infra::rate_limiter::RateLimiter;

const USER_AGENT: &str = concat!("defiveyor/", env!("CARGO_PKG_VERSION"));

/// Rate-limited JSON-over-HTTP access to one provider.
pub struct HttpSource {
    source_id: String,
    base_url: String,
    api_key: Option<String>,
    client: Client,
    limiter: RateLimiter,
}

impl HttpSource {
    pub fn new(source_id: &str, config: &SourceConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::ConfigError(format!("HTTP client for {}: {}", source_id, e)))?;

        Ok(HttpSource {
            source_id: source_id.to_string(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            client,
            limiter: RateLimiter::per_second(source_id, config.requests_per_second),
        })
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// GET `{base_url}/{path}` and decode the body as `T`.
    ///
    /// `api_key`, when configured, is sent as the `api_key` query parameter.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        timeout: Duration,
    ) -> std::result::Result<T, FetchError> {
        self.limiter.acquire().await;

        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        tracing::debug!(source = %self.source_id, "GET {}", url);

        let mut request = self.client.get(&url).timeout(timeout);
        if let Some(key) = &self.api_key {
            request = request.query(&[("api_key", key.as_str())]);
        }

        let response = request.send().await.map_err(|e| self.transport_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::upstream(
                &self.source_id,
                format!("GET {} returned {}: {}", path, status, truncate(&body, 200)),
            ));
        }

        let body = response.text().await.map_err(|e| self.transport_error(&url, e))?;
        serde_json::from_str(&body).map_err(|e| {
            FetchError::malformed(&self.source_id, format!("GET {}: {}", path, e))
        })
    }

    fn transport_error(&self, url: &str, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::timeout(&self.source_id, format!("GET {} timed out", url))
        } else if e.is_decode() {
            FetchError::malformed(&self.source_id, format!("GET {}: {}", url, e))
        } else {
            FetchError::upstream(&self.source_id, format!("GET {}: {}", url, e))
        }
    }
}

/// Upstream numbers arrive both as JSON numbers and as decimal strings.
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(untagged)]
pub enum Numeric {
    Number(f64),
    Text(String),
}

impl Numeric {
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Numeric::Number(n) => Some(*n),
            Numeric::Text(s) => s.trim().parse().ok(),
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
