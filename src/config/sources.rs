use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SourceConfig {
    pub enabled: bool,
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Zero or less disables client-side rate limiting.
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: f64,
}

fn default_requests_per_second() -> f64 {
    1.0
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub zapper: SourceConfig,
    pub dydx: SourceConfig,
    pub bancor: SourceConfig,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        SourcesConfig {
            zapper: SourceConfig {
                enabled: true,
                base_url: "https://api.zapper.fi/v1".to_string(),
                api_key: None,
                requests_per_second: 1.0,
            },
            dydx: SourceConfig {
                enabled: true,
                base_url: "https://api.dydx.exchange/v1".to_string(),
                api_key: None,
                requests_per_second: 1.0,
            },
            bancor: SourceConfig {
                enabled: true,
                base_url: "https://api-v2.bancor.network".to_string(),
                api_key: None,
                requests_per_second: 1.0,
            },
        }
    }
}
