use serde::{Deserialize, Serialize};

pub mod engine;
pub mod loader;
pub mod sources;

pub use engine::EngineConfig;
pub use loader::AppConfig;
pub use sources::{SourceConfig, SourcesConfig};

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: "0.0.0.0".to_string(),
            port: 7777,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` wins when set.
    pub filter: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            filter: "info".to_string(),
            json: false,
        }
    }
}

/// Extra `(protocol, wrapped symbol) -> canonical` entries for the registry.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AliasConfig {
    pub protocol: String,
    pub symbol: String,
    pub canonical: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub aliases: Vec<AliasConfig>,
}
