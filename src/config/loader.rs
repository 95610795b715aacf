use crate::config::*;
use crate::error::{Error, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub engine: EngineConfig,
    pub logging: LoggingConfig,
    pub sources: SourcesConfig,
    pub registry: RegistryConfig,
}

impl AppConfig {
    /// Layers `config/default`, `config/{env}` and `DEFIVEYOR__*` variables,
    /// later sources overriding earlier ones.
    pub fn load(env: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("DEFIVEYOR")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        let app: AppConfig = config
            .try_deserialize()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        app.validate()?;
        Ok(app)
    }

    pub fn validate(&self) -> Result<()> {
        if self.engine.poll_interval_secs == 0 {
            return Err(Error::ConfigError("engine.poll_interval_secs must be positive".into()));
        }
        if self.engine.adapter_timeout_secs == 0 || self.engine.cycle_deadline_secs == 0 {
            return Err(Error::ConfigError("engine timeouts must be positive".into()));
        }
        if self.engine.window_days == 0 {
            return Err(Error::ConfigError("engine.window_days must be positive".into()));
        }
        if self.engine.cycle_deadline_secs < self.engine.adapter_timeout_secs {
            tracing::warn!(
                "engine.cycle_deadline_secs ({}) is shorter than engine.adapter_timeout_secs ({}); \
                 slow adapters will be cut off by the cycle deadline",
                self.engine.cycle_deadline_secs,
                self.engine.adapter_timeout_secs
            );
        }
        Ok(())
    }
}
