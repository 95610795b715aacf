pub mod bancor;
pub mod dydx;
pub mod http;
pub mod zapper;

use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use crate::config::sources::SourcesConfig;
use crate::error::{FetchError, Result};
use crate::rate_infra::Observation;

/// One upstream rate provider.
///
/// Implementations own their client state and must return within `timeout`;
/// ordinary upstream failures come back as `FetchError`, never as panics.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    async fn fetch(&self, timeout: Duration) -> std::result::Result<Vec<Observation>, FetchError>;

    /// Name used in diagnostics and fetch errors.
    fn source_id(&self) -> &str;
}

/// Build the enabled HTTP adapters from configuration.
pub fn build_adapters(config: &SourcesConfig) -> Result<Vec<Arc<dyn SourceAdapter>>> {
    let mut adapters: Vec<Arc<dyn SourceAdapter>> = Vec::new();

    if config.zapper.enabled {
        adapters.push(Arc::new(zapper::ZapperAdapter::new(&config.zapper)?));
    }
    if config.dydx.enabled {
        adapters.push(Arc::new(dydx::DydxAdapter::new(&config.dydx)?));
    }
    if config.bancor.enabled {
        adapters.push(Arc::new(bancor::BancorAdapter::new(&config.bancor)?));
    }

    tracing::info!(
        adapters = adapters.len(),
        "Source adapters configured: {:?}",
        adapters.iter().map(|a| a.source_id().to_string()).collect::<Vec<_>>()
    );

    Ok(adapters)
}
