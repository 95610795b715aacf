use std::net::SocketAddr;
use crate::config::ServerConfig;
use crate::error::{Error, Result};

/// Variable selecting the `config/{env}` overlay.
pub const ENV_VAR: &str = "DEFIVEYOR_ENV";

/// Name of the active configuration environment, `default` when unset.
pub fn environment() -> String {
    std::env::var(ENV_VAR)
        .ok()
        .filter(|env| !env.trim().is_empty())
        .unwrap_or_else(|| "default".to_string())
}

pub fn bind_address(server: &ServerConfig) -> Result<SocketAddr> {
    format!("{}:{}", server.bind, server.port)
        .parse()
        .map_err(|e| Error::ConfigError(format!("invalid bind address {}:{}: {}", server.bind, server.port, e)))
}

/// Resolves on Ctrl+C. If the handler cannot be installed the server runs
/// until killed.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping");
}
