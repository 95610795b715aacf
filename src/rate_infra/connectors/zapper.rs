use std::collections::HashSet;
use std::time::Duration;
use async_trait::async_trait;
use serde::Deserialize;
use tokio::time::Instant;
use crate::config::sources::SourceConfig;
use crate::error::{FetchError, Result};
use crate::rate_infra::connectors::http::{HttpSource, Numeric};
use crate::rate_infra::connectors::SourceAdapter;
use crate::rate_infra::Observation;
use crate::types::protocol::Protocol;
use crate::types::timestamp::Timestamp;

const SOURCE_ID: &str = "zapper";
const NETWORK: &str = "ethereum";

/// Protocols whose liquidity pools Zapper reports, with Zapper's key.
const POOL_PROTOCOLS: &[(Protocol, &str)] = &[
    (Protocol::OneInch, "1inch"),
    (Protocol::SushiSwap, "sushiswap"),
    (Protocol::UniSwap, "uniswap-v2"),
    (Protocol::Yearn, "yearn"),
];

/// Lending markets. Zapper has no "supported" listing for these.
const LENDING_PROTOCOLS: &[(Protocol, &str)] = &[
    (Protocol::Aave, "aave"),
    (Protocol::Compound, "compound"),
];

/// Zapper aggregates several protocols behind one API, so a single adapter
/// reports observations tagged with each underlying protocol.
///
/// A failing sub-request only costs that protocol's data; the fetch fails as
/// a whole only when nothing could be read.
pub struct ZapperAdapter {
    http: HttpSource,
}

impl ZapperAdapter {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        Ok(ZapperAdapter {
            http: HttpSource::new(SOURCE_ID, config)?,
        })
    }

    async fn fetch_all(&self, deadline: Instant) -> std::result::Result<Vec<Observation>, FetchError> {
        let supported: Vec<SupportedStats> = self
            .http
            .get_json("pool-stats/supported", remaining(deadline))
            .await?;
        let supported_pools: HashSet<String> = supported
            .into_iter()
            .filter(|s| s.network == NETWORK)
            .flat_map(|s| s.protocols)
            .collect();

        let mut observations = Vec::new();
        let mut errors = Vec::new();

        for (protocol, key) in POOL_PROTOCOLS {
            if !supported_pools.contains(*key) {
                tracing::debug!(protocol = %protocol, "Zapper does not list pool stats");
                continue;
            }
            match self.fetch_pool_stats(*protocol, key, deadline).await {
                Ok(mut batch) => observations.append(&mut batch),
                Err(e) => errors.push(e),
            }
        }

        for (protocol, key) in LENDING_PROTOCOLS {
            match self.fetch_lending_stats(*protocol, key, deadline).await {
                Ok(mut batch) => observations.append(&mut batch),
                Err(e) => errors.push(e),
            }
        }

        for e in &errors {
            tracing::warn!(source = SOURCE_ID, "Partial Zapper failure: {}", e);
        }

        if observations.is_empty() {
            if let Some(first) = errors.into_iter().next() {
                return Err(first);
            }
        }

        Ok(observations)
    }

    async fn fetch_pool_stats(
        &self,
        protocol: Protocol,
        key: &str,
        deadline: Instant,
    ) -> std::result::Result<Vec<Observation>, FetchError> {
        let pools: Vec<PoolStat> = self
            .http
            .get_json(&format!("pool-stats/{}", key), remaining(deadline))
            .await?;
        let observed_at = Timestamp::now();

        let observations = pools
            .into_iter()
            .filter_map(|pool| {
                let apy = pool.yearly_roi.as_ref().and_then(Numeric::to_f64)?;
                let symbols: Vec<String> = pool
                    .tokens
                    .into_iter()
                    .filter(|t| t.reserve.as_ref().and_then(Numeric::to_f64).unwrap_or(0.0) > 0.0)
                    .map(|t| t.symbol)
                    .collect();
                match <[String; 2]>::try_from(symbols) {
                    Ok([symbol0, symbol1]) => Some(Observation::pair(
                        protocol.id(),
                        symbol0,
                        symbol1,
                        apy,
                        observed_at,
                    )),
                    // Multi-token pools have no pair identity.
                    Err(_) => None,
                }
            })
            .collect();

        Ok(observations)
    }

    async fn fetch_lending_stats(
        &self,
        protocol: Protocol,
        key: &str,
        deadline: Instant,
    ) -> std::result::Result<Vec<Observation>, FetchError> {
        let markets: Vec<LendingStat> = self
            .http
            .get_json(&format!("lending-stats/{}", key), remaining(deadline))
            .await?;
        let observed_at = Timestamp::now();

        let observations = markets
            .into_iter()
            .filter_map(|market| {
                let apy = market.supply_apy.as_ref().and_then(Numeric::to_f64)?;
                Some(Observation::asset(protocol.id(), market.symbol, apy, observed_at))
            })
            .collect();

        Ok(observations)
    }
}

fn remaining(deadline: Instant) -> Duration {
    deadline.saturating_duration_since(Instant::now())
}

#[async_trait]
impl SourceAdapter for ZapperAdapter {
    async fn fetch(&self, timeout: Duration) -> std::result::Result<Vec<Observation>, FetchError> {
        let deadline = Instant::now() + timeout;
        tokio::time::timeout_at(deadline, self.fetch_all(deadline))
            .await
            .map_err(|_| FetchError::timeout(SOURCE_ID, format!("no response within {:?}", timeout)))?
    }

    fn source_id(&self) -> &str {
        self.http.source_id()
    }
}

#[derive(Deserialize)]
struct SupportedStats {
    network: String,
    protocols: Vec<String>,
}

#[derive(Deserialize)]
struct PoolStat {
    tokens: Vec<PoolToken>,
    #[serde(rename = "yearlyROI")]
    yearly_roi: Option<Numeric>,
}

#[derive(Deserialize)]
struct PoolToken {
    symbol: String,
    reserve: Option<Numeric>,
}

#[derive(Deserialize)]
struct LendingStat {
    symbol: String,
    #[serde(rename = "supplyApy")]
    supply_apy: Option<Numeric>,
}
