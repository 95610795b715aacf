use std::time::Duration;
use async_trait::async_trait;
use serde::Deserialize;
use crate::config::sources::SourceConfig;
use crate::error::{FetchError, Result};
use crate::rate_infra::connectors::http::{HttpSource, Numeric};
use crate::rate_infra::connectors::SourceAdapter;
use crate::rate_infra::Observation;
use crate::types::protocol::Protocol;
use crate::types::timestamp::Timestamp;

const DAYS_PER_YEAR: f64 = 365.2425;
const NETWORK: &str = "ethereum";

/// Network tokens every Bancor pool is quoted against. An `X/BNT` pool is
/// reported as the single-asset rate for `X`.
const ANCHOR_TOKENS: &[&str] = &["BNT"];

/// Bancor v2 pools. APY is the last 24h of fees annualised over liquidity.
pub struct BancorAdapter {
    http: HttpSource,
}

impl BancorAdapter {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        Ok(BancorAdapter {
            http: HttpSource::new(Protocol::Bancor.id(), config)?,
        })
    }

    async fn fetch_pools(&self, timeout: Duration) -> std::result::Result<Vec<Observation>, FetchError> {
        let response: PoolsResponse = self.http.get_json("pools", timeout).await?;
        let observed_at = Timestamp::now();

        let mut observations = Vec::new();
        for pool in response.data {
            if pool.dlt_type != NETWORK {
                continue;
            }

            let Some(apy) = pool_apy(&pool) else {
                continue;
            };

            let symbols: Vec<String> = pool
                .reserves
                .into_iter()
                .map(|r| r.symbol)
                .filter(|s| !ANCHOR_TOKENS.iter().any(|a| a.eq_ignore_ascii_case(s)))
                .collect();

            match symbols.as_slice() {
                [symbol] => observations.push(Observation::asset(
                    Protocol::Bancor.id(),
                    symbol.clone(),
                    apy,
                    observed_at,
                )),
                [symbol0, symbol1] => observations.push(Observation::pair(
                    Protocol::Bancor.id(),
                    symbol0.clone(),
                    symbol1.clone(),
                    apy,
                    observed_at,
                )),
                _ => {}
            }
        }

        Ok(observations)
    }
}

fn pool_apy(pool: &Pool) -> Option<f64> {
    let fees_24h = pool.fees_24h.usd.to_f64()?;
    let liquidity = pool.liquidity.usd.to_f64()?;
    if liquidity <= 0.0 {
        return None;
    }
    Some(DAYS_PER_YEAR * fees_24h / liquidity)
}

#[async_trait]
impl SourceAdapter for BancorAdapter {
    async fn fetch(&self, timeout: Duration) -> std::result::Result<Vec<Observation>, FetchError> {
        tokio::time::timeout(timeout, self.fetch_pools(timeout))
            .await
            .map_err(|_| FetchError::timeout(self.source_id(), format!("no response within {:?}", timeout)))?
    }

    fn source_id(&self) -> &str {
        self.http.source_id()
    }
}

#[derive(Deserialize)]
struct PoolsResponse {
    data: Vec<Pool>,
}

#[derive(Deserialize)]
struct Pool {
    dlt_type: String,
    reserves: Vec<Reserve>,
    fees_24h: UsdAmount,
    liquidity: UsdAmount,
}

#[derive(Deserialize)]
struct Reserve {
    symbol: String,
}

#[derive(Deserialize)]
struct UsdAmount {
    usd: Numeric,
}
