pub mod aggregator;
pub mod connectors;
pub mod rate_limiter;
pub mod registry;
pub mod series;

use serde::{Deserialize, Serialize};
use crate::types::timestamp::Timestamp;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObservationKind {
    Asset,
    Pair,
}

impl ObservationKind {
    pub fn symbol_count(&self) -> usize {
        match self {
            ObservationKind::Asset => 1,
            ObservationKind::Pair => 2,
        }
    }
}

/// One raw rate reading as reported by a source adapter, before symbol
/// resolution. `raw_symbols` keeps the provider's spelling (e.g. `WBTC`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub protocol: String,
    pub kind: ObservationKind,
    pub raw_symbols: Vec<String>,
    /// Fraction, not percentage: 0.07 is 7%.
    pub apy: f64,
    pub observed_at: Timestamp,
}

impl Observation {
    pub fn asset(
        protocol: impl Into<String>,
        symbol: impl Into<String>,
        apy: f64,
        observed_at: Timestamp,
    ) -> Self {
        Observation {
            protocol: protocol.into(),
            kind: ObservationKind::Asset,
            raw_symbols: vec![symbol.into()],
            apy,
            observed_at,
        }
    }

    pub fn pair(
        protocol: impl Into<String>,
        symbol0: impl Into<String>,
        symbol1: impl Into<String>,
        apy: f64,
        observed_at: Timestamp,
    ) -> Self {
        Observation {
            protocol: protocol.into(),
            kind: ObservationKind::Pair,
            raw_symbols: vec![symbol0.into(), symbol1.into()],
            apy,
            observed_at,
        }
    }
}
