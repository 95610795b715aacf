pub mod store;

use serde::{Deserialize, Serialize};
use crate::types::asset::CanonicalAsset;
use crate::types::pair::CanonicalPair;
use crate::types::timestamp::Timestamp;

pub use store::SnapshotStore;

/// Derived 30-day rate for one (protocol, asset).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssetRateRecord {
    pub protocol: String,
    pub asset: CanonicalAsset,
    /// The protocol's own spelling, e.g. `WBTC` for BTC.
    pub symbol_wrapped: String,
    pub apy_average_30days: f64,
    pub sample_count: usize,
}

/// Derived 30-day rate for one (protocol, pair).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PairRateRecord {
    pub protocol: String,
    pub pair: CanonicalPair,
    pub symbol0_wrapped: String,
    pub symbol1_wrapped: String,
    pub apy_average_30days: f64,
    pub sample_count: usize,
}

/// Immutable, versioned view of every published rate.
///
/// A snapshot is never edited after publication; the next cycle supersedes it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub sequence: u64,
    pub published_at: Timestamp,
    pub asset_records: Vec<AssetRateRecord>,
    pub pair_records: Vec<PairRateRecord>,
}

impl Snapshot {
    /// The value readers see before the first cycle completes.
    pub fn empty() -> Self {
        Snapshot {
            sequence: 0,
            published_at: Timestamp::from_millis(0),
            asset_records: Vec::new(),
            pair_records: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.asset_records.is_empty() && self.pair_records.is_empty()
    }

    pub fn protocols(&self) -> Vec<&str> {
        let mut protocols: Vec<&str> = self
            .asset_records
            .iter()
            .map(|r| r.protocol.as_str())
            .chain(self.pair_records.iter().map(|r| r.protocol.as_str()))
            .collect();
        protocols.sort_unstable();
        protocols.dedup();
        protocols
    }
}
