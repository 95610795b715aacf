use serde::{Deserialize, Serialize};
use std::fmt;
use crate::types::asset::CanonicalAsset;

/// Unordered pair of distinct canonical assets, stored with `symbol0 < symbol1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CanonicalPair {
    symbol0: CanonicalAsset,
    symbol1: CanonicalAsset,
}

impl CanonicalPair {
    /// Returns `None` when both sides are the same asset.
    pub fn new(a: CanonicalAsset, b: CanonicalAsset) -> Option<Self> {
        CanonicalPair::normalize(a, b).map(|(pair, _)| pair)
    }

    /// Like `new`, also reporting whether the inputs had to be swapped.
    pub fn normalize(a: CanonicalAsset, b: CanonicalAsset) -> Option<(Self, bool)> {
        if a == b {
            return None;
        }
        let swapped = a > b;
        let (symbol0, symbol1) = if swapped { (b, a) } else { (a, b) };
        Some((CanonicalPair { symbol0, symbol1 }, swapped))
    }

    pub fn symbol0(&self) -> CanonicalAsset {
        self.symbol0
    }

    pub fn symbol1(&self) -> CanonicalAsset {
        self.symbol1
    }
}

impl fmt::Display for CanonicalPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.symbol0, self.symbol1)
    }
}
