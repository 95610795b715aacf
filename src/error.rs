use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Symbol Registry Errors
    #[error(transparent)]
    UnknownSymbol(#[from] UnknownSymbolError),

    #[error("Invalid registry alias: {0}")]
    InvalidAlias(String),

    // Aggregation Errors
    #[error("Non-finite APY {apy} reported by {protocol}")]
    NonFiniteApy {
        protocol: String,
        apy: f64,
    },

    #[error("Observation from {protocol} at {observed_at} is older than the rate window")]
    StaleObservation {
        protocol: String,
        observed_at: crate::types::timestamp::Timestamp,
    },

    #[error("Observation from {protocol} at {observed_at} is ahead of the cycle clock")]
    FutureObservation {
        protocol: String,
        observed_at: crate::types::timestamp::Timestamp,
    },

    #[error("Aggregation cycle failed: {0}")]
    CycleFailed(String),

    // System Errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Task error: {0}")]
    TaskError(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FetchErrorKind {
    Upstream,
    Timeout,
    MalformedResponse,
}

impl FetchErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchErrorKind::Upstream => "upstream",
            FetchErrorKind::Timeout => "timeout",
            FetchErrorKind::MalformedResponse => "malformed_response",
        }
    }
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of one adapter's fetch. Never fatal to a cycle.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind} error from {protocol}: {detail}")]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub protocol: String,
    pub detail: String,
}

impl FetchError {
    pub fn new(kind: FetchErrorKind, protocol: impl Into<String>, detail: impl Into<String>) -> Self {
        FetchError {
            kind,
            protocol: protocol.into(),
            detail: detail.into(),
        }
    }

    pub fn upstream(protocol: impl Into<String>, detail: impl Into<String>) -> Self {
        FetchError::new(FetchErrorKind::Upstream, protocol, detail)
    }

    pub fn timeout(protocol: impl Into<String>, detail: impl Into<String>) -> Self {
        FetchError::new(FetchErrorKind::Timeout, protocol, detail)
    }

    pub fn malformed(protocol: impl Into<String>, detail: impl Into<String>) -> Self {
        FetchError::new(FetchErrorKind::MalformedResponse, protocol, detail)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnknownSymbolReason {
    /// The raw symbol is neither canonical nor a known alias
    Unrecognized,
    /// The observation did not carry the symbols its kind requires
    Missing,
    /// Both sides of a pair resolve to the same canonical asset
    DegeneratePair,
}

/// An observation's symbol(s) could not be mapped onto the canonical universe.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Unknown symbol {symbol:?} for protocol {protocol} ({reason:?})")]
pub struct UnknownSymbolError {
    pub protocol: String,
    pub symbol: String,
    pub reason: UnknownSymbolReason,
}

impl UnknownSymbolError {
    pub fn unrecognized(protocol: &str, symbol: &str) -> Self {
        UnknownSymbolError {
            protocol: protocol.to_string(),
            symbol: symbol.to_string(),
            reason: UnknownSymbolReason::Unrecognized,
        }
    }

    pub fn missing(protocol: &str, detail: impl Into<String>) -> Self {
        UnknownSymbolError {
            protocol: protocol.to_string(),
            symbol: detail.into(),
            reason: UnknownSymbolReason::Missing,
        }
    }

    pub fn degenerate_pair(protocol: &str, symbol0: &str, symbol1: &str) -> Self {
        UnknownSymbolError {
            protocol: protocol.to_string(),
            symbol: format!("{}/{}", symbol0, symbol1),
            reason: UnknownSymbolReason::DegeneratePair,
        }
    }
}
