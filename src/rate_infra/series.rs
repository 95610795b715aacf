use std::time::Duration;
use crate::types::timestamp::Timestamp;

/// Compact the arena once this many evicted slots sit in front of the cursor
/// and they outnumber the retained ones.
const COMPACT_THRESHOLD: usize = 64;

#[derive(Clone, Debug, PartialEq)]
struct Sample {
    apy: f64,
    observed_at: Timestamp,
}

/// Rolling window of APY samples for one (protocol, asset) or
/// (protocol, pair) key.
///
/// Samples live in an arena ordered by `observed_at`; `head` marks the oldest
/// retained sample, so eviction only advances the cursor. Samples sharing a
/// timestamp are all retained, in arrival order.
#[derive(Clone, Debug)]
pub struct RateSeries {
    samples: Vec<Sample>,
    head: usize,
    window: Duration,
    /// Provider spelling(s) from the most recently observed sample.
    wrapped_symbols: Vec<String>,
    latest_observed_at: Option<Timestamp>,
}

impl RateSeries {
    pub fn new(window: Duration) -> Self {
        RateSeries {
            samples: Vec::new(),
            head: 0,
            window,
            wrapped_symbols: Vec::new(),
            latest_observed_at: None,
        }
    }

    /// Insert a sample and evict everything older than the window measured
    /// back from `observed_at`.
    pub fn push(&mut self, apy: f64, observed_at: Timestamp, wrapped_symbols: &[String]) {
        let retained = &self.samples[self.head..];
        let offset = retained.partition_point(|s| s.observed_at <= observed_at);
        self.samples.insert(self.head + offset, Sample { apy, observed_at });

        if self.latest_observed_at.map_or(true, |latest| observed_at >= latest) {
            self.latest_observed_at = Some(observed_at);
            self.wrapped_symbols = wrapped_symbols.to_vec();
        }

        self.evict_before(observed_at.saturating_sub(self.window));
    }

    /// Evict against a clock reading rather than a new sample.
    pub fn evict_expired(&mut self, now: Timestamp) {
        self.evict_before(now.saturating_sub(self.window));
    }

    fn evict_before(&mut self, cutoff: Timestamp) {
        while self.head < self.samples.len() && self.samples[self.head].observed_at < cutoff {
            self.head += 1;
        }

        if self.head >= COMPACT_THRESHOLD && self.head > self.len() {
            self.samples.drain(..self.head);
            self.head = 0;
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len() - self.head
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Arithmetic mean over the retained window; `None` when empty.
    ///
    /// Finite samples always give a finite mean: when the plain sum
    /// overflows, each sample is scaled by `1/n` before summing.
    pub fn average(&self) -> Option<f64> {
        let retained = &self.samples[self.head..];
        if retained.is_empty() {
            return None;
        }
        let n = retained.len() as f64;
        let sum: f64 = retained.iter().map(|s| s.apy).sum();
        if sum.is_finite() {
            return Some(sum / n);
        }
        Some(retained.iter().map(|s| s.apy / n).sum())
    }

    pub fn wrapped_symbols(&self) -> &[String] {
        &self.wrapped_symbols
    }

    pub fn oldest(&self) -> Option<Timestamp> {
        self.samples.get(self.head).map(|s| s.observed_at)
    }

    pub fn newest(&self) -> Option<Timestamp> {
        self.samples[self.head..].last().map(|s| s.observed_at)
    }
}
