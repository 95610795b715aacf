use std::time::Duration;
use serde::{Deserialize, Serialize};

const SECONDS_PER_DAY: u64 = 86_400;

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    pub poll_interval_secs: u64,
    /// Upper bound for a single adapter's fetch.
    pub adapter_timeout_secs: u64,
    /// Upper bound for dispatch + collect across all adapters.
    pub cycle_deadline_secs: u64,
    pub window_days: u64,
}

impl EngineConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn adapter_timeout(&self) -> Duration {
        Duration::from_secs(self.adapter_timeout_secs)
    }

    pub fn cycle_deadline(&self) -> Duration {
        Duration::from_secs(self.cycle_deadline_secs)
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_days * SECONDS_PER_DAY)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            poll_interval_secs: 300,   // 5 minutes
            adapter_timeout_secs: 10,
            cycle_deadline_secs: 30,
            window_days: 30,
        }
    }
}
