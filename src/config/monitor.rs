//! Monitor loop configuration.

use serde::Deserialize;
use std::time::Duration;

/// Intervals for the periodic risk monitor.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// How often open positions are refreshed (default 1s).
    #[serde(default, deserialize_with = "super::duration::deserialize")]
    pub update_interval: Duration,
    /// How often funding rates are refreshed (default 5m).
    #[serde(default, deserialize_with = "super::duration::deserialize")]
    pub funding_refresh_interval: Duration,
}

impl MonitorConfig {
    /// Position refresh interval, falling back to the 1s default.
    pub fn update_interval_or_default(&self) -> Duration {
        if self.update_interval.as_millis() > 0 {
            self.update_interval
        } else {
            Duration::from_secs(1)
        }
    }

    /// Funding refresh interval, falling back to the 5m default.
    pub fn funding_refresh_or_default(&self) -> Duration {
        if self.funding_refresh_interval.as_secs() > 0 {
            self.funding_refresh_interval
        } else {
            Duration::from_secs(300)
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            update_interval: Duration::ZERO,
            funding_refresh_interval: Duration::ZERO,
        }
    }
}
