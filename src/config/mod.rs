//! Configuration loading and validation for the risk engine.
//!
//! Uses serde_yaml to load YAML configuration files.

mod app;
pub mod duration;
mod error;
mod monitor;
mod risk;

pub use app::AppConfig;
pub use error::ConfigError;
pub use monitor::MonitorConfig;
pub use risk::RiskConfig;

use serde::Deserialize;
use std::fs;

/// Root configuration structure for the risk engine.
///
/// Required sections: app, symbols. Optional sections: risk, monitor.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Application-level settings like name and environment.
    pub app: AppConfig,
    /// Futures symbols to supervise (e.g. "BTCUSDT").
    pub symbols: Vec<String>,
    /// Risk limits (optional, defaults apply).
    pub risk: Option<RiskConfig>,
    /// Monitor loop intervals (optional).
    pub monitor: Option<MonitorConfig>,
}

impl Config {
    /// Load configuration from a YAML file at the given path.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.app.name.is_empty() {
            return Err(ConfigError::Validation("app.name is required".into()));
        }

        if self.symbols.is_empty() {
            return Err(ConfigError::Validation(
                "at least one symbol is required".into(),
            ));
        }

        if let Some(ref risk) = self.risk {
            risk.validate()?;
        }

        Ok(())
    }
}
