//! Configuration loading and management

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Language used for built-in word recognition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    English,
    Italian,
    Japanese,
    German,
    Spanish,
    French,
}

impl Language {
    /// Code sent to the module
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Recognition settings applied during initialization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Custom command strictness (1 easy - 5 hard)
    pub level: u8,
    /// Built-in word confidence threshold (0 loosest - 4 tightest)
    pub knob: u8,
    pub language: Language,
    /// How long the module needs after power-up before it accepts commands
    pub boot_delay_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            level: 2,
            knob: 2,
            language: Language::English,
            boot_delay_ms: 1000,
        }
    }
}

impl DeviceConfig {
    pub fn boot_delay(&self) -> Duration {
        Duration::from_millis(self.boot_delay_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=5).contains(&self.level) {
            bail!("level must be 1-5, got {}", self.level);
        }
        if self.knob > 4 {
            bail!("knob must be 0-4, got {}", self.knob);
        }
        Ok(())
    }
}

/// Daemon configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial bridge the module is reachable through
    pub address: SocketAddr,

    pub device: DeviceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: SocketAddr::from(([127, 0, 0, 1], 4000)),
            device: DeviceConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from `EASYVR_CONFIG` (if set), environment and defaults
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var_os("EASYVR_CONFIG") {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };

        if let Ok(address) = std::env::var("EASYVR_ADDRESS") {
            config.address = address
                .parse()
                .with_context(|| format!("invalid EASYVR_ADDRESS: {}", address))?;
        }

        config.device.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("invalid config in {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.device.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.device.level, 2);
        assert_eq!(config.device.knob, 2);
        assert_eq!(config.device.language.code(), 0);
        assert_eq!(config.device.boot_delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_partial_json() {
        let config = Config::from_json(
            r#"{"address":"10.0.0.5:2001","device":{"knob":4,"language":"french"}}"#,
        )
        .unwrap();
        assert_eq!(config.address.port(), 2001);
        assert_eq!(config.device.knob, 4);
        assert_eq!(config.device.level, 2);
        assert_eq!(config.device.language, Language::French);
        assert_eq!(config.device.language.code(), 5);
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(Config::from_json(r#"{"device":{"level":0}}"#).is_err());
        assert!(Config::from_json(r#"{"device":{"knob":5}}"#).is_err());
    }
}
