//! Configuration Loader
//!
//! Loads and validates configuration from TOML files matching config.toml structure.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::domain::validate::validate_token_address;

/// Main configuration structure matching config.toml
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiSection,
    pub chain: ChainSection,
    pub trading: TradingSection,
    pub storage: StorageSection,
    pub logging: LoggingSection,
}

/// Aggregator API configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct ApiSection {
    /// 0x API base URL
    pub base_url: String,
    /// API key; can also come from the ZEROEX_API_KEY env var
    #[serde(default)]
    pub api_key: Option<String>,
    /// API version header value
    pub version: String,
}

impl ApiSection {
    /// Get API key with environment variable fallback
    /// Checks ZEROEX_API_KEY env var if config value is empty/None
    pub fn get_api_key(&self) -> Option<String> {
        if let Some(ref key) = self.api_key {
            if !key.is_empty() {
                return Some(key.clone());
            }
        }
        std::env::var("ZEROEX_API_KEY").ok()
    }
}

/// Chain configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct ChainSection {
    /// Numeric chain id sent with every API call
    pub chain_id: u64,
    /// RPC endpoint (use a private RPC for production)
    pub rpc_url: String,
    /// Wrapped native token contract
    pub weth_address: String,
    /// USDC contract, used as the USD pricing leg
    pub usdc_address: String,
}

impl ChainSection {
    /// Get RPC URL with environment variable override
    /// Checks RPC_URL env var first, falls back to config value
    pub fn get_rpc_url(&self) -> String {
        std::env::var("RPC_URL").unwrap_or_else(|_| self.rpc_url.clone())
    }
}

/// Trading configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct TradingSection {
    /// Slippage tolerance in percent (1.0 = 1%)
    pub slippage_percentage: f64,
    /// Seconds between trade status polls
    #[serde(default = "default_status_poll_interval")]
    pub status_poll_interval_secs: u64,
    /// Seconds before an unsettled trade counts as timed out (60-300)
    #[serde(default = "default_status_poll_deadline")]
    pub status_poll_deadline_secs: u64,
    /// Seconds between position monitor price checks
    #[serde(default = "default_monitor_interval")]
    pub monitor_interval_secs: u64,
}

fn default_status_poll_interval() -> u64 {
    3
}

fn default_status_poll_deadline() -> u64 {
    120
}

fn default_monitor_interval() -> u64 {
    5
}

/// Storage configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSection {
    /// Directory holding the persisted bot state
    pub data_dir: String,
}

/// Logging configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Log to file (in addition to stdout)
    pub log_to_file: bool,
    /// Log file path
    pub log_file: String,
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validate API section
        if self.api.base_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "base_url cannot be empty".to_string(),
            ));
        }

        if self.api.version.is_empty() {
            return Err(ConfigError::ValidationError(
                "version cannot be empty".to_string(),
            ));
        }

        // Validate chain section
        if self.chain.chain_id == 0 {
            return Err(ConfigError::ValidationError(
                "chain_id must be > 0".to_string(),
            ));
        }

        if self.chain.rpc_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "rpc_url cannot be empty".to_string(),
            ));
        }

        validate_token_address(&self.chain.weth_address).map_err(|e| {
            ConfigError::ValidationError(format!("weth_address: {}", e))
        })?;

        validate_token_address(&self.chain.usdc_address).map_err(|e| {
            ConfigError::ValidationError(format!("usdc_address: {}", e))
        })?;

        // Validate trading section
        if self.trading.slippage_percentage <= 0.0 || self.trading.slippage_percentage > 100.0 {
            return Err(ConfigError::ValidationError(format!(
                "slippage_percentage must be 0-100, got {}",
                self.trading.slippage_percentage
            )));
        }

        if self.trading.status_poll_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "status_poll_interval_secs must be > 0".to_string(),
            ));
        }

        if !(60..=300).contains(&self.trading.status_poll_deadline_secs) {
            return Err(ConfigError::ValidationError(format!(
                "status_poll_deadline_secs must be 60-300, got {}",
                self.trading.status_poll_deadline_secs
            )));
        }

        if self.trading.monitor_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "monitor_interval_secs must be > 0".to_string(),
            ));
        }

        // Validate storage
        if self.storage.data_dir.is_empty() {
            return Err(ConfigError::ValidationError(
                "data_dir cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn status_poll_interval(&self) -> Duration {
        Duration::from_secs(self.trading.status_poll_interval_secs)
    }

    pub fn status_poll_deadline(&self) -> Duration {
        Duration::from_secs(self.trading.status_poll_deadline_secs)
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.trading.monitor_interval_secs)
    }
}

// Conversion from Config to the API client configuration
impl From<&Config> for crate::adapters::zeroex::ZeroExConfig {
    fn from(config: &Config) -> Self {
        crate::adapters::zeroex::ZeroExConfig {
            api_base_url: config.api.base_url.clone(),
            api_key: config.api.get_api_key(),
            api_version: config.api.version.clone(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_valid_config() -> String {
        r#"
[api]
base_url = "https://api.0x.org"
version = "v2"

[chain]
chain_id = 1
rpc_url = "https://eth.llamarpc.com"
weth_address = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"
usdc_address = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"

[trading]
slippage_percentage = 1.0
status_poll_interval_secs = 3
status_poll_deadline_secs = 120
monitor_interval_secs = 5

[storage]
data_dir = "data"

[logging]
level = "info"
log_to_file = true
log_file = "logs/swapsmith.log"
"#
        .to_string()
    }

    #[test]
    fn test_load_valid_config() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(create_valid_config().as_bytes()).unwrap();

        let config = load_config(file.path()).unwrap();

        assert_eq!(config.api.base_url, "https://api.0x.org");
        assert_eq!(config.chain.chain_id, 1);
        assert_eq!(config.trading.slippage_percentage, 1.0);
        assert_eq!(config.status_poll_interval(), Duration::from_secs(3));
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_config("/nonexistent/path/config.toml");
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ConfigError::IoError(_)));
    }

    #[test]
    fn test_timer_defaults_apply() {
        let minimal = r#"
[api]
base_url = "https://api.0x.org"
version = "v2"

[chain]
chain_id = 1
rpc_url = "https://eth.llamarpc.com"
weth_address = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"
usdc_address = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"

[trading]
slippage_percentage = 0.5

[storage]
data_dir = "data"

[logging]
level = "info"
log_to_file = false
log_file = "logs/swapsmith.log"
"#;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(minimal.as_bytes()).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.trading.status_poll_interval_secs, 3);
        assert_eq!(config.trading.status_poll_deadline_secs, 120);
        assert_eq!(config.trading.monitor_interval_secs, 5);
    }

    #[test]
    fn test_deadline_out_of_range() {
        let invalid = create_valid_config().replace(
            "status_poll_deadline_secs = 120",
            "status_poll_deadline_secs = 30",
        );
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(invalid.as_bytes()).unwrap();

        let result = load_config(file.path());
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::ValidationError(_)
        ));
    }

    #[test]
    fn test_bad_weth_address_rejected() {
        let invalid = create_valid_config().replace(
            "weth_address = \"0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2\"",
            "weth_address = \"0x1234\"",
        );
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(invalid.as_bytes()).unwrap();

        let result = load_config(file.path());
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::ValidationError(_)
        ));
    }

    #[test]
    fn test_zero_slippage_rejected() {
        let invalid = create_valid_config()
            .replace("slippage_percentage = 1.0", "slippage_percentage = 0.0");
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(invalid.as_bytes()).unwrap();

        let result = load_config(file.path());
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::ValidationError(_)
        ));
    }

    #[test]
    fn test_config_to_client_config() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(create_valid_config().as_bytes()).unwrap();

        let config = load_config(file.path()).unwrap();
        let client_config = crate::adapters::zeroex::ZeroExConfig::from(&config);

        assert_eq!(client_config.api_base_url, "https://api.0x.org");
        assert_eq!(client_config.api_version, "v2");
    }
}
