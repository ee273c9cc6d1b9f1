//! Online data source configuration parsed from environment variables.

use anyhow::{Context, Result};
use std::env;

/// Alpaca market data API configuration
#[derive(Debug, Clone, Default)]
pub struct AlpacaConfig {
    pub api_key: String,
    pub secret_key: String,
    pub data_url: String,
}

impl AlpacaConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: env::var("ALPACA_API_KEY").unwrap_or_default(),
            secret_key: env::var("ALPACA_SECRET_KEY").unwrap_or_default(),
            data_url: env::var("ALPACA_DATA_URL")
                .unwrap_or_else(|_| "https://data.alpaca.markets".to_string()),
        }
    }

    pub fn has_credentials(&self) -> bool {
        !self.api_key.is_empty() && !self.secret_key.is_empty()
    }
}

/// Transport settings shared by HTTP-backed sources
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

impl HttpSettings {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            timeout_secs: env::var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| defaults.timeout_secs.to_string())
                .parse::<u64>()
                .context("Failed to parse HTTP_TIMEOUT_SECS")?,
            max_retries: env::var("HTTP_MAX_RETRIES")
                .unwrap_or_else(|_| defaults.max_retries.to_string())
                .parse::<u32>()
                .context("Failed to parse HTTP_MAX_RETRIES")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alpaca_config_defaults() {
        let config = AlpacaConfig::from_env();
        assert!(config.data_url.contains("alpaca.markets"));
    }

    #[test]
    fn test_http_settings_defaults() {
        let settings = HttpSettings::default();
        assert_eq!(settings.timeout_secs, 30);
        assert_eq!(settings.max_retries, 3);
    }
}
