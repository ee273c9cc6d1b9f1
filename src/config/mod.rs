//! Configuration module for stockbot.
//!
//! Structured configuration loaded from environment variables, organized by
//! concern: feature pipeline, persisted data and the online data source.

mod broker_config;
mod feature_config;

pub use broker_config::{AlpacaConfig, HttpSettings};
pub use feature_config::{AcquisitionPolicy, FeatureEnvConfig, parse_degenerate_policy};

use crate::domain::ml::model_config::ModelConfig;
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub feature: FeatureEnvConfig,
    /// Root of the per-symbol snapshot, scaler and earnings files.
    pub data_dir: PathBuf,
    pub alpaca: AlpacaConfig,
    pub http: HttpSettings,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let feature = FeatureEnvConfig::from_env().context("Failed to load feature config")?;
        let data_dir = PathBuf::from(env::var("DATA_DIR").unwrap_or_else(|_| "Stocks".to_string()));
        let alpaca = AlpacaConfig::from_env();
        let http = HttpSettings::from_env().context("Failed to load HTTP settings")?;

        Ok(Self {
            feature,
            data_dir,
            alpaca,
            http,
        })
    }

    pub fn model_config(&self) -> Result<ModelConfig> {
        self.feature.model_config()
    }

    pub fn symbol_dir(&self) -> PathBuf {
        self.data_dir.join(&self.feature.stock_symbol)
    }
}
