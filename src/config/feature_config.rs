//! Feature pipeline configuration parsed from environment variables.
//!
//! Covers the instrument, the requested information keys (directly or through a
//! model preset), the window length and the history anchor.

use crate::domain::ml::model_config::{DEFAULT_NUM_DAYS, ModelConfig, ModelPreset};
use crate::domain::ml::normalizer::DegeneratePolicy;
use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use std::env;
use std::str::FromStr;

pub const DEFAULT_START_DATE: &str = "2020-01-02";
pub const DEFAULT_END_DATE: &str = "2023-06-05";

/// Where window rows come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionPolicy {
    Online,
    Offline,
    OnlineWithFallback,
}

impl FromStr for AcquisitionPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "online" => Ok(AcquisitionPolicy::Online),
            "offline" => Ok(AcquisitionPolicy::Offline),
            "online_with_fallback" => Ok(AcquisitionPolicy::OnlineWithFallback),
            _ => bail!(
                "Invalid ACQUISITION_MODE: {}. Must be 'online', 'offline', or 'online_with_fallback'",
                s
            ),
        }
    }
}

/// `fail`, `skip` or `default:<range>`.
pub fn parse_degenerate_policy(s: &str) -> Result<DegeneratePolicy> {
    let lowered = s.trim().to_lowercase();
    match lowered.as_str() {
        "fail" => Ok(DegeneratePolicy::Fail),
        "skip" => Ok(DegeneratePolicy::Skip),
        other => match other.strip_prefix("default:") {
            Some(range) => {
                let range = range
                    .trim()
                    .parse::<f64>()
                    .context(format!("Invalid default range in DEGENERATE_POLICY: {}", s))?;
                if !range.is_finite() || range <= 0.0 {
                    bail!("DEGENERATE_POLICY default range must be positive, got {}", range);
                }
                Ok(DegeneratePolicy::DefaultRange(range))
            }
            None => bail!(
                "Invalid DEGENERATE_POLICY: {}. Must be 'fail', 'skip', or 'default:<range>'",
                s
            ),
        },
    }
}

#[derive(Debug, Clone)]
pub struct FeatureEnvConfig {
    pub stock_symbol: String,
    pub preset: ModelPreset,
    pub information_keys: Option<Vec<String>>,
    pub num_days: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub acquisition: AcquisitionPolicy,
    pub degenerate_policy: DegeneratePolicy,
}

impl FeatureEnvConfig {
    pub fn from_env() -> Result<Self> {
        let stock_symbol = env::var("STOCK_SYMBOL").unwrap_or_else(|_| "AAPL".to_string());

        let preset = env::var("MODEL_PRESET")
            .unwrap_or_else(|_| ModelPreset::DayTrade.as_str().to_string())
            .parse::<ModelPreset>()
            .context("Failed to parse MODEL_PRESET")?;

        let information_keys = env::var("INFORMATION_KEYS")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.split(',').map(|k| k.trim().to_string()).collect());

        let num_days = env::var("NUM_DAYS")
            .unwrap_or_else(|_| DEFAULT_NUM_DAYS.to_string())
            .parse::<usize>()
            .context("Failed to parse NUM_DAYS")?;

        let start_date = Self::parse_date("START_DATE", DEFAULT_START_DATE)?;
        let end_date = Self::parse_date("END_DATE", DEFAULT_END_DATE)?;

        let acquisition = env::var("ACQUISITION_MODE")
            .unwrap_or_else(|_| "online_with_fallback".to_string())
            .parse::<AcquisitionPolicy>()?;

        let degenerate_policy = parse_degenerate_policy(
            &env::var("DEGENERATE_POLICY").unwrap_or_else(|_| "fail".to_string()),
        )?;

        Ok(Self {
            stock_symbol,
            preset,
            information_keys,
            num_days,
            start_date,
            end_date,
            acquisition,
            degenerate_policy,
        })
    }

    /// Explicit information keys win over the preset.
    pub fn model_config(&self) -> Result<ModelConfig> {
        let config = match &self.information_keys {
            Some(keys) => ModelConfig::from_keys(
                self.stock_symbol.clone(),
                keys.as_slice(),
                self.num_days,
                self.start_date,
                self.end_date,
            ),
            None => ModelConfig::from_preset(
                self.preset,
                self.stock_symbol.clone(),
                self.num_days,
                self.start_date,
                self.end_date,
            ),
        };
        config.context("Invalid model configuration")
    }

    fn parse_date(key: &str, default: &str) -> Result<NaiveDate> {
        let raw = env::var(key).unwrap_or_else(|_| default.to_string());
        NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .context(format!("Failed to parse {} (expected YYYY-MM-DD)", key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquisition_policy_parsing() {
        assert_eq!(
            "Online_With_Fallback".parse::<AcquisitionPolicy>().unwrap(),
            AcquisitionPolicy::OnlineWithFallback
        );
        assert_eq!("offline".parse::<AcquisitionPolicy>().unwrap(), AcquisitionPolicy::Offline);
        assert!("both".parse::<AcquisitionPolicy>().is_err());
    }

    #[test]
    fn test_degenerate_policy_parsing() {
        assert_eq!(parse_degenerate_policy("fail").unwrap(), DegeneratePolicy::Fail);
        assert_eq!(parse_degenerate_policy(" Skip ").unwrap(), DegeneratePolicy::Skip);
        assert_eq!(
            parse_degenerate_policy("default:2.5").unwrap(),
            DegeneratePolicy::DefaultRange(2.5)
        );
        assert!(parse_degenerate_policy("default:0").is_err());
        assert!(parse_degenerate_policy("default:abc").is_err());
        assert!(parse_degenerate_policy("ignore").is_err());
    }
}
