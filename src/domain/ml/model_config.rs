use crate::domain::errors::FeatureError;
use crate::domain::ml::feature_registry::ColumnKey;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_NUM_DAYS: usize = 60;

/// Named sets of information keys, one per model variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelPreset {
    DayTrade,
    Macd,
    ImpulseMacd,
    Reversal,
    Earnings,
    Rsi,
    Breakout,
}

impl ModelPreset {
    pub fn columns(self) -> Vec<ColumnKey> {
        use ColumnKey::*;
        match self {
            ModelPreset::DayTrade => vec![Close],
            ModelPreset::Macd => vec![Close, Macd, Histogram, EmaFlips, Ema200],
            ModelPreset::ImpulseMacd => vec![
                Close, Histogram, Momentum, Change, EmaFlips, SignalFlips, Ema200,
            ],
            ModelPreset::Reversal => vec![
                Close,
                GradualLiquiditySpike,
                SharpLiquiditySpike,
                MomentumOscillator,
            ],
            ModelPreset::Earnings => vec![Close, EarningDiffs, Momentum],
            ModelPreset::Rsi => vec![Close, Rsi, Trama],
            ModelPreset::Breakout => vec![
                Close,
                Rsi,
                Trama,
                BollingerMiddle,
                AboveBollinger,
                BelowBollinger,
                Momentum,
            ],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ModelPreset::DayTrade => "day_trade",
            ModelPreset::Macd => "macd",
            ModelPreset::ImpulseMacd => "impulse_macd",
            ModelPreset::Reversal => "reversal",
            ModelPreset::Earnings => "earnings",
            ModelPreset::Rsi => "rsi",
            ModelPreset::Breakout => "breakout",
        }
    }
}

impl fmt::Display for ModelPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelPreset {
    type Err = FeatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "day_trade" | "daytrade" => Ok(ModelPreset::DayTrade),
            "macd" => Ok(ModelPreset::Macd),
            "impulse_macd" | "impulsemacd" => Ok(ModelPreset::ImpulseMacd),
            "reversal" => Ok(ModelPreset::Reversal),
            "earnings" => Ok(ModelPreset::Earnings),
            "rsi" => Ok(ModelPreset::Rsi),
            "breakout" => Ok(ModelPreset::Breakout),
            other => Err(FeatureError::InvalidConfig {
                reason: format!("unknown model preset '{}'", other),
            }),
        }
    }
}

/// Immutable description of one model's feature window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConfig {
    stock_symbol: String,
    columns: Vec<ColumnKey>,
    num_days: usize,
    start_date: NaiveDate,
    end_date: NaiveDate,
}

impl ModelConfig {
    pub fn new(
        stock_symbol: impl Into<String>,
        columns: Vec<ColumnKey>,
        num_days: usize,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Self, FeatureError> {
        let stock_symbol = stock_symbol.into();

        if stock_symbol.trim().is_empty() {
            return Err(FeatureError::InvalidConfig {
                reason: "stock symbol is empty".to_string(),
            });
        }
        if columns.is_empty() {
            return Err(FeatureError::InvalidConfig {
                reason: "no information keys requested".to_string(),
            });
        }
        let mut seen = HashSet::new();
        if let Some(duplicate) = columns.iter().find(|c| !seen.insert(**c)) {
            return Err(FeatureError::InvalidConfig {
                reason: format!("information key '{}' requested twice", duplicate),
            });
        }
        if num_days == 0 {
            return Err(FeatureError::InvalidConfig {
                reason: "num_days must be at least 1".to_string(),
            });
        }
        if start_date > end_date {
            return Err(FeatureError::InvalidConfig {
                reason: format!("start date {} is after end date {}", start_date, end_date),
            });
        }

        Ok(Self {
            stock_symbol,
            columns,
            num_days,
            start_date,
            end_date,
        })
    }

    /// Parses information keys by their registered names.
    pub fn from_keys<S: AsRef<str>>(
        stock_symbol: impl Into<String>,
        keys: &[S],
        num_days: usize,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Self, FeatureError> {
        let columns = keys
            .iter()
            .map(|k| ColumnKey::from_name(k.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(stock_symbol, columns, num_days, start_date, end_date)
    }

    pub fn from_preset(
        preset: ModelPreset,
        stock_symbol: impl Into<String>,
        num_days: usize,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Self, FeatureError> {
        Self::new(stock_symbol, preset.columns(), num_days, start_date, end_date)
    }

    pub fn stock_symbol(&self) -> &str {
        &self.stock_symbol
    }

    pub fn columns(&self) -> &[ColumnKey] {
        &self.columns
    }

    pub fn num_days(&self) -> usize {
        self.num_days
    }

    /// First day of indicator history.
    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    pub fn needs_earnings(&self) -> bool {
        self.columns.contains(&ColumnKey::EarningDiffs)
    }
}
