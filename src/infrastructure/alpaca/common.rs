use crate::domain::errors::MarketDataError;
use crate::domain::market::series::Candle;
use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct AlpacaBar {
    #[serde(rename = "t")]
    pub timestamp: String,
    #[serde(rename = "o")]
    pub open: f64,
    #[serde(rename = "h")]
    pub high: f64,
    #[serde(rename = "l")]
    pub low: f64,
    #[serde(rename = "c")]
    pub close: f64,
    #[serde(rename = "v")]
    pub volume: f64,
}

/// Page of `/v2/stocks/bars`.
#[derive(Debug, Deserialize)]
pub struct AlpacaBarsResponse {
    #[serde(default)]
    pub bars: HashMap<String, Vec<AlpacaBar>>,
    pub next_page_token: Option<String>,
}

impl AlpacaBar {
    pub fn trading_date(&self) -> Option<NaiveDate> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|ts| ts.date_naive())
    }

    pub fn to_candle(&self, symbol: &str) -> Result<Candle, MarketDataError> {
        let invalid = |reason: String| MarketDataError::InvalidData {
            symbol: symbol.to_string(),
            reason,
        };
        let decimal = |field: &str, value: f64| {
            Decimal::from_f64_retain(value)
                .ok_or_else(|| invalid(format!("{} {} is not a valid decimal", field, value)))
        };

        let date = self
            .trading_date()
            .ok_or_else(|| invalid(format!("bad bar timestamp '{}'", self.timestamp)))?;

        Ok(Candle {
            symbol: symbol.to_string(),
            date,
            open: decimal("open", self.open)?,
            high: decimal("high", self.high)?,
            low: decimal("low", self.low)?,
            close: decimal("close", self.close)?,
            volume: decimal("volume", self.volume)?,
        })
    }
}
