use crate::domain::errors::FeatureError;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// One daily OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl Candle {
    /// Rejects bars that are physically impossible.
    pub fn validate(&self) -> Result<(), FeatureError> {
        if self.open <= Decimal::ZERO
            || self.high <= Decimal::ZERO
            || self.low <= Decimal::ZERO
            || self.close <= Decimal::ZERO
        {
            return Err(FeatureError::MalformedSeries {
                reason: format!(
                    "{} bar on {} has non-positive price component(s)",
                    self.symbol, self.date
                ),
            });
        }

        if self.low > self.high {
            return Err(FeatureError::MalformedSeries {
                reason: format!(
                    "{} bar on {} has low {} > high {}",
                    self.symbol, self.date, self.low, self.high
                ),
            });
        }

        if self.volume < Decimal::ZERO {
            return Err(FeatureError::MalformedSeries {
                reason: format!(
                    "{} bar on {} has negative volume {}",
                    self.symbol, self.date, self.volume
                ),
            });
        }

        Ok(())
    }

    pub fn close_f64(&self) -> Result<f64, FeatureError> {
        decimal_to_f64(self.close, "close", self.date)
    }

    pub fn volume_f64(&self) -> Result<f64, FeatureError> {
        decimal_to_f64(self.volume, "volume", self.date)
    }
}

fn decimal_to_f64(value: Decimal, field: &str, date: NaiveDate) -> Result<f64, FeatureError> {
    value
        .to_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| FeatureError::MalformedSeries {
            reason: format!("{} {} on {} is not representable as f64", field, value, date),
        })
}

/// Date-indexed daily bars for one instrument.
///
/// Dates are strictly increasing and every bar passes [`Candle::validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct RawSeries {
    symbol: String,
    candles: Vec<Candle>,
}

impl RawSeries {
    pub fn new(symbol: impl Into<String>, candles: Vec<Candle>) -> Result<Self, FeatureError> {
        let symbol = symbol.into();

        for candle in &candles {
            candle.validate()?;
            if candle.symbol != symbol {
                return Err(FeatureError::MalformedSeries {
                    reason: format!(
                        "bar for {} on {} in a {} series",
                        candle.symbol, candle.date, symbol
                    ),
                });
            }
        }

        if let Some(pair) = candles.windows(2).find(|w| w[1].date <= w[0].date) {
            return Err(FeatureError::MalformedSeries {
                reason: format!(
                    "dates must be strictly increasing: {} followed by {}",
                    pair[0].date, pair[1].date
                ),
            });
        }

        Ok(Self { symbol, candles })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.candles.first().map(|c| c.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.candles.last().map(|c| c.date)
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.candles.iter().map(|c| c.date).collect()
    }

    pub fn closes(&self) -> Result<Vec<f64>, FeatureError> {
        self.candles.iter().map(Candle::close_f64).collect()
    }

    pub fn volumes(&self) -> Result<Vec<f64>, FeatureError> {
        self.candles.iter().map(Candle::volume_f64).collect()
    }

    /// First bar dated after `date`.
    pub fn first_after(&self, date: NaiveDate) -> Option<&Candle> {
        let index = self.candles.partition_point(|c| c.date <= date);
        self.candles.get(index)
    }

    /// The bars up to and including `date`.
    pub fn through(&self, date: NaiveDate) -> Self {
        let end = self.candles.partition_point(|c| c.date <= date);
        Self {
            symbol: self.symbol.clone(),
            candles: self.candles[..end].to_vec(),
        }
    }
}
