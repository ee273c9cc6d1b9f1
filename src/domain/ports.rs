use crate::domain::errors::{FeatureError, MarketDataError};
use crate::domain::market::earnings::EarningsEvents;
use crate::domain::market::series::Candle;
use crate::domain::ml::feature_matrix::FeatureRow;
use crate::domain::ml::feature_registry::ColumnKey;
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Online data source of daily bars.
#[async_trait]
pub trait MarketDataService: Send + Sync {
    /// Bars for `[start, end]` inclusive, chronologically ordered.
    async fn get_daily_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> std::result::Result<Vec<Candle>, MarketDataError>;
}

#[async_trait]
pub trait EarningsCalendar: Send + Sync {
    async fn earnings_history(&self, symbol: &str) -> Result<EarningsEvents>;
}

/// Pre-computed, unscaled feature rows indexed by date.
pub trait SnapshotSource: Send + Sync {
    fn symbol(&self) -> &str;

    /// Index of `date`, or `OutOfRange` when the date is absent.
    fn position(&self, date: NaiveDate) -> std::result::Result<usize, FeatureError>;

    /// Index of the first row dated on or after `date`.
    fn seek(&self, date: NaiveDate) -> Option<usize>;

    fn row_at(
        &self,
        index: usize,
        columns: &[ColumnKey],
    ) -> std::result::Result<FeatureRow, FeatureError>;

    fn row(
        &self,
        date: NaiveDate,
        columns: &[ColumnKey],
    ) -> std::result::Result<FeatureRow, FeatureError> {
        let index = self.position(date)?;
        self.row_at(index, columns)
    }
}

/// Stateful per-bar feature derivation.
pub trait FeatureEngineeringService: Send + Sync {
    fn update(&mut self, candle: &Candle) -> std::result::Result<FeatureRow, FeatureError>;
}
