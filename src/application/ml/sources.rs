use crate::application::feature_engineering_service::{
    IndicatorCarry, TechnicalFeatureEngineeringService,
};
use crate::domain::errors::FeatureError;
use crate::domain::market::earnings::EarningsEvents;
use crate::domain::market::series::RawSeries;
use crate::domain::market::trading_day::next_trading_day;
use crate::domain::ml::feature_matrix::FeatureRow;
use crate::domain::ml::model_config::ModelConfig;
use crate::domain::ports::{
    EarningsCalendar, FeatureEngineeringService, MarketDataService, SnapshotSource,
};
use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Calendar days an advance looks past the cursor for the next session.
pub const SESSION_LOOKAHEAD_DAYS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionMode {
    Online,
    Offline,
}

impl fmt::Display for AcquisitionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquisitionMode::Online => write!(f, "online"),
            AcquisitionMode::Offline => write!(f, "offline"),
        }
    }
}

/// The session an advance moves a window to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceTarget {
    /// This date, which must be the first session after the cursor.
    On(NaiveDate),
    /// Whichever session comes first after the cursor.
    NextSession,
}

impl AdvanceTarget {
    /// Last date a source looks at.
    fn horizon(self, cursor: NaiveDate) -> NaiveDate {
        match self {
            AdvanceTarget::On(date) => date,
            AdvanceTarget::NextSession => cursor
                .checked_add_days(Days::new(SESSION_LOOKAHEAD_DAYS))
                .unwrap_or(NaiveDate::MAX),
        }
    }

    /// Date reported when no session is found.
    fn expected(self, cursor: NaiveDate) -> NaiveDate {
        match self {
            AdvanceTarget::On(date) => date,
            AdvanceTarget::NextSession => next_trading_day(cursor),
        }
    }

    /// `session` is the first one after `cursor`; a target past it would skip it.
    fn accept(self, cursor: NaiveDate, session: NaiveDate) -> Result<(), FeatureError> {
        match self {
            AdvanceTarget::On(date) if date != session => {
                Err(FeatureError::InvalidAdvance { cursor, date })
            }
            _ => Ok(()),
        }
    }
}

/// Unscaled rows of a full population, oldest first.
#[derive(Debug, Clone)]
pub struct Population {
    pub rows: Vec<FeatureRow>,
    pub carry: Option<IndicatorCarry>,
}

/// Unscaled row of a single-day advance.
#[derive(Debug, Clone)]
pub struct DayRow {
    pub row: FeatureRow,
    pub carry: Option<IndicatorCarry>,
}

/// One way of acquiring feature rows for a model configuration.
#[async_trait]
pub trait FeatureSource: Send + Sync {
    fn mode(&self) -> AcquisitionMode;

    /// The trailing `num_days` rows ending on `end`.
    async fn populate(
        &self,
        config: &ModelConfig,
        end: NaiveDate,
    ) -> Result<Population, FeatureError>;

    /// The row of the first session after `cursor`, which must match `target`.
    /// `carry` is the indicator state at the cursor, when the window has one.
    async fn next_row(
        &self,
        config: &ModelConfig,
        carry: Option<&IndicatorCarry>,
        cursor: NaiveDate,
        target: AdvanceTarget,
    ) -> Result<DayRow, FeatureError>;
}

/// Derives rows from bars fetched from a market data service.
pub struct OnlineFeatureSource {
    market: Arc<dyn MarketDataService>,
    earnings: Option<Arc<dyn EarningsCalendar>>,
}

impl OnlineFeatureSource {
    pub fn new(market: Arc<dyn MarketDataService>) -> Self {
        Self {
            market,
            earnings: None,
        }
    }

    pub fn with_earnings(mut self, calendar: Arc<dyn EarningsCalendar>) -> Self {
        self.earnings = Some(calendar);
        self
    }

    async fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RawSeries, FeatureError> {
        let candles = self
            .market
            .get_daily_bars(symbol, start, end)
            .await
            .map_err(|e| e.into_unavailable(symbol))?;
        RawSeries::new(symbol, candles)
    }

    async fn load_earnings(
        &self,
        config: &ModelConfig,
    ) -> Result<Arc<EarningsEvents>, FeatureError> {
        if !config.needs_earnings() {
            return Ok(Arc::new(EarningsEvents::empty()));
        }
        let symbol = config.stock_symbol();
        match &self.earnings {
            Some(calendar) => calendar
                .earnings_history(symbol)
                .await
                .map(Arc::new)
                .map_err(|e| FeatureError::DataUnavailable {
                    symbol: symbol.to_string(),
                    reason: format!("earnings history: {:#}", e),
                }),
            None => Err(FeatureError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: "no earnings calendar configured".to_string(),
            }),
        }
    }

    /// Derives every row of an anchored history.
    async fn derive(
        &self,
        config: &ModelConfig,
        series: &RawSeries,
    ) -> Result<(Vec<FeatureRow>, IndicatorCarry), FeatureError> {
        let earnings = self.load_earnings(config).await?;
        let service = TechnicalFeatureEngineeringService::new(config.columns());
        let (matrix, carry) = service.derive(series, earnings)?;
        debug!(
            "Derived {} rows for {} from {:?} to {:?}",
            matrix.nrows(),
            series.symbol(),
            series.first_date(),
            series.last_date()
        );
        Ok((matrix.rows().collect(), carry))
    }

    fn no_session(symbol: &str, cursor: NaiveDate, target: AdvanceTarget) -> FeatureError {
        FeatureError::DataUnavailable {
            symbol: symbol.to_string(),
            reason: format!("no bar after {} for {}", cursor, target.expected(cursor)),
        }
    }
}

#[async_trait]
impl FeatureSource for OnlineFeatureSource {
    fn mode(&self) -> AcquisitionMode {
        AcquisitionMode::Online
    }

    async fn populate(
        &self,
        config: &ModelConfig,
        end: NaiveDate,
    ) -> Result<Population, FeatureError> {
        let symbol = config.stock_symbol();
        let series = self.fetch(symbol, config.start_date(), end).await?;
        if series.last_date() != Some(end) {
            return Err(FeatureError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: format!("no bar for {}", end),
            });
        }

        let (mut rows, carry) = self.derive(config, &series).await?;
        let keep = rows.len().saturating_sub(config.num_days());
        rows.drain(..keep);
        Ok(Population {
            rows,
            carry: Some(carry),
        })
    }

    async fn next_row(
        &self,
        config: &ModelConfig,
        carry: Option<&IndicatorCarry>,
        cursor: NaiveDate,
        target: AdvanceTarget,
    ) -> Result<DayRow, FeatureError> {
        let symbol = config.stock_symbol();
        let horizon = target.horizon(cursor);

        let Some(carry) = carry else {
            info!(
                "No indicator carry for {}, re-deriving from {}",
                symbol,
                config.start_date()
            );
            let series = self.fetch(symbol, config.start_date(), horizon).await?;
            let session = series
                .first_after(cursor)
                .map(|c| c.date)
                .ok_or_else(|| Self::no_session(symbol, cursor, target))?;
            target.accept(cursor, session)?;

            let (mut rows, carry) = self.derive(config, &series.through(session)).await?;
            let row = rows.pop().ok_or_else(|| FeatureError::Unknown {
                reason: format!("derivation through {} produced no rows", session),
            })?;
            return Ok(DayRow {
                row,
                carry: Some(carry),
            });
        };

        let from = cursor.succ_opt().unwrap_or(cursor);
        let series = self.fetch(symbol, from, horizon).await?;
        let candle = series
            .first_after(cursor)
            .ok_or_else(|| Self::no_session(symbol, cursor, target))?;
        target.accept(cursor, candle.date)?;

        let mut next = carry.clone();
        let row = next.update(candle)?;
        Ok(DayRow {
            row,
            carry: Some(next),
        })
    }
}

/// Reads pre-computed rows from a snapshot.
pub struct OfflineFeatureSource {
    snapshot: Arc<dyn SnapshotSource>,
}

impl OfflineFeatureSource {
    pub fn new(snapshot: Arc<dyn SnapshotSource>) -> Self {
        Self { snapshot }
    }
}

#[async_trait]
impl FeatureSource for OfflineFeatureSource {
    fn mode(&self) -> AcquisitionMode {
        AcquisitionMode::Offline
    }

    /// The snapshot must be anchored where online derivation would be: its
    /// first row is the first session on or after the configured start date.
    async fn populate(
        &self,
        config: &ModelConfig,
        end: NaiveDate,
    ) -> Result<Population, FeatureError> {
        let start = config.start_date();
        let first = self
            .snapshot
            .seek(start)
            .ok_or(FeatureError::OutOfRange { date: start })?;
        if first != 0 {
            let anchor = self.snapshot.row_at(0, &[])?.date;
            return Err(FeatureError::InvalidConfig {
                reason: format!(
                    "snapshot of {} is anchored on {}, before start date {}",
                    self.snapshot.symbol(),
                    anchor,
                    start
                ),
            });
        }

        let last = self.snapshot.position(end)?;
        let begin = (last + 1).saturating_sub(config.num_days());
        let rows = (begin..=last)
            .map(|i| self.snapshot.row_at(i, config.columns()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Population { rows, carry: None })
    }

    async fn next_row(
        &self,
        config: &ModelConfig,
        _carry: Option<&IndicatorCarry>,
        cursor: NaiveDate,
        target: AdvanceTarget,
    ) -> Result<DayRow, FeatureError> {
        if let AdvanceTarget::On(date) = target {
            self.snapshot.position(date)?;
        }

        let missing = || FeatureError::OutOfRange {
            date: target.expected(cursor),
        };
        let index = cursor
            .succ_opt()
            .and_then(|next| self.snapshot.seek(next))
            .ok_or_else(missing)?;
        let row = self.snapshot.row_at(index, config.columns())?;
        if row.date > target.horizon(cursor) {
            return Err(missing());
        }
        target.accept(cursor, row.date)?;

        Ok(DayRow { row, carry: None })
    }
}
