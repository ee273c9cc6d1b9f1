use crate::application::feature_engineering_service::IndicatorCarry;
use crate::application::ml::cache_window::CacheWindow;
use crate::application::ml::sources::{
    AcquisitionMode, AdvanceTarget, DayRow, FeatureSource, Population,
};
use crate::domain::errors::FeatureError;
use crate::domain::ml::feature_matrix::FeatureRow;
use crate::domain::ml::model_config::ModelConfig;
use crate::domain::ml::normalizer::ScalerParams;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Primary source plus an optional single fallback.
#[derive(Clone)]
pub struct AcquisitionStrategy {
    primary: Arc<dyn FeatureSource>,
    fallback: Option<Arc<dyn FeatureSource>>,
}

impl AcquisitionStrategy {
    pub fn single(source: Arc<dyn FeatureSource>) -> Self {
        Self {
            primary: source,
            fallback: None,
        }
    }

    pub fn with_fallback(
        primary: Arc<dyn FeatureSource>,
        fallback: Arc<dyn FeatureSource>,
    ) -> Self {
        Self {
            primary,
            fallback: Some(fallback),
        }
    }
}

/// Builds and advances the feature window of one model configuration.
///
/// Rows from either source are scaled with the same persisted parameters, so
/// online and offline windows are interchangeable. Callers serialize advances
/// on a window; `&mut CacheWindow` enforces a single writer.
pub struct RollingCache {
    config: Arc<ModelConfig>,
    scaler: Arc<ScalerParams>,
    strategy: AcquisitionStrategy,
}

impl RollingCache {
    pub fn new(
        config: Arc<ModelConfig>,
        scaler: Arc<ScalerParams>,
        strategy: AcquisitionStrategy,
    ) -> Self {
        Self {
            config,
            scaler,
            strategy,
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Builds the window ending on the configured end date.
    pub async fn populate(&self) -> Result<CacheWindow, FeatureError> {
        self.populate_at(self.config.end_date()).await
    }

    pub async fn populate_at(&self, end: NaiveDate) -> Result<CacheWindow, FeatureError> {
        let symbol = self.config.stock_symbol();
        let primary = &self.strategy.primary;

        let (population, mode) = match primary.populate(&self.config, end).await {
            Ok(population) => (population, primary.mode()),
            Err(err) if err.is_retryable() => match &self.strategy.fallback {
                Some(fallback) => {
                    warn!(
                        "{} population of {} through {} failed ({}), trying {}",
                        primary.mode(),
                        symbol,
                        end,
                        err,
                        fallback.mode()
                    );
                    match fallback.populate(&self.config, end).await {
                        Ok(population) => (population, fallback.mode()),
                        Err(fallback_err) => {
                            return Err(FeatureError::Exhausted {
                                online: Box::new(err),
                                offline: Box::new(fallback_err),
                            });
                        }
                    }
                }
                None => return Err(err),
            },
            Err(err) => return Err(err),
        };

        let window = self.assemble(population, mode)?;
        info!(
            "Populated {} window for {}: {} rows through {}",
            mode,
            symbol,
            window.len(),
            window.cursor()
        );
        Ok(window)
    }

    fn assemble(
        &self,
        population: Population,
        mode: AcquisitionMode,
    ) -> Result<CacheWindow, FeatureError> {
        if population.rows.is_empty() {
            return Err(FeatureError::Unknown {
                reason: format!("{} population returned no rows", mode),
            });
        }
        let rows = population
            .rows
            .iter()
            .map(|row| self.scale(row))
            .collect::<Result<Vec<_>, _>>()?;

        CacheWindow::new(
            self.config.columns().to_vec(),
            self.config.num_days(),
            rows,
            population.carry,
            mode,
        )
    }

    fn scale(&self, row: &FeatureRow) -> Result<FeatureRow, FeatureError> {
        self.scaler.scale_row(self.config.columns(), row)
    }

    /// Advances `window` by one session to `date`, which must be the first
    /// session after the cursor. On error the window is left exactly as it was.
    pub async fn advance(
        &self,
        window: &mut CacheWindow,
        date: NaiveDate,
    ) -> Result<AcquisitionMode, FeatureError> {
        if date <= window.cursor() {
            return Err(FeatureError::InvalidAdvance {
                cursor: window.cursor(),
                date,
            });
        }
        self.step(window, AdvanceTarget::On(date)).await
    }

    /// Advances `window` to the next session the source has after the cursor.
    pub async fn advance_next(
        &self,
        window: &mut CacheWindow,
    ) -> Result<AcquisitionMode, FeatureError> {
        self.step(window, AdvanceTarget::NextSession).await
    }

    async fn step(
        &self,
        window: &mut CacheWindow,
        target: AdvanceTarget,
    ) -> Result<AcquisitionMode, FeatureError> {
        let cursor = window.cursor();
        let (day, mode) = self.acquire(window.carry(), cursor, target).await?;
        let row = self.scale(&day.row)?;
        if row.date <= cursor {
            return Err(FeatureError::Unknown {
                reason: format!("{} source returned {} after {}", mode, row.date, cursor),
            });
        }

        window.commit(row, day.carry, mode);
        debug!(
            "Advanced {} window to {} ({})",
            self.config.stock_symbol(),
            window.cursor(),
            mode
        );
        Ok(mode)
    }

    async fn acquire(
        &self,
        carry: Option<&IndicatorCarry>,
        cursor: NaiveDate,
        target: AdvanceTarget,
    ) -> Result<(DayRow, AcquisitionMode), FeatureError> {
        let primary = &self.strategy.primary;
        let err = match primary.next_row(&self.config, carry, cursor, target).await {
            Ok(day) => return Ok((day, primary.mode())),
            Err(err) => err,
        };

        let fallback = match &self.strategy.fallback {
            Some(fallback) if err.is_retryable() => fallback,
            _ => return Err(err),
        };

        warn!(
            "{} advance of {} past {} failed ({}), trying {}",
            primary.mode(),
            self.config.stock_symbol(),
            cursor,
            err,
            fallback.mode()
        );

        // the fallback row is not derived from the primary carry, so the carry
        // no longer matches the window and is dropped
        match fallback.next_row(&self.config, None, cursor, target).await {
            Ok(day) => Ok((DayRow { carry: None, ..day }, fallback.mode())),
            Err(fallback_err) => Err(FeatureError::Exhausted {
                online: Box::new(err),
                offline: Box::new(fallback_err),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ml::snapshot_builder::SnapshotBuilder;
    use crate::application::ml::sources::{OfflineFeatureSource, OnlineFeatureSource};
    use crate::domain::market::earnings::EarningsEvents;
    use crate::domain::market::series::RawSeries;
    use crate::domain::ml::feature_registry::ColumnKey;
    use crate::domain::ml::normalizer::ColumnScale;
    use crate::infrastructure::mock::{MockMarketDataService, synthetic_bars};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn scaler() -> Arc<ScalerParams> {
        let mut params = ScalerParams::new();
        params.insert("Close", ColumnScale::new(50.0, 100.0));
        params.insert("Momentum", ColumnScale::new(-20.0, 40.0));
        Arc::new(params)
    }

    struct Fixture {
        bars: Vec<crate::domain::market::series::Candle>,
        market: Arc<MockMarketDataService>,
        config: Arc<ModelConfig>,
    }

    fn fixture() -> Fixture {
        let bars = synthetic_bars("AAPL", d(2023, 1, 2), 30, 11);
        let market = Arc::new(MockMarketDataService::new(bars.clone()));
        let config = Arc::new(
            ModelConfig::new(
                "AAPL",
                vec![ColumnKey::Close, ColumnKey::Momentum],
                10,
                d(2023, 1, 2),
                bars[20].date,
            )
            .unwrap(),
        );
        Fixture {
            bars,
            market,
            config,
        }
    }

    #[tokio::test]
    async fn test_advance_rejects_stale_date() {
        let fx = fixture();
        let cache = RollingCache::new(
            fx.config.clone(),
            scaler(),
            AcquisitionStrategy::single(Arc::new(OnlineFeatureSource::new(fx.market.clone()))),
        );
        let mut window = cache.populate().await.unwrap();
        let cursor = window.cursor();

        let err = cache.advance(&mut window, cursor).await.unwrap_err();
        assert!(matches!(err, FeatureError::InvalidAdvance { .. }));
        assert_eq!(window.cursor(), cursor);
    }

    #[tokio::test]
    async fn test_online_failure_without_fallback_leaves_window() {
        let fx = fixture();
        let cache = RollingCache::new(
            fx.config.clone(),
            scaler(),
            AcquisitionStrategy::single(Arc::new(OnlineFeatureSource::new(fx.market.clone()))),
        );
        let mut window = cache.populate().await.unwrap();
        let before: Vec<FeatureRow> = window.rows().cloned().collect();

        fx.market.set_offline(true);
        let err = cache.advance_next(&mut window).await.unwrap_err();
        assert!(matches!(err, FeatureError::DataUnavailable { .. }));

        let after: Vec<FeatureRow> = window.rows().cloned().collect();
        assert_eq!(before, after);
        assert!(window.carry().is_some());
    }

    #[tokio::test]
    async fn test_both_modes_failing_is_exhausted() {
        let fx = fixture();
        let series = RawSeries::new("AAPL", fx.bars[..21].to_vec()).unwrap();
        let snapshot = SnapshotBuilder::new()
            .build(&series, Arc::new(EarningsEvents::empty()))
            .unwrap();
        let cache = RollingCache::new(
            fx.config.clone(),
            scaler(),
            AcquisitionStrategy::with_fallback(
                Arc::new(OnlineFeatureSource::new(fx.market.clone())),
                Arc::new(OfflineFeatureSource::new(Arc::new(snapshot))),
            ),
        );
        let mut window = cache.populate().await.unwrap();
        let cursor = window.cursor();

        fx.market.set_offline(true);
        let err = cache.advance_next(&mut window).await.unwrap_err();
        match err {
            FeatureError::Exhausted { online, offline } => {
                assert!(matches!(*online, FeatureError::DataUnavailable { .. }));
                assert!(matches!(*offline, FeatureError::OutOfRange { .. }));
            }
            other => panic!("expected Exhausted, got {other}"),
        }
        assert_eq!(window.cursor(), cursor);
    }

    #[tokio::test]
    async fn test_missing_scaler_fails_population() {
        let fx = fixture();
        let mut params = ScalerParams::new();
        params.insert("Close", ColumnScale::new(50.0, 100.0));
        let cache = RollingCache::new(
            fx.config.clone(),
            Arc::new(params),
            AcquisitionStrategy::single(Arc::new(OnlineFeatureSource::new(fx.market.clone()))),
        );

        let err = cache.populate().await.unwrap_err();
        assert!(matches!(err, FeatureError::MissingScaler { column } if column == "Momentum"));
    }

    #[tokio::test]
    async fn test_advance_past_next_session_is_rejected() {
        let fx = fixture();
        let cache = RollingCache::new(
            fx.config.clone(),
            scaler(),
            AcquisitionStrategy::single(Arc::new(OnlineFeatureSource::new(fx.market.clone()))),
        );
        let mut window = cache.populate().await.unwrap();
        let before: Vec<FeatureRow> = window.rows().cloned().collect();

        let err = cache.advance(&mut window, fx.bars[22].date).await.unwrap_err();
        assert!(matches!(
            err,
            FeatureError::InvalidAdvance { date, .. } if date == fx.bars[22].date
        ));
        assert_eq!(window.rows().cloned().collect::<Vec<_>>(), before);
        assert_eq!(window.carry().and_then(|c| c.last_date()), Some(fx.bars[20].date));

        cache.advance(&mut window, fx.bars[21].date).await.unwrap();
        cache.advance(&mut window, fx.bars[22].date).await.unwrap();
        assert_eq!(window.cursor(), fx.bars[22].date);
    }

    #[tokio::test]
    async fn test_advance_next_skips_weekend() {
        let fx = fixture();
        let cache = RollingCache::new(
            fx.config.clone(),
            scaler(),
            AcquisitionStrategy::single(Arc::new(OnlineFeatureSource::new(fx.market.clone()))),
        );
        let mut window = cache.populate().await.unwrap();

        for _ in 0..5 {
            let mode = cache.advance_next(&mut window).await.unwrap();
            assert_eq!(mode, AcquisitionMode::Online);
        }
        assert_eq!(window.cursor(), fx.bars[25].date);
        assert_eq!(window.len(), 10);
    }
}
