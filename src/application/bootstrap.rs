use crate::application::ml::rolling_cache::{AcquisitionStrategy, RollingCache};
use crate::application::ml::sources::{FeatureSource, OfflineFeatureSource, OnlineFeatureSource};
use crate::config::{AcquisitionPolicy, Config};
use crate::domain::ports::{EarningsCalendar, MarketDataService};
use crate::infrastructure::alpaca::AlpacaDailyBarService;
use crate::infrastructure::earnings_calendar::JsonEarningsCalendar;
use crate::infrastructure::persistence::{ScalerStore, SnapshotStore};
use anyhow::{Context, Result, anyhow};
use std::sync::Arc;
use tracing::info;

/// Wires a rolling cache against the Alpaca daily bar service.
pub fn build_rolling_cache(config: &Config) -> Result<RollingCache> {
    let market: Arc<dyn MarketDataService> =
        Arc::new(AlpacaDailyBarService::new(&config.alpaca, &config.http));
    build_rolling_cache_with(config, market)
}

/// Wires a rolling cache from configuration and persisted files.
///
/// The snapshot is only loaded when the acquisition policy reads from it.
pub fn build_rolling_cache_with(
    config: &Config,
    market: Arc<dyn MarketDataService>,
) -> Result<RollingCache> {
    let model = Arc::new(config.model_config()?);
    let symbol = model.stock_symbol().to_string();

    let scaler_store = ScalerStore::for_symbol(&config.data_dir, &symbol);
    let scaler = scaler_store.load()?.ok_or_else(|| {
        anyhow!(
            "No scaler parameters at {:?}; run build_snapshot first",
            scaler_store.path()
        )
    })?;

    let online = || -> Arc<dyn FeatureSource> {
        let calendar: Arc<dyn EarningsCalendar> =
            Arc::new(JsonEarningsCalendar::new(config.data_dir.clone()));
        Arc::new(OnlineFeatureSource::new(market.clone()).with_earnings(calendar))
    };
    let offline = || -> Result<Arc<dyn FeatureSource>> {
        let snapshot = SnapshotStore::for_symbol(&config.data_dir, &symbol)
            .load()
            .context("Failed to load snapshot for offline acquisition")?;
        Ok(Arc::new(OfflineFeatureSource::new(Arc::new(snapshot))))
    };

    let strategy = match config.feature.acquisition {
        AcquisitionPolicy::Online => AcquisitionStrategy::single(online()),
        AcquisitionPolicy::Offline => AcquisitionStrategy::single(offline()?),
        AcquisitionPolicy::OnlineWithFallback => {
            AcquisitionStrategy::with_fallback(online(), offline()?)
        }
    };

    info!(
        "Rolling cache for {} ({} columns, {} days, {:?})",
        symbol,
        model.columns().len(),
        model.num_days(),
        config.feature.acquisition
    );
    Ok(RollingCache::new(model, Arc::new(scaler), strategy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ml::snapshot_builder::SnapshotBuilder;
    use crate::application::ml::sources::AcquisitionMode;
    use crate::config::{AlpacaConfig, FeatureEnvConfig, HttpSettings};
    use crate::domain::market::earnings::EarningsEvents;
    use crate::domain::market::series::RawSeries;
    use crate::domain::ml::model_config::ModelPreset;
    use crate::domain::ml::normalizer::{DegeneratePolicy, ScalerParams};
    use crate::infrastructure::mock::{MockMarketDataService, synthetic_bars};
    use crate::infrastructure::persistence::test_support::temp_dir;
    use chrono::NaiveDate;
    use std::path::PathBuf;

    fn config(data_dir: PathBuf, acquisition: AcquisitionPolicy, end: NaiveDate) -> Config {
        Config {
            feature: FeatureEnvConfig {
                stock_symbol: "AAPL".to_string(),
                preset: ModelPreset::Rsi,
                information_keys: None,
                num_days: 10,
                start_date: NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(),
                end_date: end,
                acquisition,
                degenerate_policy: DegeneratePolicy::Fail,
            },
            data_dir,
            alpaca: AlpacaConfig::default(),
            http: HttpSettings::default(),
        }
    }

    #[tokio::test]
    async fn test_offline_and_fallback_wiring() {
        let dir = temp_dir("bootstrap");
        let bars = synthetic_bars("AAPL", NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(), 40, 7);
        let end = bars[29].date;
        let series = RawSeries::new("AAPL", bars.clone()).unwrap();

        let builder = SnapshotBuilder::new();
        let matrix = builder.derive(&series, Arc::new(EarningsEvents::empty())).unwrap();
        SnapshotStore::for_symbol(&dir, "AAPL")
            .save(&builder.build(&series, Arc::new(EarningsEvents::empty())).unwrap())
            .unwrap();
        let selected = matrix.select(&ModelPreset::Rsi.columns()).unwrap();
        let scaler = ScalerParams::fit(&selected, DegeneratePolicy::Skip).unwrap();
        ScalerStore::for_symbol(&dir, "AAPL").save(&scaler).unwrap();

        let market = MockMarketDataService::new(bars);
        market.set_offline(true);

        let offline = build_rolling_cache_with(
            &config(dir.clone(), AcquisitionPolicy::Offline, end),
            Arc::new(market.clone()),
        )
        .unwrap();
        let window = offline.populate().await.unwrap();
        assert_eq!(window.cursor(), end);
        assert_eq!(window.last_mode(), AcquisitionMode::Offline);

        let fallback = build_rolling_cache_with(
            &config(dir.clone(), AcquisitionPolicy::OnlineWithFallback, end),
            Arc::new(market),
        )
        .unwrap();
        let window = fallback.populate().await.unwrap();
        assert_eq!(window.last_mode(), AcquisitionMode::Offline);
        assert_eq!(window.len(), 10);

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_missing_scaler_is_reported() {
        let dir = temp_dir("bootstrap-missing");
        let end = NaiveDate::from_ymd_opt(2023, 2, 1).unwrap();
        let market = Arc::new(MockMarketDataService::new(Vec::new()));

        let config = config(dir.clone(), AcquisitionPolicy::Online, end);
        let err = build_rolling_cache_with(&config, market).err().unwrap();
        assert!(err.to_string().contains("build_snapshot"));

        std::fs::remove_dir_all(dir).ok();
    }
}
