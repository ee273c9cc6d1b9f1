#![allow(dead_code)]

use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use stockbot::application::feature_engineering_service::TechnicalFeatureEngineeringService;
use stockbot::application::ml::cache_window::CacheWindow;
use stockbot::application::ml::snapshot_builder::SnapshotBuilder;
use stockbot::domain::market::earnings::EarningsEvents;
use stockbot::domain::market::series::{Candle, RawSeries};
use stockbot::domain::ml::feature_registry::ColumnKey;
use stockbot::domain::ml::model_config::ModelConfig;
use stockbot::domain::ml::normalizer::{DegeneratePolicy, ScalerParams};
use stockbot::domain::ml::snapshot::Snapshot;
use stockbot::infrastructure::mock::synthetic_bars;

pub const SYMBOL: &str = "AAPL";

pub fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 2).unwrap()
}

pub fn bars(days: usize) -> Vec<Candle> {
    synthetic_bars(SYMBOL, start(), days, 2024)
}

/// Announcements on a few bar dates so the earnings column is exercised.
pub fn earnings(bars: &[Candle]) -> EarningsEvents {
    let (dates, surprises): (Vec<_>, Vec<_>) = [(5, 0.12), (33, -0.04), (61, 0.31)]
        .into_iter()
        .filter(|(i, _)| *i < bars.len())
        .map(|(i, surprise)| (bars[i].date, surprise))
        .unzip();
    EarningsEvents::from_pairs(&dates, &surprises).unwrap()
}

pub fn every_column() -> Vec<ColumnKey> {
    ColumnKey::all().collect()
}

pub fn model(columns: Vec<ColumnKey>, num_days: usize, end: NaiveDate) -> Arc<ModelConfig> {
    model_from(columns, num_days, start(), end)
}

pub fn model_from(
    columns: Vec<ColumnKey>,
    num_days: usize,
    start: NaiveDate,
    end: NaiveDate,
) -> Arc<ModelConfig> {
    Arc::new(ModelConfig::new(SYMBOL, columns, num_days, start, end).unwrap())
}

pub fn snapshot(bars: &[Candle], events: &EarningsEvents) -> Snapshot {
    let series = RawSeries::new(SYMBOL, bars.to_vec()).unwrap();
    SnapshotBuilder::new()
        .build(&series, Arc::new(events.clone()))
        .unwrap()
}

/// Scaler fitted over the whole history for `columns`.
pub fn scaler(
    bars: &[Candle],
    events: &EarningsEvents,
    columns: &[ColumnKey],
) -> Arc<ScalerParams> {
    let series = RawSeries::new(SYMBOL, bars.to_vec()).unwrap();
    let (matrix, _) = TechnicalFeatureEngineeringService::new(columns)
        .derive(&series, Arc::new(events.clone()))
        .unwrap();
    Arc::new(ScalerParams::fit(&matrix, DegeneratePolicy::Skip).unwrap())
}

fn same(a: f64, b: f64) -> bool {
    a.to_bits() == b.to_bits() || (a.is_nan() && b.is_nan())
}

pub fn assert_windows_identical(left: &CacheWindow, right: &CacheWindow) {
    assert_eq!(left.cursor(), right.cursor());
    assert_eq!(left.columns(), right.columns());
    assert_eq!(left.len(), right.len());
    for (a, b) in left.rows().zip(right.rows()) {
        assert_eq!(a.date, b.date);
        for (i, (x, y)) in a.values.iter().zip(&b.values).enumerate() {
            assert!(
                same(*x, *y),
                "{} differs on {}: {} vs {}",
                left.columns()[i],
                a.date,
                x,
                y
            );
        }
    }
}

static DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

pub fn temp_dir(prefix: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "stockbot-it-{}-{}-{}",
        prefix,
        std::process::id(),
        DIR_COUNTER.fetch_add(1, Ordering::SeqCst)
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
