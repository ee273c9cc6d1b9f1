mod common;

use common::*;
use std::sync::Arc;
use stockbot::application::ml::rolling_cache::{AcquisitionStrategy, RollingCache};
use stockbot::application::ml::sequence_windower::SequenceWindower;
use stockbot::application::ml::snapshot_builder::SnapshotBuilder;
use stockbot::application::ml::sources::OfflineFeatureSource;
use stockbot::domain::market::series::RawSeries;
use stockbot::domain::ml::model_config::ModelPreset;
use stockbot::domain::ml::normalizer::{DegeneratePolicy, ScalerParams};
use stockbot::infrastructure::persistence::{ScalerStore, SnapshotStore};

#[test]
fn test_reloaded_snapshot_and_scaler_give_identical_windows() {
    let dir = temp_dir("round-trip");
    let bars = bars(70);
    let events = earnings(&bars);
    let columns = ModelPreset::Breakout.columns();
    let config = model(columns.clone(), 25, bars[60].date);

    let built = snapshot(&bars, &events);
    let fitted = scaler(&bars, &events, &columns);

    SnapshotStore::for_symbol(&dir, SYMBOL).save(&built).unwrap();
    ScalerStore::for_symbol(&dir, SYMBOL).save(&fitted).unwrap();
    let loaded_snapshot = SnapshotStore::for_symbol(&dir, SYMBOL).load().unwrap();
    let loaded_scaler = ScalerStore::for_symbol(&dir, SYMBOL).load().unwrap().unwrap();
    assert_eq!(loaded_scaler.len(), fitted.len());

    let in_memory = RollingCache::new(
        config.clone(),
        fitted,
        AcquisitionStrategy::single(Arc::new(OfflineFeatureSource::new(Arc::new(built)))),
    );
    let reloaded = RollingCache::new(
        config,
        Arc::new(loaded_scaler),
        AcquisitionStrategy::single(Arc::new(OfflineFeatureSource::new(Arc::new(
            loaded_snapshot,
        )))),
    );

    tokio_test::block_on(async {
        let mut a = in_memory.populate().await.unwrap();
        let mut b = reloaded.populate().await.unwrap();
        assert_windows_identical(&a, &b);

        for _ in 0..5 {
            in_memory.advance_next(&mut a).await.unwrap();
            reloaded.advance_next(&mut b).await.unwrap();
        }
        assert_windows_identical(&a, &b);
    });

    std::fs::remove_dir_all(dir).ok();
}

#[test]
fn test_training_matrix_export_and_sequences() {
    let dir = temp_dir("training");
    let bars = bars(40);
    let series = RawSeries::new(SYMBOL, bars.clone()).unwrap();
    let columns = ModelPreset::Rsi.columns();

    let matrix = SnapshotBuilder::new()
        .derive(&series, Arc::new(earnings(&bars)))
        .unwrap()
        .select(&columns)
        .unwrap();
    let scaler = ScalerParams::fit(&matrix, DegeneratePolicy::Fail).unwrap();
    let scaled = scaler.scale_matrix(&matrix).unwrap();

    let (x, y) = SequenceWindower::new(10).to_arrays(&scaled).unwrap();
    assert_eq!(x.shape(), &[30, 10, 3]);
    assert_eq!(y.len(), 30);
    // targets are the next day's scaled close
    assert_eq!(y[0].to_bits(), scaled.values()[[10, 0]].to_bits());

    let path = dir.join("training.csv");
    scaled
        .write_csv(std::fs::File::create(&path).unwrap())
        .unwrap();
    let mut reader = csv::Reader::from_path(&path).unwrap();
    let header: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(header, vec!["Date", "Close", "RSI", "TRAMA"]);
    assert_eq!(reader.records().count(), 40);

    std::fs::remove_dir_all(dir).ok();
}
