use super::write_atomic;
use crate::domain::ml::snapshot::Snapshot;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const SNAPSHOT_FILE: &str = "info.json";

/// On-disk layout: `{"symbol": .., "Dates": [..], "<column>": [..], ..}`.
/// Non-finite values are stored as `null`.
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile {
    symbol: String,
    #[serde(rename = "Dates")]
    dates: Vec<NaiveDate>,
    #[serde(flatten)]
    columns: BTreeMap<String, Vec<Option<f64>>>,
}

impl From<&Snapshot> for SnapshotFile {
    fn from(snapshot: &Snapshot) -> Self {
        let columns = snapshot
            .columns()
            .iter()
            .map(|(name, values)| {
                let stored = values
                    .iter()
                    .map(|v| if v.is_finite() { Some(*v) } else { None })
                    .collect();
                (name.clone(), stored)
            })
            .collect();

        Self {
            symbol: snapshot.symbol().to_string(),
            dates: snapshot.dates().to_vec(),
            columns,
        }
    }
}

impl SnapshotFile {
    fn into_snapshot(self) -> Result<Snapshot> {
        let columns = self
            .columns
            .into_iter()
            .map(|(name, values)| {
                let restored = values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect();
                (name, restored)
            })
            .collect();
        Ok(Snapshot::new(self.symbol, self.dates, columns)?)
    }
}

/// JSON persistence of a feature snapshot.
pub struct SnapshotStore {
    file_path: PathBuf,
}

impl SnapshotStore {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }

    /// `<data_dir>/<SYMBOL>/info.json`
    pub fn for_symbol(data_dir: impl AsRef<Path>, symbol: &str) -> Self {
        Self::new(data_dir.as_ref().join(symbol).join(SNAPSHOT_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    pub fn exists(&self) -> bool {
        self.file_path.exists()
    }

    pub fn load(&self) -> Result<Snapshot> {
        let content = fs::read_to_string(&self.file_path)
            .with_context(|| format!("Failed to read snapshot file {:?}", self.file_path))?;
        let file: SnapshotFile =
            serde_json::from_str(&content).context("Failed to parse snapshot JSON")?;
        let snapshot = file
            .into_snapshot()
            .with_context(|| format!("Invalid snapshot in {:?}", self.file_path))?;

        info!(
            "Loaded snapshot of {} ({} rows, {} columns) from {:?}",
            snapshot.symbol(),
            snapshot.len(),
            snapshot.columns().len(),
            self.file_path
        );
        Ok(snapshot)
    }

    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let content = serde_json::to_string(&SnapshotFile::from(snapshot))
            .context("Failed to serialize snapshot")?;
        write_atomic(&self.file_path, &content)?;

        info!(
            "Saved snapshot of {} ({} rows) to {:?}",
            snapshot.symbol(),
            snapshot.len(),
            self.file_path
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::SnapshotSource;
    use crate::infrastructure::persistence::test_support::temp_dir;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 6, day).unwrap()
    }

    #[test]
    fn test_round_trip_is_bitwise_and_keeps_nan() {
        let dir = temp_dir("snapshot");
        let mut columns = BTreeMap::new();
        columns.insert("Close".to_string(), vec![179.58, 180.0 / 7.0, 0.1 + 0.2]);
        columns.insert("RSI".to_string(), vec![f64::NAN, 100.0, 33.333333333333336]);
        let snapshot = Snapshot::new("AAPL", vec![d(5), d(6), d(7)], columns).unwrap();

        let store = SnapshotStore::for_symbol(&dir, "AAPL");
        store.save(&snapshot).unwrap();
        let loaded = store.load().unwrap();

        assert_eq!(loaded.symbol(), "AAPL");
        assert_eq!(loaded.dates(), snapshot.dates());
        for (name, values) in snapshot.columns() {
            let reloaded = loaded.column(name).unwrap();
            for (a, b) in values.iter().zip(reloaded) {
                assert!(a.to_bits() == b.to_bits() || (a.is_nan() && b.is_nan()));
            }
        }
        assert!(loaded.column("RSI").unwrap()[0].is_nan());
        assert_eq!(loaded.position(d(6)).unwrap(), 1);

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_file_layout_uses_dates_key() {
        let dir = temp_dir("snapshot-layout");
        let mut columns = BTreeMap::new();
        columns.insert("Close".to_string(), vec![1.5]);
        let snapshot = Snapshot::new("AAPL", vec![d(5)], columns).unwrap();

        let store = SnapshotStore::for_symbol(&dir, "AAPL");
        store.save(&snapshot).unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();

        assert_eq!(raw["Dates"][0], "2023-06-05");
        assert_eq!(raw["Close"][0], 1.5);
        assert!(!store.path().with_extension("tmp").exists());

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = temp_dir("snapshot-missing");
        let store = SnapshotStore::for_symbol(&dir, "MSFT");
        assert!(!store.exists());
        assert!(store.load().is_err());
        std::fs::remove_dir_all(dir).ok();
    }
}
