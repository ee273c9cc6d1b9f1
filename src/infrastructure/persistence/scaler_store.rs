use super::write_atomic;
use crate::domain::ml::normalizer::ScalerParams;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const SCALER_FILE: &str = "min_max_data.json";

/// JSON persistence of per-column scaling parameters.
pub struct ScalerStore {
    file_path: PathBuf,
}

impl ScalerStore {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }

    /// `<data_dir>/<SYMBOL>/min_max_data.json`
    pub fn for_symbol(data_dir: impl AsRef<Path>, symbol: &str) -> Self {
        Self::new(data_dir.as_ref().join(symbol).join(SCALER_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// `None` when nothing has been saved yet.
    pub fn load(&self) -> Result<Option<ScalerParams>> {
        if !self.file_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.file_path)
            .with_context(|| format!("Failed to read scaler file {:?}", self.file_path))?;
        let params: ScalerParams =
            serde_json::from_str(&content).context("Failed to parse scaler JSON")?;

        info!(
            "Loaded {} scaler entries from {:?}",
            params.len(),
            self.file_path
        );
        Ok(Some(params))
    }

    /// Merges `params` into the stored file, keeping other columns.
    pub fn save(&self, params: &ScalerParams) -> Result<ScalerParams> {
        let mut merged = self.load()?.unwrap_or_default();
        merged.merge(params);

        let content =
            serde_json::to_string_pretty(&merged).context("Failed to serialize scaler params")?;
        write_atomic(&self.file_path, &content)?;

        info!(
            "Saved {} scaler entries to {:?}",
            merged.len(),
            self.file_path
        );
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ml::normalizer::ColumnScale;
    use crate::infrastructure::persistence::test_support::temp_dir;

    #[test]
    fn test_round_trip_is_bitwise() {
        let dir = temp_dir("scaler");
        let store = ScalerStore::for_symbol(&dir, "AAPL");
        let mut params = ScalerParams::new();
        params.insert(
            "Close",
            ColumnScale {
                min: 0.1 + 0.2,
                range: 1.0 / 3.0,
            },
        );

        assert!(store.load().unwrap().is_none());
        store.save(&params).unwrap();
        let loaded = store.load().unwrap().unwrap();

        let a = params.get("Close").unwrap();
        let b = loaded.get("Close").unwrap();
        assert_eq!(a.min.to_bits(), b.min.to_bits());
        assert_eq!(a.range.to_bits(), b.range.to_bits());

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_save_merges_with_existing_columns() {
        let dir = temp_dir("scaler-merge");
        let store = ScalerStore::for_symbol(&dir, "AAPL");

        let mut first = ScalerParams::new();
        first.insert("Close", ColumnScale::new(10.0, 10.0));
        first.insert("RSI", ColumnScale::new(0.0, 100.0));
        store.save(&first).unwrap();

        let mut second = ScalerParams::new();
        second.insert("Close", ColumnScale::new(20.0, 5.0));
        second.mark_passthrough("Above Bollinger");
        store.save(&second).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.get("Close").unwrap().min, 20.0);
        assert_eq!(loaded.get("RSI").unwrap().range, 100.0);
        assert!(loaded.is_passthrough("Above Bollinger"));

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_loads_legacy_diff_key() {
        let dir = temp_dir("scaler-legacy");
        let store = ScalerStore::for_symbol(&dir, "AAPL");
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), r#"{"Close": {"min": 10.0, "diff": 10.0}}"#).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.get("Close").unwrap().range, 10.0);

        std::fs::remove_dir_all(dir).ok();
    }
}
