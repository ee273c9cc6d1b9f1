pub mod scaler_store;
pub mod snapshot_store;

pub use scaler_store::ScalerStore;
pub use snapshot_store::SnapshotStore;

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Writes `content` next to `path` then renames it into place.
pub(crate) fn write_atomic(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {:?}", parent))?;
    }

    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, content)
        .with_context(|| format!("Failed to write temp file {:?}", temp_path))?;
    fs::rename(&temp_path, path).with_context(|| format!("Failed to rename {:?}", temp_path))?;
    Ok(())
}
