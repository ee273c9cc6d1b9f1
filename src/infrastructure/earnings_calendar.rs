use crate::domain::market::earnings::EarningsEvents;
use crate::domain::ports::EarningsCalendar;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;

pub const EARNINGS_FILE: &str = "earnings.json";

#[derive(Debug, Deserialize)]
struct EarningsFile {
    dates: Vec<NaiveDate>,
    surprises: Vec<f64>,
}

/// Reads `<data_dir>/<SYMBOL>/earnings.json`.
pub struct JsonEarningsCalendar {
    data_dir: PathBuf,
}

impl JsonEarningsCalendar {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.data_dir.join(symbol).join(EARNINGS_FILE)
    }

    fn load(path: &Path) -> Result<EarningsEvents> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read earnings file {:?}", path))?;
        let file: EarningsFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse earnings JSON {:?}", path))?;
        let events = EarningsEvents::from_pairs(&file.dates, &file.surprises)
            .with_context(|| format!("Invalid earnings history in {:?}", path))?;
        Ok(events)
    }
}

#[async_trait]
impl EarningsCalendar for JsonEarningsCalendar {
    async fn earnings_history(&self, symbol: &str) -> Result<EarningsEvents> {
        let path = self.path_for(symbol);
        let events = tokio::task::spawn_blocking(move || Self::load(&path))
            .await
            .context("Earnings loader task failed")??;
        info!(
            "JsonEarningsCalendar: Loaded {} announcements for {}",
            events.len(),
            symbol
        );
        Ok(events)
    }
}

/// In-memory calendar keyed by symbol.
#[derive(Debug, Clone, Default)]
pub struct StaticEarningsCalendar {
    events: HashMap<String, EarningsEvents>,
}

impl StaticEarningsCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(mut self, symbol: impl Into<String>, events: EarningsEvents) -> Self {
        self.events.insert(symbol.into(), events);
        self
    }
}

#[async_trait]
impl EarningsCalendar for StaticEarningsCalendar {
    async fn earnings_history(&self, symbol: &str) -> Result<EarningsEvents> {
        Ok(self
            .events
            .get(symbol)
            .cloned()
            .unwrap_or_else(EarningsEvents::empty))
    }
}
