use crate::application::feature_engineering_service::IndicatorCarry;
use crate::application::ml::sources::AcquisitionMode;
use crate::domain::errors::FeatureError;
use crate::domain::ml::feature_matrix::{FeatureMatrix, FeatureRow};
use crate::domain::ml::feature_registry::ColumnKey;
use chrono::NaiveDate;
use ndarray::Array3;
use std::collections::VecDeque;

/// The last `num_days` scaled feature rows of one model configuration.
///
/// Only [`crate::application::ml::rolling_cache::RollingCache`] mutates a
/// window, and it replaces rows, cursor and carry together.
#[derive(Debug, Clone)]
pub struct CacheWindow {
    columns: Vec<ColumnKey>,
    rows: VecDeque<FeatureRow>,
    cursor: NaiveDate,
    carry: Option<IndicatorCarry>,
    last_mode: AcquisitionMode,
}

impl CacheWindow {
    pub(crate) fn new(
        columns: Vec<ColumnKey>,
        capacity: usize,
        rows: Vec<FeatureRow>,
        carry: Option<IndicatorCarry>,
        mode: AcquisitionMode,
    ) -> Result<Self, FeatureError> {
        if rows.len() != capacity {
            return Err(FeatureError::DataInsufficient {
                rows: rows.len(),
                required: capacity,
            });
        }
        let cursor = rows
            .last()
            .map(|r| r.date)
            .ok_or_else(|| FeatureError::Unknown {
                reason: "population produced no rows".to_string(),
            })?;

        Ok(Self {
            columns,
            rows: rows.into(),
            cursor,
            carry,
            last_mode: mode,
        })
    }

    /// Drops the oldest row and appends `row` in one step.
    pub(crate) fn commit(
        &mut self,
        row: FeatureRow,
        carry: Option<IndicatorCarry>,
        mode: AcquisitionMode,
    ) {
        self.cursor = row.date;
        self.rows.pop_front();
        self.rows.push_back(row);
        self.carry = carry;
        self.last_mode = mode;
    }

    pub fn columns(&self) -> &[ColumnKey] {
        &self.columns
    }

    pub fn cursor(&self) -> NaiveDate {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = &FeatureRow> {
        self.rows.iter()
    }

    pub fn carry(&self) -> Option<&IndicatorCarry> {
        self.carry.as_ref()
    }

    /// Mode that produced the newest row.
    pub fn last_mode(&self) -> AcquisitionMode {
        self.last_mode
    }

    pub fn to_matrix(&self) -> Result<FeatureMatrix, FeatureError> {
        let rows: Vec<FeatureRow> = self.rows.iter().cloned().collect();
        FeatureMatrix::from_rows(self.columns.clone(), &rows)
    }

    /// Batch-of-one predictor input, shaped `[1, num_days, columns]`.
    pub fn to_input(&self) -> Array3<f64> {
        let (days, width) = (self.rows.len(), self.columns.len());
        Array3::from_shape_fn((1, days, width), |(_, day, col)| self.rows[day].values[col])
    }
}
