use crate::domain::errors::FeatureError;
use crate::domain::ml::feature_matrix::{FeatureMatrix, FeatureRow};
use crate::domain::ml::feature_registry::ColumnKey;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Affine scaling parameters of one column: `(value - min) / range`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnScale {
    pub min: f64,
    #[serde(alias = "diff")]
    pub range: f64,
}

impl ColumnScale {
    pub fn new(min: f64, range: f64) -> Self {
        Self { min, range }
    }

    /// Fits (min, max - min) over the finite values of a training column.
    pub fn fit(column: &str, values: &[f64]) -> Result<Self, FeatureError> {
        let mut finite = values.iter().copied().filter(|v| v.is_finite()).peekable();
        if finite.peek().is_none() {
            return Err(FeatureError::DegenerateColumn {
                column: column.to_string(),
            });
        }

        let (min, max) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });

        Ok(Self::new(min, max - min))
    }

    pub fn is_degenerate(&self) -> bool {
        self.range == 0.0 || !self.range.is_finite()
    }

    pub fn apply(&self, column: &str, value: f64) -> Result<f64, FeatureError> {
        if self.is_degenerate() {
            return Err(FeatureError::DegenerateColumn {
                column: column.to_string(),
            });
        }
        Ok((value - self.min) / self.range)
    }

    pub fn apply_column(&self, column: &str, values: &[f64]) -> Result<Vec<f64>, FeatureError> {
        values.iter().map(|v| self.apply(column, *v)).collect()
    }
}

/// What `ScalerParams::fit` does with a zero-range column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DegeneratePolicy {
    Fail,
    /// Leave the column unscaled.
    Skip,
    /// Keep the min and substitute this range.
    DefaultRange(f64),
}

/// Per-column scaling parameters persisted between training and inference.
///
/// Serialized as the plain `{column: {"min": .., "range": ..}}` mapping; columns
/// fitted under [`DegeneratePolicy::Skip`] are listed under `passthrough`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    passthrough: BTreeSet<String>,
    #[serde(flatten)]
    columns: BTreeMap<String, ColumnScale>,
}

impl ScalerParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit(matrix: &FeatureMatrix, policy: DegeneratePolicy) -> Result<Self, FeatureError> {
        let mut params = Self::new();

        for key in matrix.columns() {
            let name = key.name();
            let column = matrix
                .column(*key)
                .ok_or_else(|| FeatureError::UnknownColumn {
                    name: name.to_string(),
                })?;
            let values = column.to_vec();

            let fitted = ColumnScale::fit(name, &values)
                .ok()
                .filter(|scale| !scale.is_degenerate());

            let scale = match (fitted, policy) {
                (Some(scale), _) => scale,
                (None, DegeneratePolicy::Fail) => {
                    return Err(FeatureError::DegenerateColumn {
                        column: name.to_string(),
                    });
                }
                (None, DegeneratePolicy::Skip) => {
                    params.passthrough.insert(name.to_string());
                    continue;
                }
                (None, DegeneratePolicy::DefaultRange(range)) => ColumnScale {
                    min: values
                        .iter()
                        .copied()
                        .filter(|v| v.is_finite())
                        .reduce(f64::min)
                        .unwrap_or(0.0),
                    range,
                },
            };

            params.columns.insert(name.to_string(), scale);
        }

        Ok(params)
    }

    pub fn insert(&mut self, column: impl Into<String>, scale: ColumnScale) {
        let column = column.into();
        self.passthrough.remove(&column);
        self.columns.insert(column, scale);
    }

    pub fn mark_passthrough(&mut self, column: impl Into<String>) {
        let column = column.into();
        self.columns.remove(&column);
        self.passthrough.insert(column);
    }

    pub fn get(&self, column: &str) -> Option<&ColumnScale> {
        self.columns.get(column)
    }

    pub fn is_passthrough(&self, column: &str) -> bool {
        self.passthrough.contains(column)
    }

    pub fn len(&self) -> usize {
        self.columns.len() + self.passthrough.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries of `other` replace ours; other columns are kept.
    pub fn merge(&mut self, other: &ScalerParams) {
        for (column, scale) in &other.columns {
            self.insert(column.clone(), *scale);
        }
        for column in &other.passthrough {
            self.mark_passthrough(column.clone());
        }
    }

    pub fn scale_value(&self, key: ColumnKey, value: f64) -> Result<f64, FeatureError> {
        let name = key.name();
        if self.is_passthrough(name) {
            return Ok(value);
        }
        self.columns
            .get(name)
            .ok_or_else(|| FeatureError::MissingScaler {
                column: name.to_string(),
            })?
            .apply(name, value)
    }

    pub fn scale_row(
        &self,
        columns: &[ColumnKey],
        row: &FeatureRow,
    ) -> Result<FeatureRow, FeatureError> {
        if columns.len() != row.values.len() {
            return Err(FeatureError::MalformedSeries {
                reason: format!(
                    "row {} has {} values for {} columns",
                    row.date,
                    row.values.len(),
                    columns.len()
                ),
            });
        }
        let values = columns
            .iter()
            .zip(&row.values)
            .map(|(key, value)| self.scale_value(*key, *value))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(FeatureRow::new(row.date, values))
    }

    /// Scales one whole column; passthrough columns are copied.
    pub fn scale_column(&self, key: ColumnKey, values: &[f64]) -> Result<Vec<f64>, FeatureError> {
        let name = key.name();
        if self.is_passthrough(name) {
            return Ok(values.to_vec());
        }
        self.columns
            .get(name)
            .ok_or_else(|| FeatureError::MissingScaler {
                column: name.to_string(),
            })?
            .apply_column(name, values)
    }

    pub fn scale_matrix(&self, matrix: &FeatureMatrix) -> Result<FeatureMatrix, FeatureError> {
        let scaled = matrix
            .columns()
            .iter()
            .map(|key| {
                let values = matrix.column(*key).map(|c| c.to_vec()).unwrap_or_default();
                self.scale_column(*key, &values)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let rows: Vec<FeatureRow> = matrix
            .dates()
            .iter()
            .enumerate()
            .map(|(t, date)| FeatureRow::new(*date, scaled.iter().map(|c| c[t]).collect()))
            .collect();
        FeatureMatrix::from_rows(matrix.columns().to_vec(), &rows)
    }
}
