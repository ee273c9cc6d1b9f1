use crate::domain::errors::FeatureError;
use crate::domain::ml::feature_matrix::{FeatureMatrix, FeatureRow};
use crate::domain::ml::feature_registry::ColumnKey;
use crate::domain::ports::SnapshotSource;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

/// Date-indexed table of unscaled feature values, built once out of band.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    symbol: String,
    dates: Vec<NaiveDate>,
    columns: BTreeMap<String, Vec<f64>>,
    index: HashMap<NaiveDate, usize>,
}

impl Snapshot {
    pub fn new(
        symbol: impl Into<String>,
        dates: Vec<NaiveDate>,
        columns: BTreeMap<String, Vec<f64>>,
    ) -> Result<Self, FeatureError> {
        if let Some(pair) = dates.windows(2).find(|w| w[1] <= w[0]) {
            return Err(FeatureError::MalformedSeries {
                reason: format!(
                    "snapshot dates must be strictly increasing: {} followed by {}",
                    pair[0], pair[1]
                ),
            });
        }
        if let Some((name, values)) = columns.iter().find(|(_, v)| v.len() != dates.len()) {
            return Err(FeatureError::MalformedSeries {
                reason: format!(
                    "snapshot column '{}' has {} values for {} dates",
                    name,
                    values.len(),
                    dates.len()
                ),
            });
        }

        let index = dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();

        Ok(Self {
            symbol: symbol.into(),
            dates,
            columns,
            index,
        })
    }

    pub fn from_matrix(
        symbol: impl Into<String>,
        matrix: &FeatureMatrix,
    ) -> Result<Self, FeatureError> {
        let columns = matrix
            .columns()
            .iter()
            .enumerate()
            .map(|(i, key)| (key.name().to_string(), matrix.values().column(i).to_vec()))
            .collect();
        Self::new(symbol, matrix.dates().to_vec(), columns)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn columns(&self) -> &BTreeMap<String, Vec<f64>> {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

impl SnapshotSource for Snapshot {
    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn position(&self, date: NaiveDate) -> Result<usize, FeatureError> {
        self.index
            .get(&date)
            .copied()
            .ok_or(FeatureError::OutOfRange { date })
    }

    fn seek(&self, date: NaiveDate) -> Option<usize> {
        let index = self.dates.partition_point(|d| *d < date);
        (index < self.dates.len()).then_some(index)
    }

    fn row_at(&self, index: usize, columns: &[ColumnKey]) -> Result<FeatureRow, FeatureError> {
        let date = *self.dates.get(index).ok_or_else(|| FeatureError::Unknown {
            reason: format!("snapshot row {} does not exist", index),
        })?;

        let values = columns
            .iter()
            .map(|key| {
                self.columns
                    .get(key.name())
                    .map(|column| column[index])
                    .ok_or_else(|| FeatureError::UnknownColumn {
                        name: key.name().to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FeatureRow::new(date, values))
    }
}
