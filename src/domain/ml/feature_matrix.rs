use crate::domain::errors::FeatureError;
use crate::domain::ml::feature_registry::ColumnKey;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use ndarray::{Array2, ArrayView1, Axis, s};
use std::io::Write;

/// One day of feature values, ordered like the owning configuration's columns.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub date: NaiveDate,
    pub values: Vec<f64>,
}

impl FeatureRow {
    pub fn new(date: NaiveDate, values: Vec<f64>) -> Self {
        Self { date, values }
    }
}

/// Rows are trading days in chronological order, columns are the requested
/// information keys. Every row carries a value for every column.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    columns: Vec<ColumnKey>,
    dates: Vec<NaiveDate>,
    values: Array2<f64>,
}

impl FeatureMatrix {
    pub fn from_rows(columns: Vec<ColumnKey>, rows: &[FeatureRow]) -> Result<Self, FeatureError> {
        let width = columns.len();
        let mut flat = Vec::with_capacity(rows.len() * width);
        let mut dates = Vec::with_capacity(rows.len());

        for row in rows {
            if row.values.len() != width {
                return Err(FeatureError::MalformedSeries {
                    reason: format!(
                        "row {} has {} values for {} columns",
                        row.date,
                        row.values.len(),
                        width
                    ),
                });
            }
            if let Some(last) = dates.last().filter(|last| row.date <= **last) {
                return Err(FeatureError::MalformedSeries {
                    reason: format!("row {} does not follow {}", row.date, last),
                });
            }
            dates.push(row.date);
            flat.extend_from_slice(&row.values);
        }

        let values = Array2::from_shape_vec((rows.len(), width), flat).map_err(|e| {
            FeatureError::MalformedSeries {
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            columns,
            dates,
            values,
        })
    }

    pub fn columns(&self) -> &[ColumnKey] {
        &self.columns
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn column(&self, key: ColumnKey) -> Option<ArrayView1<'_, f64>> {
        self.columns
            .iter()
            .position(|c| *c == key)
            .map(|i| self.values.column(i))
    }

    pub fn row(&self, index: usize) -> Option<FeatureRow> {
        self.dates.get(index).map(|date| FeatureRow {
            date: *date,
            values: self.values.row(index).to_vec(),
        })
    }

    pub fn rows(&self) -> impl Iterator<Item = FeatureRow> + '_ {
        self.dates
            .iter()
            .zip(self.values.axis_iter(Axis(0)))
            .map(|(date, row)| FeatureRow::new(*date, row.to_vec()))
    }

    /// The trailing `n` rows.
    pub fn tail(&self, n: usize) -> Result<Self, FeatureError> {
        let rows = self.nrows();
        if rows < n {
            return Err(FeatureError::DataInsufficient { rows, required: n });
        }
        Ok(Self {
            columns: self.columns.clone(),
            dates: self.dates[rows - n..].to_vec(),
            values: self.values.slice(s![rows - n.., ..]).to_owned(),
        })
    }

    /// Reorders or narrows the columns.
    pub fn select(&self, keys: &[ColumnKey]) -> Result<Self, FeatureError> {
        let mut indices = Vec::with_capacity(keys.len());
        for key in keys {
            let index = self
                .columns
                .iter()
                .position(|c| c == key)
                .ok_or_else(|| FeatureError::UnknownColumn {
                    name: key.name().to_string(),
                })?;
            indices.push(index);
        }

        Ok(Self {
            columns: keys.to_vec(),
            dates: self.dates.clone(),
            values: self.values.select(Axis(1), &indices),
        })
    }

    /// Writes `Date,<columns>` followed by one record per row.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);

        let mut header = vec!["Date".to_string()];
        header.extend(self.columns.iter().map(|c| c.name().to_string()));
        wtr.write_record(&header).context("Failed to write CSV header")?;

        for row in self.rows() {
            let mut record = vec![row.date.format("%Y-%m-%d").to_string()];
            record.extend(row.values.iter().map(|v| v.to_string()));
            wtr.write_record(&record)
                .context(format!("Failed to write CSV row {}", row.date))?;
        }

        wtr.flush().context("Failed to flush CSV writer")?;
        Ok(())
    }
}
