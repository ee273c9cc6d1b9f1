use crate::domain::errors::FeatureError;
use crate::domain::ml::feature_matrix::FeatureMatrix;
use ndarray::{Array1, Array2, Array3, ArrayView2, Axis, s};

/// Supervised pair: `num_days` consecutive rows and the next row's first column.
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    pub start: usize,
    pub x: Array2<f64>,
    pub y: f64,
}

/// Slices a feature matrix into training sequences.
#[derive(Debug, Clone, Copy)]
pub struct SequenceWindower {
    num_days: usize,
}

impl SequenceWindower {
    pub fn new(num_days: usize) -> Self {
        Self { num_days }
    }

    pub fn num_days(&self) -> usize {
        self.num_days
    }

    /// Lazily yields the `R - L` pairs of an `R`-row matrix.
    pub fn sequences<'a>(&self, matrix: &'a FeatureMatrix) -> Result<Sequences<'a>, FeatureError> {
        let rows = matrix.nrows();
        let required = self.num_days + 1;
        if self.num_days == 0 || rows < required || matrix.ncols() == 0 {
            return Err(FeatureError::DataInsufficient {
                rows,
                required: required.max(2),
            });
        }

        Ok(Sequences {
            values: matrix.values().view(),
            num_days: self.num_days,
            next: 0,
            end: rows - self.num_days,
        })
    }

    /// All pairs stacked as `(X [R-L, L, C], y [R-L])`.
    pub fn to_arrays(
        &self,
        matrix: &FeatureMatrix,
    ) -> Result<(Array3<f64>, Array1<f64>), FeatureError> {
        let sequences = self.sequences(matrix)?;
        let count = sequences.len();
        let mut x = Array3::zeros((count, self.num_days, matrix.ncols()));
        let mut y = Array1::zeros(count);

        for (i, seq) in sequences.enumerate() {
            x.index_axis_mut(Axis(0), i).assign(&seq.x);
            y[i] = seq.y;
        }
        Ok((x, y))
    }
}

pub struct Sequences<'a> {
    values: ArrayView2<'a, f64>,
    num_days: usize,
    next: usize,
    end: usize,
}

impl Iterator for Sequences<'_> {
    type Item = Sequence;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let start = self.next;
        self.next += 1;

        Some(Sequence {
            start,
            x: self.values.slice(s![start..start + self.num_days, ..]).to_owned(),
            y: self.values[[start + self.num_days, 0]],
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Sequences<'_> {}
