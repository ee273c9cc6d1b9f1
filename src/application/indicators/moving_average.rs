//! Moving averages and trailing-window helpers
//!
//! Every rolling indicator in this crate is defined on the trailing window
//! ending at the current row, with a minimum period of one sample: early rows
//! use however many samples exist so far. The `*_at` kernels take that window
//! as a slice so the full-series functions and the incremental carry evaluate
//! exactly the same floating-point operations.

use crate::domain::errors::FeatureError;
use ta::Next;
use ta::indicators::ExponentialMovingAverage;

/// Creates an EMA with `alpha = 2 / (span + 1)`, seeded with the first input.
pub fn new_ema(span: usize) -> Result<ExponentialMovingAverage, FeatureError> {
    ExponentialMovingAverage::new(span).map_err(|e| FeatureError::InvalidConfig {
        reason: format!("EMA span {}: {:?}", span, e),
    })
}

/// Exponential moving average over the whole series.
pub fn ema(values: &[f64], span: usize) -> Result<Vec<f64>, FeatureError> {
    let mut ema = new_ema(span)?;
    Ok(values.iter().map(|v| ema.next(*v)).collect())
}

/// Trailing windows of at most `window` samples, one per input element.
pub fn trailing_windows(values: &[f64], window: usize) -> impl Iterator<Item = &[f64]> {
    (0..values.len()).map(move |t| &values[(t + 1).saturating_sub(window)..=t])
}

/// Last `window` samples of a slice.
pub fn tail(values: &[f64], window: usize) -> &[f64] {
    &values[values.len().saturating_sub(window)..]
}

pub fn window_sum(window: &[f64]) -> f64 {
    window.iter().sum()
}

/// NaN for an empty window.
pub fn window_mean(window: &[f64]) -> f64 {
    if window.is_empty() {
        return f64::NAN;
    }
    window_sum(window) / window.len() as f64
}

pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    trailing_windows(values, window).map(window_mean).collect()
}

pub fn rolling_sum(values: &[f64], window: usize) -> Vec<f64> {
    trailing_windows(values, window).map(window_sum).collect()
}
