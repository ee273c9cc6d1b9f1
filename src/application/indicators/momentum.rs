use crate::application::indicators::moving_average::{rolling_sum, trailing_windows, window_mean};
use crate::domain::ml::feature_registry::{MOMENTUM_WINDOW, OSCILLATOR_WINDOW, RSI_WINDOW};

/// First difference of Close; the first row has no predecessor and is 0.
pub fn change(closes: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(closes.len());
    for (i, close) in closes.iter().enumerate() {
        out.push(if i == 0 { 0.0 } else { close - closes[i - 1] });
    }
    out
}

/// Rolling sum of Change over the momentum window.
pub fn momentum(changes: &[f64]) -> Vec<f64> {
    rolling_sum(changes, MOMENTUM_WINDOW)
}

/// RSI over a trailing window of changes.
///
/// `RS = avg_gain / avg_loss` is left unguarded: a window without losses gives
/// 100 when it has gains and NaN when it has neither.
pub fn rsi_at(change_window: &[f64]) -> f64 {
    let gains: Vec<f64> = change_window.iter().map(|c| c.max(0.0)).collect();
    let losses: Vec<f64> = change_window.iter().map(|c| (-c).max(0.0)).collect();
    let rs = window_mean(&gains) / window_mean(&losses);
    100.0 - 100.0 / (1.0 + rs)
}

pub fn rsi(changes: &[f64]) -> Vec<f64> {
    trailing_windows(changes, RSI_WINDOW).map(rsi_at).collect()
}

/// Chande momentum oscillator over a trailing window of changes, in [-100, 100].
pub fn oscillator_at(change_window: &[f64]) -> f64 {
    let up: f64 = change_window.iter().filter(|c| **c > 0.0).sum();
    let down: f64 = change_window.iter().filter(|c| **c < 0.0).map(|c| -c).sum();
    let total = up + down;
    if total == 0.0 {
        return 0.0;
    }
    100.0 * (up - down) / total
}

/// Momentum oscillator of a Close series.
pub fn momentum_oscillator(closes: &[f64]) -> Vec<f64> {
    let changes = change(closes);
    trailing_windows(&changes, OSCILLATOR_WINDOW)
        .map(oscillator_at)
        .collect()
}
