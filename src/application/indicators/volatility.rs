use crate::application::indicators::moving_average::{trailing_windows, window_mean};
use crate::domain::ml::feature_registry::{
    BOLLINGER_WIDTH, BOLLINGER_WINDOW, TRAMA_VOLATILITY_WEIGHT, TRAMA_WINDOW,
};
use statrs::statistics::{Data, Distribution};

/// Trailing Close mean plus the weighted size of the current day's change.
pub fn trama_at(close_window: &[f64], change: f64) -> f64 {
    window_mean(close_window) + TRAMA_VOLATILITY_WEIGHT * change.abs()
}

pub fn trama(closes: &[f64], changes: &[f64]) -> Vec<f64> {
    trailing_windows(closes, TRAMA_WINDOW)
        .zip(changes)
        .map(|(window, change)| trama_at(window, *change))
        .collect()
}

/// Sample standard deviation, `None` below two samples.
pub fn sample_std_dev(window: &[f64]) -> Option<f64> {
    if window.len() < 2 {
        return None;
    }
    Data::new(window.to_vec()).std_dev()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerPoint {
    pub middle: f64,
    pub above: f64,
    pub below: f64,
}

/// Bands for the last close of a trailing window. Fewer than two samples
/// have no deviation, so the bands collapse onto the middle.
pub fn bollinger_at(close_window: &[f64]) -> BollingerPoint {
    let middle = window_mean(close_window);
    let deviation = sample_std_dev(close_window).unwrap_or(0.0);
    let close = close_window.last().copied().unwrap_or(f64::NAN);
    let upper = middle + BOLLINGER_WIDTH * deviation;
    let lower = middle - BOLLINGER_WIDTH * deviation;

    BollingerPoint {
        middle,
        above: if close > upper { 1.0 } else { 0.0 },
        below: if close < lower { 1.0 } else { 0.0 },
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BollingerSeries {
    pub middle: Vec<f64>,
    pub above: Vec<f64>,
    pub below: Vec<f64>,
}

pub fn bollinger(closes: &[f64]) -> BollingerSeries {
    let mut series = BollingerSeries::default();
    for point in trailing_windows(closes, BOLLINGER_WINDOW).map(bollinger_at) {
        series.middle.push(point.middle);
        series.above.push(point.above);
        series.below.push(point.below);
    }
    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::indicators::momentum::change;

    #[test]
    fn test_trama_adds_weighted_volatility() {
        let closes = [10.0, 11.0, 9.0];
        let changes = change(&closes);
        let out = trama(&closes, &changes);

        // means 10, 10.5, 10; changes 0, +1, -2
        assert_eq!(out[0], 10.0);
        assert!((out[1] - 10.6).abs() < 1e-12);
        assert!((out[2] - 10.2).abs() < 1e-12);
    }

    #[test]
    fn test_bollinger_flags_breakout() {
        let mut closes = vec![100.0, 101.0, 99.0, 100.0, 101.0, 99.0, 100.0, 100.5, 99.5, 100.0];
        closes.push(130.0);
        let bands = bollinger(&closes);

        assert_eq!(bands.middle.len(), closes.len());
        assert_eq!(bands.above[0], 0.0);
        assert_eq!(bands.below[10], 0.0);
        assert_eq!(bands.above[10], 1.0);
    }

    #[test]
    fn test_flat_window_has_no_flags() {
        let bands = bollinger(&[5.0, 5.0, 5.0]);
        assert_eq!(bands.middle, vec![5.0, 5.0, 5.0]);
        assert!(bands.above.iter().chain(&bands.below).all(|v| *v == 0.0));
    }
}
