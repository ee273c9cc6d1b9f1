use crate::application::indicators::moving_average::{ema, rolling_mean, window_mean};
use crate::domain::errors::FeatureError;
use crate::domain::ml::feature_registry::{EMA_FAST_SPAN, EMA_SLOW_SPAN, SIGNAL_WINDOW};

/// MACD family of series, all aligned with the input closes.
#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub ema_fast: Vec<f64>,
    pub ema_slow: Vec<f64>,
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

/// Signal line value for the trailing MACD window.
pub fn signal_at(macd_window: &[f64]) -> f64 {
    window_mean(macd_window)
}

pub fn macd(closes: &[f64]) -> Result<MacdSeries, FeatureError> {
    let ema_fast = ema(closes, EMA_FAST_SPAN)?;
    let ema_slow = ema(closes, EMA_SLOW_SPAN)?;
    let macd: Vec<f64> = ema_fast.iter().zip(&ema_slow).map(|(f, s)| f - s).collect();
    let signal = rolling_mean(&macd, SIGNAL_WINDOW);
    let histogram = macd.iter().zip(&signal).map(|(m, s)| m - s).collect();

    Ok(MacdSeries {
        ema_fast,
        ema_slow,
        macd,
        signal,
        histogram,
    })
}
