use crate::application::indicators::moving_average::{tail, trailing_windows, window_mean};
use crate::domain::ml::feature_registry::{
    GRADUAL_SPIKE_SMOOTHING, GRADUAL_SPIKE_WINDOW, GRADUAL_SPIKE_Z, SHARP_SPIKE_WINDOW,
    SHARP_SPIKE_Z,
};
use statrs::statistics::{Data, Distribution};

/// Z-score of `value` against `window`. `None` when the window has fewer than
/// two samples or no deviation.
pub fn zscore(value: f64, window: &[f64]) -> Option<f64> {
    if window.len() < 2 {
        return None;
    }
    let data = Data::new(window.to_vec());
    let mean = data.mean()?;
    let std_dev = data.std_dev()?;
    if std_dev == 0.0 || !std_dev.is_finite() {
        return None;
    }
    Some((value - mean) / std_dev)
}

fn flag(z: Option<f64>, threshold: f64) -> f64 {
    match z {
        Some(z) if z >= threshold => 1.0,
        _ => 0.0,
    }
}

/// 1.0 when the last volume of the window is an outlier against the window.
pub fn sharp_spike_at(volume_window: &[f64]) -> f64 {
    let window = tail(volume_window, SHARP_SPIKE_WINDOW);
    match window.last() {
        Some(last) => flag(zscore(*last, window), SHARP_SPIKE_Z),
        None => 0.0,
    }
}

/// 1.0 when the short smoothed volume stands out against the wide baseline.
pub fn gradual_spike_at(volume_window: &[f64]) -> f64 {
    let window = tail(volume_window, GRADUAL_SPIKE_WINDOW);
    let smoothed = window_mean(tail(window, GRADUAL_SPIKE_SMOOTHING));
    flag(zscore(smoothed, window), GRADUAL_SPIKE_Z)
}

pub fn sharp_liquidity_spike(volumes: &[f64]) -> Vec<f64> {
    trailing_windows(volumes, SHARP_SPIKE_WINDOW)
        .map(sharp_spike_at)
        .collect()
}

pub fn gradual_liquidity_spike(volumes: &[f64]) -> Vec<f64> {
    trailing_windows(volumes, GRADUAL_SPIKE_WINDOW)
        .map(gradual_spike_at)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_burst_is_sharp() {
        let mut volumes = vec![1000.0, 1010.0, 990.0, 1005.0, 995.0];
        volumes.extend(std::iter::repeat_n(1000.0, 15));
        volumes.push(50_000.0);
        let flags = sharp_liquidity_spike(&volumes);

        assert_eq!(flags.len(), volumes.len());
        assert_eq!(flags[20], 1.0);
        assert!(flags[..20].iter().all(|f| *f == 0.0));
    }

    #[test]
    fn test_short_or_flat_windows_never_flag() {
        assert_eq!(sharp_spike_at(&[5.0]), 0.0);
        assert_eq!(sharp_spike_at(&[5.0, 5.0, 5.0]), 0.0);
        assert_eq!(gradual_spike_at(&[]), 0.0);
        assert!(zscore(1.0, &[1.0]).is_none());
    }

    #[test]
    fn test_sustained_rise_is_gradual() {
        let mut volumes: Vec<f64> = (0..45).map(|i| 1000.0 + (i % 3) as f64 * 10.0).collect();
        volumes.extend(std::iter::repeat_n(3000.0, 5));
        let flags = gradual_liquidity_spike(&volumes);

        assert_eq!(flags[49], 1.0);
        assert_eq!(flags[10], 0.0);
    }
}
