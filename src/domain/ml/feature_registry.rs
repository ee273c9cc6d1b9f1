use crate::domain::errors::FeatureError;
use std::fmt;
use std::str::FromStr;

pub const EMA_FAST_SPAN: usize = 12;
pub const EMA_SLOW_SPAN: usize = 26;
pub const EMA_TREND_SPAN: usize = 200;
pub const SIGNAL_WINDOW: usize = 9;
pub const MOMENTUM_WINDOW: usize = 10;
pub const RSI_WINDOW: usize = 14;
pub const TRAMA_WINDOW: usize = 14;
pub const TRAMA_VOLATILITY_WEIGHT: f64 = 0.1;
pub const OSCILLATOR_WINDOW: usize = 14;
pub const BOLLINGER_WINDOW: usize = 20;
pub const BOLLINGER_WIDTH: f64 = 2.0;
pub const SHARP_SPIKE_WINDOW: usize = 20;
pub const SHARP_SPIKE_Z: f64 = 4.0;
pub const GRADUAL_SPIKE_WINDOW: usize = 50;
pub const GRADUAL_SPIKE_SMOOTHING: usize = 5;
pub const GRADUAL_SPIKE_Z: f64 = 2.0;

/// A registered feature column.
///
/// Declaration order is a valid evaluation order: every column is declared
/// after the columns it depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ColumnKey {
    Close,
    Change,
    Ema12,
    Ema26,
    Ema200,
    Macd,
    SignalLine,
    Histogram,
    Momentum,
    Rsi,
    Trama,
    MomentumOscillator,
    BollingerMiddle,
    AboveBollinger,
    BelowBollinger,
    GradualLiquiditySpike,
    SharpLiquiditySpike,
    EmaFlips,
    SignalFlips,
    EarningDiffs,
}

pub const COLUMN_COUNT: usize = 20;

/// Parameters and dependencies of one derived column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorSpec {
    pub key: ColumnKey,
    pub name: &'static str,
    pub dependencies: &'static [ColumnKey],
    /// EMA span or trailing window length; 0 when the column has no look-back.
    pub window: usize,
    /// Samples required before the column stops ramping up.
    pub min_periods: usize,
}

use ColumnKey::*;

pub const REGISTRY: [IndicatorSpec; COLUMN_COUNT] = [
    IndicatorSpec {
        key: Close,
        name: "Close",
        dependencies: &[],
        window: 0,
        min_periods: 1,
    },
    IndicatorSpec {
        key: Change,
        name: "Change",
        dependencies: &[Close],
        window: 2,
        min_periods: 1,
    },
    IndicatorSpec {
        key: Ema12,
        name: "12-day EMA",
        dependencies: &[Close],
        window: EMA_FAST_SPAN,
        min_periods: 1,
    },
    IndicatorSpec {
        key: Ema26,
        name: "26-day EMA",
        dependencies: &[Close],
        window: EMA_SLOW_SPAN,
        min_periods: 1,
    },
    IndicatorSpec {
        key: Ema200,
        name: "200-day EMA",
        dependencies: &[Close],
        window: EMA_TREND_SPAN,
        min_periods: 1,
    },
    IndicatorSpec {
        key: Macd,
        name: "MACD",
        dependencies: &[Ema12, Ema26],
        window: EMA_SLOW_SPAN,
        min_periods: 1,
    },
    IndicatorSpec {
        key: SignalLine,
        name: "Signal Line",
        dependencies: &[Macd],
        window: SIGNAL_WINDOW,
        min_periods: 1,
    },
    IndicatorSpec {
        key: Histogram,
        name: "Histogram",
        dependencies: &[Macd, SignalLine],
        window: SIGNAL_WINDOW,
        min_periods: 1,
    },
    IndicatorSpec {
        key: Momentum,
        name: "Momentum",
        dependencies: &[Change],
        window: MOMENTUM_WINDOW,
        min_periods: 1,
    },
    IndicatorSpec {
        key: Rsi,
        name: "RSI",
        dependencies: &[Change],
        window: RSI_WINDOW,
        min_periods: 1,
    },
    IndicatorSpec {
        key: Trama,
        name: "TRAMA",
        dependencies: &[Close, Change],
        window: TRAMA_WINDOW,
        min_periods: 1,
    },
    IndicatorSpec {
        key: MomentumOscillator,
        name: "momentum_oscillator",
        dependencies: &[Change],
        window: OSCILLATOR_WINDOW,
        min_periods: 1,
    },
    IndicatorSpec {
        key: BollingerMiddle,
        name: "Bollinger Middle",
        dependencies: &[Close],
        window: BOLLINGER_WINDOW,
        min_periods: 1,
    },
    IndicatorSpec {
        key: AboveBollinger,
        name: "Above Bollinger",
        dependencies: &[BollingerMiddle],
        window: BOLLINGER_WINDOW,
        min_periods: 2,
    },
    IndicatorSpec {
        key: BelowBollinger,
        name: "Bellow Bollinger",
        dependencies: &[BollingerMiddle],
        window: BOLLINGER_WINDOW,
        min_periods: 2,
    },
    IndicatorSpec {
        key: GradualLiquiditySpike,
        name: "gradual-liquidity spike",
        dependencies: &[],
        window: GRADUAL_SPIKE_WINDOW,
        min_periods: 2,
    },
    IndicatorSpec {
        key: SharpLiquiditySpike,
        name: "3-liquidity spike",
        dependencies: &[],
        window: SHARP_SPIKE_WINDOW,
        min_periods: 2,
    },
    IndicatorSpec {
        key: EmaFlips,
        name: "ema_flips",
        dependencies: &[Ema12, Ema26],
        window: 0,
        min_periods: 2,
    },
    IndicatorSpec {
        key: SignalFlips,
        name: "signal_flips",
        dependencies: &[Macd, SignalLine],
        window: 0,
        min_periods: 2,
    },
    IndicatorSpec {
        key: EarningDiffs,
        name: "earning diffs",
        dependencies: &[],
        window: 0,
        min_periods: 1,
    },
];

impl ColumnKey {
    pub fn all() -> impl Iterator<Item = ColumnKey> {
        REGISTRY.iter().map(|spec| spec.key)
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn spec(self) -> &'static IndicatorSpec {
        &REGISTRY[self.index()]
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }

    pub fn from_name(name: &str) -> Result<Self, FeatureError> {
        let trimmed = name.trim();
        REGISTRY
            .iter()
            .find(|spec| spec.name == trimmed)
            .map(|spec| spec.key)
            .ok_or_else(|| FeatureError::UnknownColumn {
                name: trimmed.to_string(),
            })
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColumnKey {
    type Err = FeatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ColumnKey::from_name(s)
    }
}

/// Requested columns plus the dependency closure needed to compute them.
///
/// Resolved once per model configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeaturePlan {
    requested: Vec<ColumnKey>,
    required: [bool; COLUMN_COUNT],
}

impl FeaturePlan {
    pub fn resolve(requested: &[ColumnKey]) -> Self {
        let mut required = [false; COLUMN_COUNT];
        let mut pending: Vec<ColumnKey> = requested.to_vec();

        while let Some(key) = pending.pop() {
            if required[key.index()] {
                continue;
            }
            required[key.index()] = true;
            pending.extend(key.spec().dependencies.iter().copied());
        }

        Self {
            requested: requested.to_vec(),
            required,
        }
    }

    /// Every registered column.
    pub fn all_columns() -> Self {
        let keys: Vec<ColumnKey> = ColumnKey::all().collect();
        Self::resolve(&keys)
    }

    pub fn requested(&self) -> &[ColumnKey] {
        &self.requested
    }

    pub fn needs(&self, key: ColumnKey) -> bool {
        self.required[key.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_is_indexed_by_key() {
        for (i, spec) in REGISTRY.iter().enumerate() {
            assert_eq!(spec.key.index(), i, "{} out of place", spec.name);
        }
    }

    #[test]
    fn test_dependencies_declared_before_dependents() {
        for spec in REGISTRY.iter() {
            for dep in spec.dependencies {
                assert!(dep < &spec.key, "{} depends on later {}", spec.name, dep);
            }
        }
    }

    #[test]
    fn test_names_round_trip() {
        for key in ColumnKey::all() {
            assert_eq!(ColumnKey::from_name(key.name()).unwrap(), key);
        }
        assert_eq!("Bellow Bollinger".parse::<ColumnKey>().unwrap(), BelowBollinger);
    }

    #[test]
    fn test_unknown_name_rejected() {
        let err = ColumnKey::from_name("Volume").unwrap_err();
        assert!(matches!(err, FeatureError::UnknownColumn { name } if name == "Volume"));
    }

    #[test]
    fn test_plan_pulls_transitive_dependencies() {
        let plan = FeaturePlan::resolve(&[Histogram]);
        assert!(plan.needs(Macd));
        assert!(plan.needs(SignalLine));
        assert!(plan.needs(Ema12));
        assert!(plan.needs(Ema26));
        assert!(plan.needs(Close));
        assert!(!plan.needs(Ema200));
        assert!(!plan.needs(Rsi));
        assert_eq!(plan.requested(), &[Histogram]);
    }
}
