use crate::application::indicators::events::earnings_diff;
use crate::application::indicators::momentum::{self, oscillator_at, rsi_at};
use crate::application::indicators::moving_average::{ema, new_ema, tail, window_sum};
use crate::application::indicators::trend::{self, signal_at};
use crate::application::indicators::volatility::{self, bollinger_at, trama_at};
use crate::application::indicators::volume::{self, gradual_spike_at, sharp_spike_at};
use crate::application::market_data::flip_detector::{Flip, FlipDetector, detect_flips};
use crate::domain::errors::FeatureError;
use crate::domain::market::earnings::EarningsEvents;
use crate::domain::market::series::{Candle, RawSeries};
use crate::domain::ml::feature_matrix::{FeatureMatrix, FeatureRow};
use crate::domain::ml::feature_registry::{
    BOLLINGER_WINDOW, COLUMN_COUNT, ColumnKey, EMA_FAST_SPAN, EMA_SLOW_SPAN, EMA_TREND_SPAN,
    FeaturePlan, GRADUAL_SPIKE_WINDOW, MOMENTUM_WINDOW, OSCILLATOR_WINDOW, RSI_WINDOW,
    SHARP_SPIKE_WINDOW, SIGNAL_WINDOW, TRAMA_WINDOW,
};
use crate::domain::ports::FeatureEngineeringService;
use chrono::NaiveDate;
use std::collections::VecDeque;
use std::sync::Arc;
use ta::Next;
use ta::indicators::ExponentialMovingAverage;
use tracing::debug;

const CLOSE_TAIL: usize = max_window(&[TRAMA_WINDOW, BOLLINGER_WINDOW]);
const CHANGE_TAIL: usize = max_window(&[MOMENTUM_WINDOW, RSI_WINDOW, OSCILLATOR_WINDOW]);

const fn max_window(windows: &[usize]) -> usize {
    let mut max = 0;
    let mut i = 0;
    while i < windows.len() {
        if windows[i] > max {
            max = windows[i];
        }
        i += 1;
    }
    max
}

/// Bounded history of the most recent samples, kept contiguous.
#[derive(Debug, Clone)]
struct Tail {
    capacity: usize,
    buf: VecDeque<f64>,
}

impl Tail {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            buf: VecDeque::with_capacity(capacity + 1),
        }
    }

    fn push(&mut self, value: f64) {
        if self.buf.len() == self.capacity {
            self.buf.pop_front();
        }
        self.buf.push_back(value);
        self.buf.make_contiguous();
    }

    fn last(&self, n: usize) -> &[f64] {
        tail(self.buf.as_slices().0, n)
    }
}

/// Everything needed to extend the indicator history by one bar: EMA states,
/// the trailing samples of every windowed indicator and the flip detector
/// states. Folding a carry over a series is the batch derivation, so an
/// incremental step reproduces a full recompute exactly.
#[derive(Debug, Clone)]
pub struct IndicatorCarry {
    plan: FeaturePlan,
    earnings: Arc<EarningsEvents>,
    ema_fast: ExponentialMovingAverage,
    ema_slow: ExponentialMovingAverage,
    ema_trend: ExponentialMovingAverage,
    prev_close: Option<f64>,
    closes: Tail,
    changes: Tail,
    macds: Tail,
    volumes: Tail,
    ema_flips: FlipDetector,
    signal_flips: FlipDetector,
    last_date: Option<NaiveDate>,
    rows_seen: usize,
}

impl IndicatorCarry {
    pub fn new(plan: FeaturePlan, earnings: Arc<EarningsEvents>) -> Result<Self, FeatureError> {
        Ok(Self {
            plan,
            earnings,
            ema_fast: new_ema(EMA_FAST_SPAN)?,
            ema_slow: new_ema(EMA_SLOW_SPAN)?,
            ema_trend: new_ema(EMA_TREND_SPAN)?,
            prev_close: None,
            closes: Tail::new(CLOSE_TAIL),
            changes: Tail::new(CHANGE_TAIL),
            macds: Tail::new(SIGNAL_WINDOW),
            volumes: Tail::new(GRADUAL_SPIKE_WINDOW),
            ema_flips: FlipDetector::new(),
            signal_flips: FlipDetector::new(),
            last_date: None,
            rows_seen: 0,
        })
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.last_date
    }

    pub fn rows_seen(&self) -> usize {
        self.rows_seen
    }
}

impl FeatureEngineeringService for IndicatorCarry {
    /// Derives the requested columns for the next bar.
    ///
    /// All validation happens before any state moves, so an error leaves the
    /// carry untouched.
    fn update(&mut self, candle: &Candle) -> Result<FeatureRow, FeatureError> {
        use ColumnKey::*;

        candle.validate()?;
        if let Some(last) = self.last_date.filter(|last| candle.date <= *last) {
            return Err(FeatureError::MalformedSeries {
                reason: format!("bar {} does not follow {}", candle.date, last),
            });
        }
        let close = candle.close_f64()?;
        let volume = candle.volume_f64()?;

        let plan = &self.plan;
        let mut v = [f64::NAN; COLUMN_COUNT];
        v[Close.index()] = close;

        if plan.needs(Change) {
            let change = self.prev_close.map_or(0.0, |prev| close - prev);
            self.changes.push(change);
            v[Change.index()] = change;
        }
        if plan.needs(Trama) || plan.needs(BollingerMiddle) {
            self.closes.push(close);
        }

        if plan.needs(Ema12) {
            v[Ema12.index()] = self.ema_fast.next(close);
        }
        if plan.needs(Ema26) {
            v[Ema26.index()] = self.ema_slow.next(close);
        }
        if plan.needs(Ema200) {
            v[Ema200.index()] = self.ema_trend.next(close);
        }
        if plan.needs(Macd) {
            let macd = v[Ema12.index()] - v[Ema26.index()];
            self.macds.push(macd);
            v[Macd.index()] = macd;
        }
        if plan.needs(SignalLine) {
            v[SignalLine.index()] = signal_at(self.macds.last(SIGNAL_WINDOW));
        }
        if plan.needs(Histogram) {
            v[Histogram.index()] = v[Macd.index()] - v[SignalLine.index()];
        }

        if plan.needs(Momentum) {
            v[Momentum.index()] = window_sum(self.changes.last(MOMENTUM_WINDOW));
        }
        if plan.needs(Rsi) {
            v[Rsi.index()] = rsi_at(self.changes.last(RSI_WINDOW));
        }
        if plan.needs(Trama) {
            v[Trama.index()] = trama_at(self.closes.last(TRAMA_WINDOW), v[Change.index()]);
        }
        if plan.needs(MomentumOscillator) {
            v[MomentumOscillator.index()] = oscillator_at(self.changes.last(OSCILLATOR_WINDOW));
        }
        if plan.needs(BollingerMiddle) {
            let bands = bollinger_at(self.closes.last(BOLLINGER_WINDOW));
            v[BollingerMiddle.index()] = bands.middle;
            v[AboveBollinger.index()] = bands.above;
            v[BelowBollinger.index()] = bands.below;
        }

        if plan.needs(GradualLiquiditySpike) || plan.needs(SharpLiquiditySpike) {
            self.volumes.push(volume);
            v[GradualLiquiditySpike.index()] =
                gradual_spike_at(self.volumes.last(GRADUAL_SPIKE_WINDOW));
            v[SharpLiquiditySpike.index()] = sharp_spike_at(self.volumes.last(SHARP_SPIKE_WINDOW));
        }

        if plan.needs(EmaFlips) {
            v[EmaFlips.index()] = self
                .ema_flips
                .next(v[Ema12.index()], v[Ema26.index()])
                .encode();
        }
        if plan.needs(SignalFlips) {
            v[SignalFlips.index()] = self
                .signal_flips
                .next(v[Macd.index()], v[SignalLine.index()])
                .encode();
        }
        if plan.needs(EarningDiffs) {
            v[EarningDiffs.index()] = self.earnings.surprise_on(candle.date);
        }

        self.prev_close = Some(close);
        self.last_date = Some(candle.date);
        self.rows_seen += 1;

        let values = plan.requested().iter().map(|k| v[k.index()]).collect();
        Ok(FeatureRow::new(candle.date, values))
    }
}

/// Derives feature matrices for a fixed set of requested columns.
#[derive(Debug, Clone)]
pub struct TechnicalFeatureEngineeringService {
    plan: FeaturePlan,
}

impl TechnicalFeatureEngineeringService {
    pub fn new(columns: &[ColumnKey]) -> Self {
        Self {
            plan: FeaturePlan::resolve(columns),
        }
    }

    pub fn all_columns() -> Self {
        Self {
            plan: FeaturePlan::all_columns(),
        }
    }

    pub fn columns(&self) -> &[ColumnKey] {
        self.plan.requested()
    }

    /// A carry positioned before the first bar of a history.
    pub fn start(&self, earnings: Arc<EarningsEvents>) -> Result<IndicatorCarry, FeatureError> {
        IndicatorCarry::new(self.plan.clone(), earnings)
    }

    /// Derives every row of `series` and returns the carry positioned after
    /// its last bar.
    pub fn derive(
        &self,
        series: &RawSeries,
        earnings: Arc<EarningsEvents>,
    ) -> Result<(FeatureMatrix, IndicatorCarry), FeatureError> {
        let mut carry = self.start(earnings)?;
        let rows = series
            .candles()
            .iter()
            .map(|candle| carry.update(candle))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            "Derived {} rows x {} columns for {}",
            rows.len(),
            self.columns().len(),
            series.symbol()
        );

        let matrix = FeatureMatrix::from_rows(self.columns().to_vec(), &rows)?;
        Ok((matrix, carry))
    }

    /// Derives every row of `series` column by column with the full-series
    /// indicator functions. Produces the same values as folding a carry.
    pub fn derive_batch(
        &self,
        series: &RawSeries,
        earnings: &EarningsEvents,
    ) -> Result<FeatureMatrix, FeatureError> {
        use ColumnKey::*;

        let plan = &self.plan;
        let closes = series.closes()?;
        let volumes = series.volumes()?;
        let mut cols: Vec<Vec<f64>> = vec![Vec::new(); COLUMN_COUNT];

        let changes = momentum::change(&closes);
        if plan.needs(Ema12) || plan.needs(Ema26) {
            let macd = trend::macd(&closes)?;
            if plan.needs(EmaFlips) {
                cols[EmaFlips.index()] = encode(detect_flips(&macd.ema_fast, &macd.ema_slow)?);
            }
            if plan.needs(SignalFlips) {
                cols[SignalFlips.index()] = encode(detect_flips(&macd.macd, &macd.signal)?);
            }
            cols[Ema12.index()] = macd.ema_fast;
            cols[Ema26.index()] = macd.ema_slow;
            cols[Macd.index()] = macd.macd;
            cols[SignalLine.index()] = macd.signal;
            cols[Histogram.index()] = macd.histogram;
        }
        if plan.needs(Ema200) {
            cols[Ema200.index()] = ema(&closes, EMA_TREND_SPAN)?;
        }
        if plan.needs(Momentum) {
            cols[Momentum.index()] = momentum::momentum(&changes);
        }
        if plan.needs(Rsi) {
            cols[Rsi.index()] = momentum::rsi(&changes);
        }
        if plan.needs(Trama) {
            cols[Trama.index()] = volatility::trama(&closes, &changes);
        }
        if plan.needs(MomentumOscillator) {
            cols[MomentumOscillator.index()] = momentum::momentum_oscillator(&closes);
        }
        if plan.needs(BollingerMiddle) {
            let bands = volatility::bollinger(&closes);
            cols[BollingerMiddle.index()] = bands.middle;
            cols[AboveBollinger.index()] = bands.above;
            cols[BelowBollinger.index()] = bands.below;
        }
        if plan.needs(GradualLiquiditySpike) {
            cols[GradualLiquiditySpike.index()] = volume::gradual_liquidity_spike(&volumes);
        }
        if plan.needs(SharpLiquiditySpike) {
            cols[SharpLiquiditySpike.index()] = volume::sharp_liquidity_spike(&volumes);
        }
        if plan.needs(EarningDiffs) {
            cols[EarningDiffs.index()] = earnings_diff(&series.dates(), earnings);
        }
        cols[Change.index()] = changes;
        cols[Close.index()] = closes;

        let rows: Vec<FeatureRow> = series
            .candles()
            .iter()
            .enumerate()
            .map(|(t, candle)| {
                let values = plan.requested().iter().map(|k| cols[k.index()][t]).collect();
                FeatureRow::new(candle.date, values)
            })
            .collect();

        debug!(
            "Batch-derived {} rows x {} columns for {}",
            rows.len(),
            self.columns().len(),
            series.symbol()
        );
        FeatureMatrix::from_rows(self.columns().to_vec(), &rows)
    }
}

fn encode(flips: Vec<Flip>) -> Vec<f64> {
    flips.into_iter().map(Flip::encode).collect()
}
