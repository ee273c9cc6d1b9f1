use crate::domain::errors::MarketDataError;
use crate::domain::market::series::Candle;
use crate::domain::market::trading_day::{is_trading_day, next_trading_day};
use crate::domain::ports::MarketDataService;
use async_trait::async_trait;
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

/// In-memory market data source with switchable failures.
#[derive(Clone)]
pub struct MockMarketDataService {
    bars: Arc<RwLock<Vec<Candle>>>,
    offline: Arc<AtomicBool>,
    failures: Arc<AtomicUsize>,
    calls: Arc<AtomicUsize>,
}

impl MockMarketDataService {
    pub fn new(bars: Vec<Candle>) -> Self {
        Self {
            bars: Arc::new(RwLock::new(bars)),
            offline: Arc::new(AtomicBool::new(false)),
            failures: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Every request fails with `ConnectionLost` while offline.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// The next `count` requests fail with `ConnectionLost`.
    pub fn fail_next(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataService for MockMarketDataService {
    async fn get_daily_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Candle>, MarketDataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let injected = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected || self.offline.load(Ordering::SeqCst) {
            return Err(MarketDataError::ConnectionLost {
                reason: "mock source offline".to_string(),
            });
        }

        let bars: Vec<Candle> = self
            .bars
            .read()
            .await
            .iter()
            .filter(|c| c.symbol == symbol && c.date >= start && c.date <= end)
            .cloned()
            .collect();

        debug!(
            "MockMarketDataService: {} bars for {} ({} to {})",
            bars.len(),
            symbol,
            start,
            end
        );

        if bars.is_empty() {
            return Err(MarketDataError::EmptyResult {
                symbol: symbol.to_string(),
            });
        }
        Ok(bars)
    }
}

/// Deterministic random-walk daily bars on consecutive weekdays from `start`.
pub fn synthetic_bars(symbol: &str, start: NaiveDate, days: usize, seed: u64) -> Vec<Candle> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut date = if is_trading_day(start) {
        start
    } else {
        next_trading_day(start)
    };
    let mut close: f64 = 100.0;
    let mut bars = Vec::with_capacity(days);

    for _ in 0..days {
        let open = close;
        // -2% to +2% daily drift
        let change_pct: f64 = rng.random_range(-0.02..0.02);
        close = (close * (1.0 + change_pct)).max(1.0);
        let high = open.max(close) * (1.0 + rng.random_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.random_range(0.0..0.01));
        let volume: u64 = rng.random_range(800_000..1_200_000);

        bars.push(Candle {
            symbol: symbol.to_string(),
            date,
            open: to_price(open),
            high: to_price(high),
            low: to_price(low),
            close: to_price(close),
            volume: Decimal::from(volume),
        });
        date = next_trading_day(date);
    }
    bars
}

fn to_price(value: f64) -> Decimal {
    Decimal::from_f64(value)
        .map(|d| d.round_dp(2))
        .unwrap_or(Decimal::ONE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 6, 3).unwrap()
    }

    #[test]
    fn test_synthetic_bars_are_deterministic_weekdays() {
        let a = synthetic_bars("AAPL", start(), 10, 42);
        let b = synthetic_bars("AAPL", start(), 10, 42);

        assert_eq!(a, b);
        // 3 June 2023 is a Saturday
        assert_eq!(a[0].date, NaiveDate::from_ymd_opt(2023, 6, 5).unwrap());
        assert!(a.iter().all(|c| is_trading_day(c.date)));
        assert!(a.iter().all(|c| c.validate().is_ok()));
    }

    #[tokio::test]
    async fn test_range_filter_and_failures() {
        let bars = synthetic_bars("AAPL", start(), 5, 1);
        let mock = MockMarketDataService::new(bars.clone());

        let one = mock.get_daily_bars("AAPL", bars[2].date, bars[2].date).await.unwrap();
        assert_eq!(one, vec![bars[2].clone()]);

        assert!(matches!(
            mock.get_daily_bars("MSFT", bars[0].date, bars[4].date).await,
            Err(MarketDataError::EmptyResult { .. })
        ));

        mock.fail_next(2);
        assert!(mock.get_daily_bars("AAPL", bars[3].date, bars[3].date).await.is_err());
        assert!(mock.get_daily_bars("AAPL", bars[0].date, bars[2].date).await.is_err());
        assert!(mock.get_daily_bars("AAPL", bars[0].date, bars[2].date).await.is_ok());

        mock.set_offline(true);
        assert!(matches!(
            mock.get_daily_bars("AAPL", bars[0].date, bars[2].date).await,
            Err(MarketDataError::ConnectionLost { .. })
        ));
        assert_eq!(mock.call_count(), 6);
    }
}
