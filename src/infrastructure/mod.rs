pub mod alpaca;
pub mod core;
pub mod earnings_calendar;
pub mod mock;
pub mod persistence;

pub use alpaca::AlpacaDailyBarService;
pub use earnings_calendar::{JsonEarningsCalendar, StaticEarningsCalendar};
pub use mock::MockMarketDataService;
pub use persistence::{ScalerStore, SnapshotStore};
