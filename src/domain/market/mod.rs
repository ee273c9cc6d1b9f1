// Raw market data and calendars
pub mod earnings;
pub mod series;
pub mod trading_day;
