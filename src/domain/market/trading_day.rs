use chrono::{Datelike, Days, NaiveDate, Weekday};

/// Next weekday after `date`. Exchange holidays are not modelled.
pub fn next_trading_day(date: NaiveDate) -> NaiveDate {
    let skip = match date.weekday() {
        Weekday::Fri => 3,
        Weekday::Sat => 2,
        _ => 1,
    };
    date.checked_add_days(Days::new(skip)).unwrap_or(date)
}

pub fn is_trading_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}
