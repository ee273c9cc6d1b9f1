use crate::domain::market::earnings::EarningsEvents;
use chrono::NaiveDate;

/// Earnings surprise aligned to each row date; 0 on days without an announcement.
pub fn earnings_diff(dates: &[NaiveDate], events: &EarningsEvents) -> Vec<f64> {
    dates.iter().map(|d| events.surprise_on(*d)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surprise_only_on_announcement_day() {
        let d = |day| NaiveDate::from_ymd_opt(2023, 8, day).unwrap();
        let events = EarningsEvents::from_pairs(&[d(3), d(6)], &[1.25, -0.4]).unwrap();

        // the 6th is a Sunday with no row, so it never shows up
        let out = earnings_diff(&[d(2), d(3), d(4), d(7)], &events);
        assert_eq!(out, vec![0.0, 1.25, 0.0, 0.0]);
    }
}
