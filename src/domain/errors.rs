use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised while deriving, scaling or acquiring feature windows
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("Data unavailable for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    #[error("Date {date} is not in the snapshot date index")]
    OutOfRange { date: NaiveDate },

    #[error("Insufficient data: {rows} rows, need at least {required}")]
    DataInsufficient { rows: usize, required: usize },

    #[error("Column '{column}' has zero range and cannot be scaled")]
    DegenerateColumn { column: String },

    #[error("Feature window could not be built: {reason}")]
    Unknown { reason: String },

    #[error("Both acquisition modes failed (online: {online}; offline: {offline})")]
    Exhausted {
        online: Box<FeatureError>,
        offline: Box<FeatureError>,
    },

    #[error("Malformed series: {reason}")]
    MalformedSeries { reason: String },

    #[error("Unknown information key: '{name}'")]
    UnknownColumn { name: String },

    #[error("No scaler parameters for column '{column}'")]
    MissingScaler { column: String },

    #[error("Cannot advance to {date}: window cursor is already at {cursor}")]
    InvalidAdvance { cursor: NaiveDate, date: NaiveDate },

    #[error("Invalid model configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl FeatureError {
    /// Only source failures may be retried through the other acquisition mode.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FeatureError::DataUnavailable { .. })
    }
}

/// Errors related to market data and connectivity
#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("Connection lost: {reason}")]
    ConnectionLost { reason: String },

    #[error("No bars returned for {symbol}")]
    EmptyResult { symbol: String },

    #[error("Invalid market data for {symbol}: {reason}")]
    InvalidData { symbol: String, reason: String },

    #[error("Service timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    #[error("Rate limit exceeded: retry after {retry_after_secs}s")]
    RateLimitExceeded { retry_after_secs: u64 },
}

impl MarketDataError {
    pub fn into_unavailable(self, symbol: &str) -> FeatureError {
        FeatureError::DataUnavailable {
            symbol: symbol.to_string(),
            reason: self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_formatting_keeps_both_causes() {
        let error = FeatureError::Exhausted {
            online: Box::new(FeatureError::DataUnavailable {
                symbol: "AAPL".to_string(),
                reason: "Connection lost: reset".to_string(),
            }),
            offline: Box::new(FeatureError::OutOfRange {
                date: NaiveDate::from_ymd_opt(2023, 6, 6).unwrap(),
            }),
        };

        let msg = error.to_string();
        assert!(msg.contains("AAPL"));
        assert!(msg.contains("2023-06-06"));
    }

    #[test]
    fn test_only_unavailable_is_retryable() {
        let unavailable = MarketDataError::Timeout { duration_ms: 30000 }.into_unavailable("MSFT");
        assert!(unavailable.is_retryable());
        assert!(unavailable.to_string().contains("30000ms"));

        let out_of_range = FeatureError::OutOfRange {
            date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
        };
        assert!(!out_of_range.is_retryable());
        assert!(!FeatureError::DegenerateColumn { column: "RSI".into() }.is_retryable());
    }
}
