use super::common::AlpacaBarsResponse;
use crate::config::{AlpacaConfig, HttpSettings};
use crate::domain::errors::MarketDataError;
use crate::domain::market::series::Candle;
use crate::domain::ports::MarketDataService;
use crate::infrastructure::core::http_client_factory::{HttpClientFactory, build_url_with_query};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::StatusCode;
use reqwest_middleware::ClientWithMiddleware;
use tracing::{debug, error, info};

const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Daily bars from the Alpaca v2 stock data API.
pub struct AlpacaDailyBarService {
    client: ClientWithMiddleware,
    api_key: String,
    api_secret: String,
    data_base_url: String,
    timeout_secs: u64,
}

impl AlpacaDailyBarService {
    pub fn new(config: &AlpacaConfig, http: &HttpSettings) -> Self {
        Self {
            client: HttpClientFactory::create_client(http),
            api_key: config.api_key.clone(),
            api_secret: config.secret_key.clone(),
            data_base_url: config.data_url.trim_end_matches('/').to_string(),
            timeout_secs: http.timeout_secs,
        }
    }

    fn classify_transport_error(&self, err: reqwest_middleware::Error) -> MarketDataError {
        let timed_out = match &err {
            reqwest_middleware::Error::Reqwest(inner) => inner.is_timeout(),
            reqwest_middleware::Error::Middleware(_) => false,
        };
        if timed_out {
            MarketDataError::Timeout {
                duration_ms: self.timeout_secs * 1000,
            }
        } else {
            MarketDataError::ConnectionLost {
                reason: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl MarketDataService for AlpacaDailyBarService {
    async fn get_daily_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Candle>, MarketDataError> {
        let endpoint = format!("{}/v2/stocks/bars", self.data_base_url);
        let start_ts = format!("{}T00:00:00Z", start.format("%Y-%m-%d"));
        let end_ts = format!("{}T23:59:59Z", end.format("%Y-%m-%d"));

        let mut candles = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query_params = vec![
                ("symbols", symbol.to_string()),
                ("start", start_ts.clone()),
                ("end", end_ts.clone()),
                ("timeframe", "1Day".to_string()),
                ("adjustment", "raw".to_string()),
                ("feed", "iex".to_string()),
                ("limit", "10000".to_string()),
            ];
            if let Some(token) = &page_token {
                query_params.push(("page_token", token.clone()));
            }

            let url = build_url_with_query(&endpoint, &query_params).map_err(|e| {
                MarketDataError::InvalidData {
                    symbol: symbol.to_string(),
                    reason: format!("{:#}", e),
                }
            })?;
            debug!("AlpacaDailyBarService: GET {}", url);

            let response = self
                .client
                .get(url)
                .header("APCA-API-KEY-ID", &self.api_key)
                .header("APCA-API-SECRET-KEY", &self.api_secret)
                .send()
                .await
                .map_err(|e| self.classify_transport_error(e))?;

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after_secs = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
                return Err(MarketDataError::RateLimitExceeded { retry_after_secs });
            }
            if !status.is_success() {
                let error_text = response.text().await.unwrap_or_default();
                error!(
                    "AlpacaDailyBarService: API error {} for {}: {}",
                    status, symbol, error_text
                );
                return Err(MarketDataError::ConnectionLost {
                    reason: format!("Alpaca API error ({}): {}", status, error_text),
                });
            }

            let page: AlpacaBarsResponse =
                response
                    .json()
                    .await
                    .map_err(|e| MarketDataError::InvalidData {
                        symbol: symbol.to_string(),
                        reason: format!("Failed to parse bars response: {}", e),
                    })?;

            if let Some(bars) = page.bars.get(symbol) {
                for bar in bars {
                    candles.push(bar.to_candle(symbol)?);
                }
            }

            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        if candles.is_empty() {
            return Err(MarketDataError::EmptyResult {
                symbol: symbol.to_string(),
            });
        }

        info!(
            "AlpacaDailyBarService: Fetched {} daily bars for {} ({} to {})",
            candles.len(),
            symbol,
            start,
            end
        );
        Ok(candles)
    }
}
