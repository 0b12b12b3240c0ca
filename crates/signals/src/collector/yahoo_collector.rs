//! Historical OHLCV collector for the Yahoo Finance chart API.
//!
//! Fetches bars from the v8 chart endpoint with rate limiting. Quote field
//! labels are flattened and normalized before columns are looked up, so
//! provider-specific multi-level labels still resolve.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use governor::{Quota, RateLimiter};
use serde::Deserialize;
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::time::Duration;

use cryptosent_data::OhlcvBar;

use super::{ChartInterval, FetchStats, MarketDataSource};

/// Default rate limit (2 requests per second)
const DEFAULT_RATE_LIMIT_PER_SECOND: u32 = 2;

/// Yahoo Finance chart API base URL
const YAHOO_CHART_API: &str = "https://query1.finance.yahoo.com";

const USER_AGENT: &str = "Mozilla/5.0 (compatible; cryptosent/0.1)";

/// OHLCV collector for the Yahoo Finance chart API.
pub struct YahooChartCollector {
    client: reqwest::Client,
    base_url: String,
    rate_limiter: RateLimiter<
        governor::state::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<serde_json::Map<String, serde_json::Value>>,
}

impl YahooChartCollector {
    /// Creates a collector against the public chart API.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(YAHOO_CHART_API, DEFAULT_RATE_LIMIT_PER_SECOND)
    }

    /// Creates a collector with custom configuration.
    ///
    /// # Arguments
    /// * `base_url` - Base URL for the chart API
    /// * `rate_limit_per_second` - Maximum requests per second (0 is treated as 1)
    #[must_use]
    pub fn with_config(base_url: &str, rate_limit_per_second: u32) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();

        let quota = Quota::per_second(NonZeroU32::new(rate_limit_per_second).unwrap_or(NonZeroU32::MIN));

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            rate_limiter: RateLimiter::direct(quota),
        }
    }

    /// Fetches bars for a ticker within a time range.
    ///
    /// # Returns
    /// Complete bars (rows with any missing OHLC value are dropped) and
    /// statistics about the fetch.
    ///
    /// # Errors
    /// Returns an error if the request fails or the API reports an error.
    pub async fn fetch(
        &self,
        ticker: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: ChartInterval,
    ) -> Result<(Vec<OhlcvBar>, FetchStats)> {
        if start > end {
            return Err(anyhow!("Start time must be before end time"));
        }

        self.rate_limiter.until_ready().await;

        let url = format!("{}/v8/finance/chart/{}", self.base_url, ticker);
        tracing::debug!("GET {} ({} to {})", url, start, end);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("period1", start.timestamp().to_string()),
                ("period2", end.timestamp().to_string()),
                ("interval", interval.as_str().to_string()),
            ])
            .send()
            .await
            .context("Failed to send request to chart API")?;

        let mut stats = FetchStats::new();
        stats.total_requests += 1;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Chart API error ({}): {}", status, error_text));
        }

        let envelope: ChartEnvelope = response
            .json()
            .await
            .context("Failed to parse chart API response")?;

        let bars = parse_chart(envelope, &mut stats)?;
        stats.total_records = bars.len() as u64;

        Ok((bars, stats))
    }
}

impl Default for YahooChartCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataSource for YahooChartCollector {
    async fn fetch_bars(
        &self,
        ticker: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: ChartInterval,
    ) -> Result<Vec<OhlcvBar>> {
        let (bars, stats) = self.fetch(ticker, start, end, interval).await?;
        tracing::debug!("{}: {}", ticker, stats.summary());
        Ok(bars)
    }
}

/// Flattens a possibly multi-level field label and normalizes it to
/// lowercase snake case.
///
/// `('Close', 'BTC-USD')` becomes `close`, `Adj Close` becomes `adj_close`.
#[must_use]
pub fn normalize_label(label: &str) -> String {
    let trimmed = label.trim();
    let first_level = trimmed
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .and_then(|inner| inner.split(',').next())
        .unwrap_or(trimmed);

    first_level
        .trim()
        .trim_matches(|c| c == '\'' || c == '"')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

fn parse_chart(envelope: ChartEnvelope, stats: &mut FetchStats) -> Result<Vec<OhlcvBar>> {
    if let Some(error) = envelope.chart.error.filter(|e| !e.is_null()) {
        return Err(anyhow!("Chart API returned an error: {}", error));
    }

    let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };
    let Some(quote) = result.indicators.quote.into_iter().next() else {
        return Ok(Vec::new());
    };

    let columns: HashMap<String, Vec<Option<f64>>> = quote
        .into_iter()
        .map(|(label, values)| {
            let values = values
                .as_array()
                .map(|arr| arr.iter().map(serde_json::Value::as_f64).collect())
                .unwrap_or_default();
            (normalize_label(&label), values)
        })
        .collect();

    let value = |name: &str, i: usize| -> Option<f64> {
        columns.get(name).and_then(|col| col.get(i).copied().flatten())
    };

    let mut bars = Vec::with_capacity(result.timestamp.len());
    for (i, &ts) in result.timestamp.iter().enumerate() {
        let Some(timestamp) = Utc.timestamp_opt(ts, 0).single() else {
            stats.incomplete_skipped += 1;
            continue;
        };

        match (value("open", i), value("high", i), value("low", i), value("close", i)) {
            (Some(open), Some(high), Some(low), Some(close)) => {
                let volume = value("volume", i).unwrap_or(0.0);
                bars.push(OhlcvBar::new(timestamp, open, high, low, close, volume));
            }
            _ => stats.incomplete_skipped += 1,
        }
    }

    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn range() -> (DateTime<Utc>, DateTime<Utc>) {
        (
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 1, 3, 0, 0).unwrap(),
        )
    }

    fn chart_body(quote: serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "chart": {
                "result": [{
                    "meta": { "symbol": "BTC-USD" },
                    "timestamp": [1735689600, 1735693200, 1735696800],
                    "indicators": { "quote": [quote] }
                }],
                "error": null
            }
        })
    }

    #[test]
    fn test_normalize_label_flattens_multi_level() {
        assert_eq!(normalize_label("('Close', 'BTC-USD')"), "close");
        assert_eq!(normalize_label("Adj Close"), "adj_close");
        assert_eq!(normalize_label("  Volume "), "volume");
        assert_eq!(normalize_label("open"), "open");
    }

    #[test]
    fn test_collector_with_config() {
        let collector = YahooChartCollector::with_config("https://custom.api.com/", 0);
        assert_eq!(collector.base_url, "https://custom.api.com");
    }

    #[tokio::test]
    async fn test_fetch_parses_bars_and_drops_incomplete_rows() {
        let mock_server = MockServer::start().await;
        let (start, end) = range();

        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/BTC-USD"))
            .and(query_param("interval", "1h"))
            .and(query_param("period1", "1735689600"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chart_body(serde_json::json!({
                "open": [100.0, 101.0, 102.0],
                "High": [110.0, 111.0, 112.0],
                "low": [90.0, 91.0, 92.0],
                "('Close', 'BTC-USD')": [105.0, null, 107.0],
                "Volume": [10.0, 11.0, null]
            }))))
            .mount(&mock_server)
            .await;

        let collector = YahooChartCollector::with_config(&mock_server.uri(), 100);
        let (bars, stats) = collector
            .fetch("BTC-USD", start, end, ChartInterval::OneHour)
            .await
            .unwrap();

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].timestamp, start);
        assert_eq!(bars[0].close, 105.0);
        assert_eq!(bars[0].high, 110.0);
        assert_eq!(bars[1].close, 107.0);
        assert_eq!(bars[1].volume, 0.0);
        assert_eq!(stats.incomplete_skipped, 1);
        assert_eq!(stats.total_records, 2);
    }

    #[tokio::test]
    async fn test_fetch_empty_result_is_not_an_error() {
        let mock_server = MockServer::start().await;
        let (start, end) = range();

        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/ETH-USD"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "chart": { "result": [], "error": null }
            })))
            .mount(&mock_server)
            .await;

        let collector = YahooChartCollector::with_config(&mock_server.uri(), 100);
        let bars = collector
            .fetch_bars("ETH-USD", start, end, ChartInterval::OneHour)
            .await
            .unwrap();

        assert!(bars.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_http_error() {
        let mock_server = MockServer::start().await;
        let (start, end) = range();

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
            .mount(&mock_server)
            .await;

        let collector = YahooChartCollector::with_config(&mock_server.uri(), 100);
        let err = collector
            .fetch("NOPE-USD", start, end, ChartInterval::OneHour)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_fetch_api_error_payload() {
        let mock_server = MockServer::start().await;
        let (start, end) = range();

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "chart": {
                    "result": null,
                    "error": { "code": "Not Found", "description": "No data found" }
                }
            })))
            .mount(&mock_server)
            .await;

        let collector = YahooChartCollector::with_config(&mock_server.uri(), 100);
        let result = collector
            .fetch("BTC-USD", start, end, ChartInterval::OneHour)
            .await;

        assert!(result.unwrap_err().to_string().contains("No data found"));
    }

    #[tokio::test]
    async fn test_fetch_rejects_inverted_range() {
        let (start, end) = range();
        let collector = YahooChartCollector::new();
        assert!(collector
            .fetch("BTC-USD", end, start, ChartInterval::OneHour)
            .await
            .is_err());
    }
}
