use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tracing::warn;

const BASE_URL: &str = "https://query1.finance.yahoo.com";
// The chart endpoint rejects requests without a browser-style UA.
const USER_AGENT: &str = "Mozilla/5.0";
// Bounds the worst case of a full screener pass; a slow ticker is skipped,
// not waited for.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Tickers fetched concurrently per batch.
pub const FETCH_BATCH_SIZE: usize = 5;

/// Sampling interval of the requested history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interval {
    FourHour,
    Daily,
}

impl Interval {
    /// Wire code understood by the provider.
    pub fn code(&self) -> &'static str {
        match self {
            Interval::FourHour => "4h",
            Interval::Daily => "1d",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interval::FourHour => write!(f, "4H"),
            Interval::Daily => write!(f, "1D"),
        }
    }
}

/// One OHLCV bar. Series are ordered by timestamp ascending.
#[derive(Debug, Clone)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

// --- v8 chart response ---

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

// Every column can carry nulls for halted or partial bars.
#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

// --- v10 quoteSummary response ---

#[derive(Debug, Deserialize)]
struct QuoteSummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: QuoteSummary,
}

#[derive(Debug, Deserialize)]
struct QuoteSummary {
    result: Option<Vec<SummaryResult>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct SummaryResult {
    price: Option<PriceModule>,
}

#[derive(Debug, Deserialize)]
struct PriceModule {
    #[serde(rename = "marketCap")]
    market_cap: Option<FormattedValue>,
}

#[derive(Debug, Deserialize)]
struct FormattedValue {
    raw: Option<f64>,
}

/// Thin typed client over the provider's public endpoints.
///
/// Both fetchers share one failure contract: any problem — transport error,
/// rejected status, unreadable body, provider-reported error, empty series —
/// is logged and surfaces as `None`. Callers skip the ticker and keep going;
/// one bad ticker never aborts a batch.
pub struct MarketDataClient {
    client: Client,
}

impl MarketDataClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }

    /// Fetches the OHLCV history for one ticker over the given range.
    pub async fn fetch_history(
        &self,
        ticker: &str,
        interval: Interval,
        range: &str,
    ) -> Option<Vec<Bar>> {
        let url = format!("{}/v8/finance/chart/{}", BASE_URL, ticker);
        let response = match self
            .client
            .get(&url)
            .query(&[("interval", interval.code()), ("range", range)])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(ticker, interval = %interval, error = %e, "history request failed");
                return None;
            }
        };

        if !response.status().is_success() {
            warn!(ticker, interval = %interval, status = %response.status(), "history request rejected");
            return None;
        }

        let parsed: ChartResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(ticker, interval = %interval, error = %e, "history response unreadable");
                return None;
            }
        };

        if let Some(err) = parsed.chart.error {
            warn!(ticker, code = %err.code, description = %err.description, "provider error");
            return None;
        }

        let result = match parsed.chart.result.and_then(|r| r.into_iter().next()) {
            Some(result) => result,
            None => {
                warn!(ticker, interval = %interval, "no chart data");
                return None;
            }
        };

        let bars = bars_from(result);
        if bars.is_empty() {
            warn!(ticker, interval = %interval, "empty history");
            return None;
        }
        Some(bars)
    }

    /// Reads the market capitalization from the price summary module.
    pub async fn fetch_market_cap(&self, ticker: &str) -> Option<f64> {
        let url = format!("{}/v10/finance/quoteSummary/{}", BASE_URL, ticker);
        let response = match self
            .client
            .get(&url)
            .query(&[("modules", "price")])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(ticker, error = %e, "summary request failed");
                return None;
            }
        };

        if !response.status().is_success() {
            warn!(ticker, status = %response.status(), "summary request rejected");
            return None;
        }

        let parsed: QuoteSummaryResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(ticker, error = %e, "summary response unreadable");
                return None;
            }
        };

        if let Some(err) = parsed.quote_summary.error {
            warn!(ticker, code = %err.code, description = %err.description, "provider error");
            return None;
        }

        let market_cap = parsed
            .quote_summary
            .result
            .and_then(|r| r.into_iter().next())
            .and_then(|r| r.price)
            .and_then(|p| p.market_cap)
            .and_then(|m| m.raw);
        if market_cap.is_none() {
            warn!(ticker, "no market cap in summary");
        }
        market_cap
    }
}

/// Zips the timestamp column with the quote columns, dropping any bar with
/// a missing field. Order stays as delivered (ascending).
fn bars_from(result: ChartResult) -> Vec<Bar> {
    let quote = match result.indicators.quote.into_iter().next() {
        Some(quote) => quote,
        None => return Vec::new(),
    };

    let mut bars = Vec::with_capacity(result.timestamp.len());
    for (i, &ts) in result.timestamp.iter().enumerate() {
        let open = quote.open.get(i).and_then(|v| *v);
        let high = quote.high.get(i).and_then(|v| *v);
        let low = quote.low.get(i).and_then(|v| *v);
        let close = quote.close.get(i).and_then(|v| *v);
        let volume = quote.volume.get(i).and_then(|v| *v);

        if let (Some(open), Some(high), Some(low), Some(close), Some(volume)) =
            (open, high, low, close, volume)
        {
            let timestamp = match Utc.timestamp_opt(ts, 0).single() {
                Some(timestamp) => timestamp,
                None => continue,
            };
            bars.push(Bar {
                timestamp,
                open,
                high,
                low,
                close,
                volume,
            });
        }
    }
    bars
}
