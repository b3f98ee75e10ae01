use crate::config::LiquidityConfig;
use crate::market_data::{Bar, FETCH_BATCH_SIZE, Interval, MarketDataClient};
use futures::future::join_all;
use tracing::info;

/// One ticker's liquidity probe: mean daily volume over the lookback window
/// plus the current market capitalization, both in unscaled source units.
#[derive(Debug, Clone)]
pub struct LiquidityRecord {
    pub ticker: String,
    pub avg_volume: f64,
    pub market_cap: f64,
    pub qualifies: bool,
}

/// Strict thresholds on both axes; the Cr display scaling never feeds back
/// into this test.
pub fn assess(avg_volume: f64, market_cap: f64, config: &LiquidityConfig) -> bool {
    avg_volume > config.min_avg_volume && market_cap > config.min_market_cap
}

pub fn average_volume(bars: &[Bar]) -> f64 {
    if bars.is_empty() {
        return 0.0;
    }
    let total: u64 = bars.iter().map(|bar| bar.volume).sum();
    total as f64 / bars.len() as f64
}

async fn probe_one(
    client: &MarketDataClient,
    ticker: &str,
    config: &LiquidityConfig,
) -> Option<LiquidityRecord> {
    let bars = client
        .fetch_history(ticker, Interval::Daily, &config.history_range)
        .await?;
    let market_cap = client.fetch_market_cap(ticker).await?;
    let avg_volume = average_volume(&bars);
    Some(LiquidityRecord {
        ticker: ticker.to_string(),
        avg_volume,
        market_cap,
        qualifies: assess(avg_volume, market_cap, config),
    })
}

/// Probes the whole watchlist in bounded concurrent batches. Tickers whose
/// data cannot be fetched are skipped; the rest are returned with their
/// qualification flag set.
pub async fn run_liquidity_filter(
    client: &MarketDataClient,
    tickers: &[String],
    config: &LiquidityConfig,
) -> Vec<LiquidityRecord> {
    let mut records = Vec::with_capacity(tickers.len());
    for batch in tickers.chunks(FETCH_BATCH_SIZE) {
        let tasks: Vec<_> = batch
            .iter()
            .map(|ticker| probe_one(client, ticker, config))
            .collect();
        records.extend(join_all(tasks).await.into_iter().flatten());
    }
    info!(
        probed = records.len(),
        qualifying = records.iter().filter(|r| r.qualifies).count(),
        watchlist = tickers.len(),
        "liquidity pass complete"
    );
    records
}
