use crate::config::ScreenerConfig;
use crate::indicators::{calculate_ema, calculate_stochastic};
use crate::market_data::{Bar, FETCH_BATCH_SIZE, Interval, MarketDataClient};
use futures::future::join_all;
use tracing::{debug, info};

/// Three-way classification shared by all three status columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Overbought,
    Oversold,
    Neutral,
}

/// Latest indicator values for one ticker+interval. `None` means the fetched
/// history was too short for that indicator.
#[derive(Debug, Clone, Copy)]
pub struct IndicatorValues {
    pub ema_fast: Option<f64>,
    pub ema_slow: Option<f64>,
    pub percent_k: Option<f64>,
    pub percent_d: Option<f64>,
}

#[derive(Debug, Clone, Copy)]
pub struct Classification {
    pub ema_status: Status,
    pub stoch_status: Status,
    pub combined_status: Status,
}

#[derive(Debug, Clone)]
pub struct ScreenResult {
    pub ticker: String,
    pub classification: Classification,
}

/// Qualifying tickers per category, in the order the report renders them.
#[derive(Debug, Default)]
pub struct CategoryBuckets {
    pub ema_overbought: Vec<String>,
    pub stoch_overbought: Vec<String>,
    pub both_overbought: Vec<String>,
    pub ema_oversold: Vec<String>,
    pub stoch_oversold: Vec<String>,
    pub both_oversold: Vec<String>,
}

pub fn compute_indicators(bars: &[Bar], config: &ScreenerConfig) -> IndicatorValues {
    let closes: Vec<f64> = bars.iter().map(|bar| bar.close).collect();
    let stochastic = calculate_stochastic(bars, config.stoch_period, config.stoch_smoothing);
    IndicatorValues {
        ema_fast: calculate_ema(&closes, config.ema_fast_period),
        ema_slow: calculate_ema(&closes, config.ema_slow_period),
        percent_k: stochastic.k,
        percent_d: stochastic.d,
    }
}

/// Maps the latest indicator values to the three statuses. Missing values
/// are treated as 0, so a too-short history classifies like a zero reading.
pub fn classify(values: &IndicatorValues, config: &ScreenerConfig) -> Classification {
    let ema_fast = values.ema_fast.unwrap_or(0.0);
    let ema_slow = values.ema_slow.unwrap_or(0.0);
    let percent_k = values.percent_k.unwrap_or(0.0);

    let ema_status = if ema_fast > ema_slow {
        Status::Overbought
    } else if ema_fast < ema_slow {
        Status::Oversold
    } else {
        Status::Neutral
    };

    let stoch_status = if percent_k > config.stoch_overbought {
        Status::Overbought
    } else if percent_k < config.stoch_oversold {
        Status::Oversold
    } else {
        Status::Neutral
    };

    let combined_status = if ema_status == Status::Overbought && stoch_status == Status::Overbought
    {
        Status::Overbought
    } else if ema_status == Status::Oversold && stoch_status == Status::Oversold {
        Status::Oversold
    } else {
        Status::Neutral
    };

    Classification {
        ema_status,
        stoch_status,
        combined_status,
    }
}

async fn screen_one(
    client: &MarketDataClient,
    ticker: &str,
    interval: Interval,
    config: &ScreenerConfig,
) -> Option<ScreenResult> {
    let bars = client
        .fetch_history(ticker, interval, &config.history_range)
        .await?;
    let values = compute_indicators(&bars, config);
    debug!(
        ticker,
        interval = %interval,
        ema_fast = ?values.ema_fast,
        ema_slow = ?values.ema_slow,
        percent_k = ?values.percent_k,
        percent_d = ?values.percent_d,
        "latest indicator values"
    );
    Some(ScreenResult {
        ticker: ticker.to_string(),
        classification: classify(&values, config),
    })
}

/// Runs the screener over every configured interval. Tickers are fetched in
/// bounded concurrent batches; a ticker whose fetch fails drops out of the
/// pass without affecting the rest.
pub async fn run_screener(
    client: &MarketDataClient,
    tickers: &[String],
    config: &ScreenerConfig,
) -> Vec<(Interval, CategoryBuckets)> {
    let mut sections = Vec::with_capacity(config.intervals.len());
    for &interval in &config.intervals {
        let mut results = Vec::with_capacity(tickers.len());
        for batch in tickers.chunks(FETCH_BATCH_SIZE) {
            let tasks: Vec<_> = batch
                .iter()
                .map(|ticker| screen_one(client, ticker, interval, config))
                .collect();
            results.extend(join_all(tasks).await.into_iter().flatten());
        }
        info!(
            interval = %interval,
            screened = results.len(),
            watchlist = tickers.len(),
            "screener pass complete"
        );
        sections.push((interval, bucketize(&results)));
    }
    sections
}

pub fn bucketize(results: &[ScreenResult]) -> CategoryBuckets {
    let mut buckets = CategoryBuckets::default();
    for result in results {
        match result.classification.ema_status {
            Status::Overbought => buckets.ema_overbought.push(result.ticker.clone()),
            Status::Oversold => buckets.ema_oversold.push(result.ticker.clone()),
            Status::Neutral => {}
        }
        match result.classification.stoch_status {
            Status::Overbought => buckets.stoch_overbought.push(result.ticker.clone()),
            Status::Oversold => buckets.stoch_oversold.push(result.ticker.clone()),
            Status::Neutral => {}
        }
        match result.classification.combined_status {
            Status::Overbought => buckets.both_overbought.push(result.ticker.clone()),
            Status::Oversold => buckets.both_oversold.push(result.ticker.clone()),
            Status::Neutral => {}
        }
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(ema_fast: f64, ema_slow: f64, percent_k: f64) -> IndicatorValues {
        IndicatorValues {
            ema_fast: Some(ema_fast),
            ema_slow: Some(ema_slow),
            percent_k: Some(percent_k),
            percent_d: None,
        }
    }

    fn config() -> ScreenerConfig {
        ScreenerConfig::default()
    }

    #[test]
    fn strong_trend_classifies_overbought() {
        let result = classify(&values(110.0, 100.0, 95.0), &config());
        assert_eq!(result.ema_status, Status::Overbought);
        assert_eq!(result.stoch_status, Status::Overbought);
        assert_eq!(result.combined_status, Status::Overbought);
    }

    #[test]
    fn weak_trend_classifies_oversold() {
        let result = classify(&values(90.0, 100.0, 30.0), &config());
        assert_eq!(result.ema_status, Status::Oversold);
        assert_eq!(result.stoch_status, Status::Oversold);
        assert_eq!(result.combined_status, Status::Oversold);
    }

    #[test]
    fn flat_trend_classifies_neutral() {
        let result = classify(&values(100.0, 100.0, 50.0), &config());
        assert_eq!(result.ema_status, Status::Neutral);
        assert_eq!(result.stoch_status, Status::Neutral);
        assert_eq!(result.combined_status, Status::Neutral);
    }

    #[test]
    fn combined_needs_both_sides_to_agree() {
        // Overbought trend with a mid-band oscillator: no combined signal.
        let result = classify(&values(110.0, 100.0, 50.0), &config());
        assert_eq!(result.ema_status, Status::Overbought);
        assert_eq!(result.stoch_status, Status::Neutral);
        assert_eq!(result.combined_status, Status::Neutral);

        // Mixed signals never combine either.
        let result = classify(&values(110.0, 100.0, 30.0), &config());
        assert_eq!(result.combined_status, Status::Neutral);
    }

    #[test]
    fn band_edges_are_exclusive() {
        let result = classify(&values(110.0, 100.0, 90.0), &config());
        assert_eq!(result.stoch_status, Status::Neutral);
        let result = classify(&values(110.0, 100.0, 40.0), &config());
        assert_eq!(result.stoch_status, Status::Neutral);
    }

    #[test]
    fn missing_values_classify_as_zero() {
        // No %K reading at all: treated as 0, which sits below the oversold
        // band.
        let result = classify(
            &IndicatorValues {
                ema_fast: Some(110.0),
                ema_slow: Some(100.0),
                percent_k: None,
                percent_d: None,
            },
            &config(),
        );
        assert_eq!(result.ema_status, Status::Overbought);
        assert_eq!(result.stoch_status, Status::Oversold);
        assert_eq!(result.combined_status, Status::Neutral);
    }

    #[test]
    fn bucketize_groups_survivors_only() {
        // 3 of 10 tickers failed to fetch upstream; the remaining 7 must all
        // land in their categories with nothing extra.
        let overbought = Classification {
            ema_status: Status::Overbought,
            stoch_status: Status::Overbought,
            combined_status: Status::Overbought,
        };
        let oversold = Classification {
            ema_status: Status::Oversold,
            stoch_status: Status::Oversold,
            combined_status: Status::Oversold,
        };
        let neutral = Classification {
            ema_status: Status::Neutral,
            stoch_status: Status::Neutral,
            combined_status: Status::Neutral,
        };

        let results: Vec<ScreenResult> = [
            ("RELIANCE.NS", overbought),
            ("MARUTI.NS", overbought),
            ("KOTAKBANK.NS", oversold),
            ("INFY.NS", oversold),
            ("HDFCBANK.NS", oversold),
            ("TITAN.NS", neutral),
            ("TCS.NS", neutral),
        ]
        .into_iter()
        .map(|(ticker, classification)| ScreenResult {
            ticker: ticker.to_string(),
            classification,
        })
        .collect();

        let buckets = bucketize(&results);
        assert_eq!(buckets.ema_overbought, vec!["RELIANCE.NS", "MARUTI.NS"]);
        assert_eq!(buckets.both_overbought, vec!["RELIANCE.NS", "MARUTI.NS"]);
        assert_eq!(
            buckets.ema_oversold,
            vec!["KOTAKBANK.NS", "INFY.NS", "HDFCBANK.NS"]
        );
        assert_eq!(
            buckets.both_oversold,
            vec!["KOTAKBANK.NS", "INFY.NS", "HDFCBANK.NS"]
        );
        assert_eq!(buckets.stoch_overbought.len(), 2);
        assert_eq!(buckets.stoch_oversold.len(), 3);
    }
}
