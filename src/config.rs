use anyhow::Context;

use crate::market_data::Interval;

// CONFIGURATION STRUCTS
// Built once in main and handed around immutably. Nothing is read from
// disk; the only external input is the bot token, which must come from
// the environment so it never lives in source.

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub token: String,
    /// Long-poll timeout handed to getUpdates, in seconds.
    pub poll_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct ScreenerConfig {
    pub intervals: Vec<Interval>,
    /// Provider range string for the indicator lookback, e.g. "6mo".
    pub history_range: String,
    pub ema_fast_period: usize,
    pub ema_slow_period: usize,
    pub stoch_period: usize,
    pub stoch_smoothing: usize,
    pub stoch_overbought: f64,
    pub stoch_oversold: f64,
}

#[derive(Debug, Clone)]
pub struct LiquidityConfig {
    /// Provider range string for the volume lookback, e.g. "3mo".
    pub history_range: String,
    pub min_avg_volume: f64,
    pub min_market_cap: f64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bot: BotConfig,
    /// The F&O watchlist; both pipelines run over this same list.
    pub tickers: Vec<String>,
    pub screener: ScreenerConfig,
    pub liquidity: LiquidityConfig,
}

fn default_tickers() -> Vec<String> {
    vec![
        "RELIANCE.NS".to_string(),
        "MARUTI.NS".to_string(),
        "KOTAKBANK.NS".to_string(),
        "INFY.NS".to_string(),
        "HDFCBANK.NS".to_string(),
        "TITAN.NS".to_string(),
        "TCS.NS".to_string(),
        "SBIN.NS".to_string(),
        "HINDUNILVR.NS".to_string(),
        "LT.NS".to_string(),
    ]
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            intervals: vec![Interval::FourHour, Interval::Daily],
            history_range: "6mo".to_string(),
            ema_fast_period: 20,
            ema_slow_period: 200,
            stoch_period: 14,
            stoch_smoothing: 3,
            // Deliberately asymmetric bands, kept as-is.
            stoch_overbought: 90.0,
            stoch_oversold: 40.0,
        }
    }
}

impl Default for LiquidityConfig {
    fn default() -> Self {
        Self {
            history_range: "3mo".to_string(),
            min_avg_volume: 1_000_000.0,
            min_market_cap: 40_000_000_000.0,
        }
    }
}

impl AppConfig {
    /// Assembles the runtime configuration. Everything except the token is
    /// a compiled-in default.
    pub fn from_env() -> anyhow::Result<Self> {
        let token = std::env::var("TELEGRAM_BOT_TOKEN")
            .context("TELEGRAM_BOT_TOKEN is not set")?;

        Ok(Self {
            bot: BotConfig {
                token,
                poll_timeout_secs: 30,
            },
            tickers: default_tickers(),
            screener: ScreenerConfig::default(),
            liquidity: LiquidityConfig::default(),
        })
    }
}
