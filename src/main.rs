mod bot;
mod config;
mod indicators;
mod liquidity;
mod market_data;
mod report;
mod screener;
mod telegram;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = config::AppConfig::from_env()?;
    let bot = bot::Bot::new(config)?;
    bot.run().await
}
