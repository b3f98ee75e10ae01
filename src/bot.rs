use crate::config::AppConfig;
use crate::market_data::MarketDataClient;
use crate::telegram::{
    BotClient, CallbackQuery, InlineKeyboardButton, InlineKeyboardMarkup, Message, Update,
};
use crate::{liquidity, report, screener};
use anyhow::Result;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const WELCOME_TEXT: &str = "Welcome to the Stock Screener Bot!";
const TRANSPORT_BACKOFF: Duration = Duration::from_secs(5);

/// The two actions reachable from the keyboard.
#[derive(Debug, Clone, Copy)]
enum Action {
    Screen,
    HighLiquidity,
}

impl Action {
    fn from_callback_data(data: &str) -> Option<Self> {
        match data {
            "screen" => Some(Self::Screen),
            "high_liq" => Some(Self::HighLiquidity),
            _ => None,
        }
    }
}

fn main_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: vec![
            vec![InlineKeyboardButton {
                text: "OverBS Screener".to_string(),
                callback_data: "screen".to_string(),
            }],
            vec![InlineKeyboardButton {
                text: "High Liq F&O".to_string(),
                callback_data: "high_liq".to_string(),
            }],
        ],
    }
}

pub struct Bot {
    telegram: BotClient,
    market: MarketDataClient,
    config: AppConfig,
}

impl Bot {
    pub fn new(config: AppConfig) -> Result<Self> {
        Ok(Self {
            telegram: BotClient::new(&config.bot.token)?,
            market: MarketDataClient::new()?,
            config,
        })
    }

    /// Long-polling dispatch loop. Updates are handled one at a time, so a
    /// second button press waits until the current reply is out. Transport
    /// errors back off and retry; handler errors are logged and dropped.
    pub async fn run(&self) -> Result<()> {
        info!("bot started, polling for updates");
        let mut offset = 0i64;
        loop {
            let updates = match self
                .telegram
                .get_updates(offset, self.config.bot.poll_timeout_secs)
                .await
            {
                Ok(updates) => updates,
                Err(e) => {
                    warn!(error = %e, "getUpdates failed, backing off");
                    tokio::time::sleep(TRANSPORT_BACKOFF).await;
                    continue;
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);
                if let Err(e) = self.handle_update(update).await {
                    error!(error = %e, "update handler failed");
                }
            }
        }
    }

    async fn handle_update(&self, update: Update) -> Result<()> {
        if let Some(message) = update.message {
            return self.handle_message(message).await;
        }
        if let Some(query) = update.callback_query {
            return self.handle_callback(query).await;
        }
        debug!(update_id = update.update_id, "ignoring unrecognized update");
        Ok(())
    }

    async fn handle_message(&self, message: Message) -> Result<()> {
        match message.text.as_deref() {
            Some("/start") => {
                self.telegram
                    .send_message(message.chat.id, WELCOME_TEXT, Some(&main_keyboard()))
                    .await?;
            }
            other => {
                debug!(chat_id = message.chat.id, text = ?other, "ignoring message");
            }
        }
        Ok(())
    }

    async fn handle_callback(&self, query: CallbackQuery) -> Result<()> {
        self.telegram.answer_callback_query(&query.id).await?;

        let action = match query.data.as_deref().and_then(Action::from_callback_data) {
            Some(action) => action,
            None => {
                debug!(data = ?query.data, "ignoring unknown callback");
                return Ok(());
            }
        };
        let message = match query.message {
            Some(message) => message,
            None => {
                debug!("callback without a reachable source message");
                return Ok(());
            }
        };

        let report = match action {
            Action::Screen => {
                info!(chat_id = message.chat.id, "running screener");
                let sections = screener::run_screener(
                    &self.market,
                    &self.config.tickers,
                    &self.config.screener,
                )
                .await;
                report::format_screener_report(&sections)
            }
            Action::HighLiquidity => {
                info!(chat_id = message.chat.id, "running liquidity filter");
                let records = liquidity::run_liquidity_filter(
                    &self.market,
                    &self.config.tickers,
                    &self.config.liquidity,
                )
                .await;
                report::format_liquidity_report(&records)
            }
        };

        self.telegram
            .edit_message_text(message.chat.id, message.message_id, &report)
            .await?;
        Ok(())
    }
}
