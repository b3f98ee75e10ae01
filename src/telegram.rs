use anyhow::{Context, Result, bail};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;

const API_BASE: &str = "https://api.telegram.org";
// Must exceed the long-poll timeout or getUpdates would be cut off early.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

/// Hard cap on a message body, imposed by the platform.
pub const MAX_MESSAGE_LEN: usize = 4096;

// --- Bot API models (the subset this bot consumes) ---

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub data: Option<String>,
    /// The message carrying the pressed keyboard, if still reachable.
    pub message: Option<Message>,
}

#[derive(Debug, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

#[derive(Debug, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

/// Cuts a message down to the platform limit without splitting a char.
pub fn truncate_message(text: &str) -> &str {
    match text.char_indices().nth(MAX_MESSAGE_LEN) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Minimal typed client for the Bot API methods this bot needs.
pub struct BotClient {
    client: Client,
    base: String,
}

impl BotClient {
    pub fn new(token: &str) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base: format!("{}/bot{}", API_BASE, token),
        })
    }

    /// Long-polls for updates past `offset`.
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>> {
        self.call(
            "getUpdates",
            &json!({
                "offset": offset,
                "timeout": timeout_secs,
                "allowed_updates": ["message", "callback_query"],
            }),
        )
        .await
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> Result<Message> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": truncate_message(text),
            "parse_mode": "Markdown",
        });
        if let Some(keyboard) = keyboard {
            body["reply_markup"] = serde_json::to_value(keyboard)?;
        }
        self.call("sendMessage", &body).await
    }

    pub async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
    ) -> Result<Message> {
        self.call(
            "editMessageText",
            &json!({
                "chat_id": chat_id,
                "message_id": message_id,
                "text": truncate_message(text),
                "parse_mode": "Markdown",
            }),
        )
        .await
    }

    /// Acknowledges a callback so the client stops showing its spinner.
    pub async fn answer_callback_query(&self, callback_query_id: &str) -> Result<bool> {
        self.call(
            "answerCallbackQuery",
            &json!({ "callback_query_id": callback_query_id }),
        )
        .await
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: &Value) -> Result<T> {
        let url = format!("{}/{}", self.base, method);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("{} request failed", method))?;

        let parsed: ApiResponse<T> = response
            .json()
            .await
            .with_context(|| format!("{} response unreadable", method))?;

        if !parsed.ok {
            bail!(
                "{} rejected: {}",
                method,
                parsed.description.as_deref().unwrap_or("no description")
            );
        }
        parsed
            .result
            .with_context(|| format!("{} returned no result", method))
    }
}
