//! Telegram Bot API over plain HTTPS: channel publishing and long-polling for commands.

use crate::config::toml_config::TelegramConfig;
use crate::domain::model::{FormattedMessage, IncomingMessage};
use crate::domain::ports::{ChatTransport, Publisher};
use crate::utils::error::{DealError, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";
pub const MAX_CAPTION_CHARS: usize = 1024;
const PARSE_MODE: &str = "MarkdownV2";

#[derive(Debug, Deserialize)]
pub struct TelegramResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<i64>,
    pub parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseParameters {
    pub retry_after: Option<u64>,
}

impl<T> TelegramResponse<T> {
    pub fn retry_after(&self) -> Option<u64> {
        self.parameters.as_ref().and_then(|p| p.retry_after)
    }

    fn failure(&self) -> DealError {
        DealError::TelegramApi {
            code: self.error_code.unwrap_or_default(),
            description: self
                .description
                .clone()
                .unwrap_or_else(|| "unknown error".to_string()),
        }
    }

    pub fn into_result(self) -> Result<T> {
        if !self.ok {
            return Err(self.failure());
        }
        let failure = self.failure();
        self.result.ok_or(failure)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct SendPhoto<'a> {
    chat_id: &'a str,
    photo: &'a str,
    caption: &'a str,
    parse_mode: &'a str,
}

#[derive(Debug, Serialize)]
struct GetUpdates<'a> {
    offset: i64,
    timeout: u64,
    allowed_updates: &'a [&'a str],
}

#[derive(Debug, Clone)]
pub struct TelegramApi {
    client: Client,
    base: String,
    timeout: Duration,
}

impl TelegramApi {
    pub fn new(api_base: &str, bot_token: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base: format!("{}/bot{}", api_base.trim_end_matches('/'), bot_token),
            timeout,
        })
    }

    pub fn from_config(config: &TelegramConfig) -> Result<Self> {
        Self::new(
            config.api_base(),
            &config.bot_token,
            Duration::from_secs(config.timeout_seconds()),
        )
    }

    /// Sends one Bot API call. Only transport failures are errors here; API-level
    /// failures come back as `ok: false` in the response.
    pub async fn call<T, B>(
        &self,
        method: &str,
        body: &B,
        timeout: Option<Duration>,
    ) -> Result<TelegramResponse<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        tracing::debug!("Calling Telegram method {}", method);
        let mut request = self
            .client
            .post(format!("{}/{}", self.base, method))
            .json(body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        // reqwest errors carry the URL, which contains the bot token.
        let response = request
            .send()
            .await
            .map_err(|e| DealError::Http(e.without_url()))?;
        let status = response.status();
        let reply: TelegramResponse<T> = response
            .json()
            .await
            .map_err(|e| DealError::Http(e.without_url()))?;

        if !reply.ok {
            tracing::debug!("Telegram {} failed with HTTP {}", method, status);
        }
        Ok(reply)
    }

    pub async fn get_me(&self) -> Result<User> {
        self.call::<User, _>("getMe", &serde_json::json!({}), None)
            .await?
            .into_result()
    }

    pub async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        parse_mode: Option<&str>,
    ) -> Result<TelegramResponse<serde_json::Value>> {
        self.call(
            "sendMessage",
            &SendMessage {
                chat_id,
                text,
                parse_mode,
            },
            None,
        )
        .await
    }

    pub async fn send_photo(
        &self,
        chat_id: &str,
        photo: &str,
        caption: &str,
    ) -> Result<TelegramResponse<serde_json::Value>> {
        self.call(
            "sendPhoto",
            &SendPhoto {
                chat_id,
                photo,
                caption,
                parse_mode: PARSE_MODE,
            },
            None,
        )
        .await
    }

    pub async fn get_updates(&self, offset: i64, poll_timeout: u64) -> Result<Vec<Update>> {
        // The HTTP request has to outlive the server-side long poll.
        let timeout = self.timeout + Duration::from_secs(poll_timeout);
        self.call::<Vec<Update>, _>(
            "getUpdates",
            &GetUpdates {
                offset,
                timeout: poll_timeout,
                allowed_updates: &["message"],
            },
            Some(timeout),
        )
        .await?
        .into_result()
    }
}

/// Posts formatted deals to the configured channel, at most one message per
/// `min_interval`.
pub struct TelegramPublisher {
    api: TelegramApi,
    channel_id: String,
    send_photos: bool,
    min_interval: Duration,
    last_sent: Option<Instant>,
}

impl TelegramPublisher {
    pub fn new(
        api: TelegramApi,
        channel_id: impl Into<String>,
        send_photos: bool,
        min_interval: Duration,
    ) -> Self {
        Self {
            api,
            channel_id: channel_id.into(),
            send_photos,
            min_interval,
            last_sent: None,
        }
    }

    pub fn from_config(api: TelegramApi, config: &TelegramConfig) -> Self {
        Self::new(
            api,
            config.channel_id.clone(),
            config.send_photos.unwrap_or(false),
            Duration::from_millis(config.min_interval_ms()),
        )
    }

    async fn pace(&self) {
        if let Some(last) = self.last_sent {
            tokio::time::sleep_until(last + self.min_interval).await;
        }
    }
}

#[async_trait::async_trait]
impl Publisher for TelegramPublisher {
    async fn publish(&mut self, message: &FormattedMessage) -> Result<()> {
        self.pace().await;

        let photo = message
            .image_url
            .as_deref()
            .filter(|_| self.send_photos && message.text.chars().count() <= MAX_CAPTION_CHARS);

        let sent = match photo {
            Some(photo) => {
                self.api
                    .send_photo(&self.channel_id, photo, &message.text)
                    .await
            }
            None => {
                self.api
                    .send_message(&self.channel_id, &message.text, Some(PARSE_MODE))
                    .await
            }
        };
        self.last_sent = Some(Instant::now());

        let response = sent.map_err(|e| DealError::PublishFailed {
            reason: e.to_string(),
            retry_after: None,
        })?;
        if !response.ok {
            return Err(DealError::PublishFailed {
                reason: response.failure().to_string(),
                retry_after: response.retry_after(),
            });
        }

        tracing::debug!("Published {} to {}", message.product_id, self.channel_id);
        Ok(())
    }
}

/// Long-polls `getUpdates` for operator commands.
pub struct TelegramUpdates {
    api: TelegramApi,
    offset: i64,
    poll_timeout: u64,
}

impl TelegramUpdates {
    pub fn new(api: TelegramApi, poll_timeout: u64) -> Self {
        Self {
            api,
            offset: 0,
            poll_timeout,
        }
    }
}

#[async_trait::async_trait]
impl ChatTransport for TelegramUpdates {
    async fn next_messages(&mut self) -> Result<Vec<IncomingMessage>> {
        let updates = self.api.get_updates(self.offset, self.poll_timeout).await?;

        let mut messages = Vec::with_capacity(updates.len());
        for update in updates {
            self.offset = update.update_id + 1;
            let Some(message) = update.message else {
                continue;
            };
            let Some(text) = message.text else {
                continue;
            };
            messages.push(IncomingMessage {
                chat_id: message.chat.id,
                user_id: message.from.map(|user| user.id),
                text,
            });
        }
        Ok(messages)
    }

    async fn reply(&self, chat_id: i64, text: &str) -> Result<()> {
        self.api
            .send_message(&chat_id.to_string(), text, None)
            .await?
            .into_result()
            .map(|_| ())
    }
}
