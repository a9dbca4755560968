//! Telegram adapter

mod session;

pub use session::SessionFile;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use crate::application::errors::BotError;
use crate::domain::entities::{CommandRegistry, Message, Profile, UserKind};
use crate::domain::traits::{Bot, BotInfo};
use crate::infrastructure::config::TelegramConfig;

/// Telegram update type
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<ChatMessage>,
    pub channel_post: Option<ChatMessage>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatMessage {
    pub message_id: i64,
    pub date: i64,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub chat_type: String,
    pub title: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl Chat {
    /// The peer a message came from, described the way the user store wants it
    pub fn profile(&self) -> Profile {
        Profile {
            external_id: self.id,
            kind: UserKind::from_chat_type(&self.chat_type),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            title: self.title.clone(),
            username: self.username.clone(),
        }
    }
}

impl Update {
    /// Text message carried by this update, if any
    pub fn into_message(self) -> Option<Message> {
        let msg = self.message.or(self.channel_post)?;
        let text = msg.text?;
        let timestamp = DateTime::<Utc>::from_timestamp(msg.date, 0).unwrap_or_else(Utc::now);

        Some(
            Message::new(msg.chat.id, text)
                .with_id(msg.message_id)
                .with_sender(msg.chat.profile())
                .with_timestamp(timestamp),
        )
    }
}

/// Bot API response envelope
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

/// Telegram bot adapter
pub struct TelegramAdapter {
    token: String,
    api_url: String,
    poll_timeout: u64,
    client: Client,
    info: Mutex<BotInfo>,
    offset: AtomicI64,
    session: SessionFile,
}

impl TelegramAdapter {
    pub fn new(token: impl Into<String>, config: &TelegramConfig) -> Self {
        let session = SessionFile::new(&config.session_file);
        let offset = session.load_offset();
        if offset > 0 {
            tracing::debug!("Resuming updates from offset {}", offset);
        }

        Self {
            token: token.into(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            poll_timeout: config.poll_timeout_seconds,
            client: Client::new(),
            info: Mutex::new(BotInfo {
                id: "unknown".to_string(),
                name: "greeter-bot".to_string(),
                username: "greeter_bot".to_string(),
            }),
            offset: AtomicI64::new(offset),
            session,
        }
    }

    /// Get the API URL for a method
    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.token, method)
    }

    /// POST a Bot API method and unwrap its envelope
    async fn call<T, B>(&self, method: &str, body: &B) -> Result<T, BotError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self
            .client
            .post(self.api_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| BotError::Network(e.without_url().to_string()))?;

        let status = response.status();
        let data: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| BotError::Parse(e.without_url().to_string()))?;

        match (data.ok, data.result) {
            (true, Some(result)) => Ok(result),
            _ => {
                let description = data.description.unwrap_or_else(|| status.to_string());
                if status == StatusCode::UNAUTHORIZED || status == StatusCode::NOT_FOUND {
                    Err(BotError::Auth(format!("{}: {}", method, description)))
                } else {
                    Err(BotError::Network(format!("{}: {}", method, description)))
                }
            }
        }
    }

    /// Get updates from Telegram using getUpdates API
    pub async fn get_updates(&self, offset: i64, timeout: u64) -> Result<Vec<Update>, BotError> {
        #[derive(Serialize)]
        struct GetUpdatesRequest<'a> {
            offset: i64,
            timeout: u64,
            allowed_updates: &'a [&'a str],
        }

        self.call(
            "getUpdates",
            &GetUpdatesRequest {
                offset,
                timeout,
                allowed_updates: &["message", "channel_post"],
            },
        )
        .await
    }

    /// Get the next update offset
    pub fn get_next_offset(current: i64, updates: &[Update]) -> i64 {
        updates
            .iter()
            .map(|u| u.update_id + 1)
            .max()
            .unwrap_or(current)
            .max(current)
    }

    /// Send a message, trying Markdown first and falling back to plain text
    pub async fn send_message_api(&self, chat_id: i64, reply_to: Option<i64>, text: &str) -> Result<String, BotError> {
        match self.send_message_with_format(chat_id, reply_to, text, Some("Markdown")).await {
            Ok(result) => Ok(result),
            Err(e) => {
                tracing::warn!("Markdown failed, using plain text: {}", e);
                self.send_message_with_format(chat_id, reply_to, text, None).await
            }
        }
    }

    /// Send a message with specific parse mode
    pub async fn send_message_with_format(
        &self,
        chat_id: i64,
        reply_to: Option<i64>,
        text: &str,
        parse_mode: Option<&str>,
    ) -> Result<String, BotError> {
        #[derive(Serialize)]
        struct SendMessageRequest<'a> {
            chat_id: i64,
            text: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            reply_to_message_id: Option<i64>,
            #[serde(skip_serializing_if = "Option::is_none")]
            parse_mode: Option<&'a str>,
        }

        #[derive(Deserialize)]
        struct MessageResult {
            message_id: i64,
        }

        let sent: MessageResult = self
            .call(
                "sendMessage",
                &SendMessageRequest {
                    chat_id,
                    text,
                    reply_to_message_id: reply_to,
                    parse_mode,
                },
            )
            .await?;

        Ok(sent.message_id.to_string())
    }

    /// Publish the registered commands in the Telegram command menu
    pub async fn register_commands(&self, registry: &CommandRegistry) -> Result<(), BotError> {
        #[derive(Serialize)]
        struct BotCommand {
            command: String,
            description: String,
        }

        #[derive(Serialize)]
        struct SetMyCommandsRequest {
            commands: Vec<BotCommand>,
        }

        let commands = registry
            .list_all()
            .map(|(name, factory)| BotCommand {
                command: name.to_string(),
                description: factory().usage().lines().next().unwrap_or(name).trim().to_string(),
            })
            .collect();

        let _: bool = self
            .call("setMyCommands", &SetMyCommandsRequest { commands })
            .await?;

        tracing::info!("Registered bot commands with Telegram");
        Ok(())
    }
}

#[async_trait]
impl Bot for TelegramAdapter {
    async fn start(&self) -> Result<BotInfo, BotError> {
        #[derive(Deserialize)]
        struct Me {
            id: i64,
            first_name: String,
            username: Option<String>,
        }

        tracing::debug!("Trying to connect using bot token");
        let me: Me = self.call("getMe", &serde_json::json!({})).await?;

        let info = BotInfo {
            id: me.id.to_string(),
            username: me.username.unwrap_or_else(|| me.first_name.clone()),
            name: me.first_name,
        };
        *self
            .info
            .lock()
            .map_err(|_| BotError::Internal("bot info lock poisoned".to_string()))? = info.clone();

        tracing::info!("Using bot authentication. Only bot messages are recognized.");
        Ok(info)
    }

    async fn next_messages(&self) -> Result<Option<Vec<Message>>, BotError> {
        let current = self.offset.load(Ordering::SeqCst);
        let updates = self.get_updates(current, self.poll_timeout).await?;

        let next = Self::get_next_offset(current, &updates);
        if next != current {
            self.offset.store(next, Ordering::SeqCst);
            if let Err(e) = self.session.save_offset(next) {
                tracing::warn!("Failed to save session: {}", e);
            }
        }

        Ok(Some(updates.into_iter().filter_map(Update::into_message).collect()))
    }

    async fn reply(&self, to: &Message, text: &str) -> Result<String, BotError> {
        tracing::debug!("Sending to {}: {}", to.chat_id, text);
        let reply_to = (to.id > 0).then_some(to.id);
        self.send_message_api(to.chat_id, reply_to, text).await
    }

    fn bot_info(&self) -> BotInfo {
        match self.info.lock() {
            Ok(info) => info.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::Config;

    fn update(json: serde_json::Value) -> Update {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn private_message_becomes_individual_sender() {
        let message = update(serde_json::json!({
            "update_id": 10,
            "message": {
                "message_id": 3,
                "date": 1_700_000_000,
                "chat": {"id": 42, "type": "private", "first_name": "Ada", "last_name": "Lovelace"},
                "from": {"id": 42, "is_bot": false, "first_name": "Ada"},
                "text": "/start"
            }
        }))
        .into_message()
        .unwrap();

        assert_eq!(message.id, 3);
        assert_eq!(message.chat_id, 42);
        assert_eq!(message.text, "/start");
        assert_eq!(message.timestamp.timestamp(), 1_700_000_000);

        let sender = message.sender.unwrap();
        assert_eq!(sender.kind, UserKind::Individual);
        assert_eq!(sender.display_name(), "Ada Lovelace");
    }

    #[test]
    fn channel_post_uses_title() {
        let message = update(serde_json::json!({
            "update_id": 11,
            "channel_post": {
                "message_id": 8,
                "date": 1_700_000_100,
                "chat": {"id": -100123, "type": "channel", "title": "Announcements"},
                "text": "/help"
            }
        }))
        .into_message()
        .unwrap();

        let sender = message.sender.unwrap();
        assert_eq!(sender.kind, UserKind::Channel);
        assert_eq!(sender.external_id, -100123);
        assert_eq!(sender.display_name(), "Announcements");
    }

    #[test]
    fn non_text_updates_are_skipped() {
        let sticker = update(serde_json::json!({
            "update_id": 12,
            "message": {
                "message_id": 9,
                "date": 1_700_000_200,
                "chat": {"id": 1, "type": "private", "first_name": "A"}
            }
        }));
        assert!(sticker.into_message().is_none());
        assert!(update(serde_json::json!({"update_id": 13})).into_message().is_none());
    }

    #[test]
    fn next_offset_never_goes_backwards() {
        let updates = vec![
            update(serde_json::json!({"update_id": 5})),
            update(serde_json::json!({"update_id": 7})),
        ];
        assert_eq!(TelegramAdapter::get_next_offset(0, &updates), 8);
        assert_eq!(TelegramAdapter::get_next_offset(8, &[]), 8);
        assert_eq!(TelegramAdapter::get_next_offset(20, &updates), 20);
    }

    #[test]
    fn resumes_offset_from_session_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default().telegram;
        config.session_file = dir.path().join("bot.session");
        config.api_url = "http://localhost:8081/".to_string();

        SessionFile::new(&config.session_file).save_offset(99).unwrap();
        let adapter = TelegramAdapter::new("123:abc", &config);

        assert_eq!(adapter.offset.load(Ordering::SeqCst), 99);
        assert_eq!(adapter.api_url("getMe"), "http://localhost:8081/bot123:abc/getMe");
    }
}
