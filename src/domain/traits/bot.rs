use async_trait::async_trait;
use crate::domain::entities::Message;
use crate::application::errors::BotError;

/// Bot trait - abstraction for messaging platform adapters
#[async_trait]
pub trait Bot: Send + Sync {
    /// Open the session and verify credentials
    async fn start(&self) -> Result<BotInfo, BotError>;

    /// Wait for the next batch of inbound messages.
    ///
    /// `Ok(None)` means the session was closed and no more messages will come.
    async fn next_messages(&self) -> Result<Option<Vec<Message>>, BotError>;

    /// Reply to an inbound message, returning the sent message id
    async fn reply(&self, to: &Message, text: &str) -> Result<String, BotError>;

    /// Get bot info
    fn bot_info(&self) -> BotInfo;
}

/// Bot information
#[derive(Debug, Clone)]
pub struct BotInfo {
    pub id: String,
    pub name: String,
    pub username: String,
}
