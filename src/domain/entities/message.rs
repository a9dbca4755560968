use super::Profile;
use chrono::{DateTime, Utc};

/// An inbound text message
#[derive(Debug, Clone)]
pub struct Message {
    pub id: i64,
    pub chat_id: i64,
    pub sender: Option<Profile>,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            id: 0,
            chat_id,
            sender: None,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }

    pub fn with_sender(mut self, profile: Profile) -> Self {
        self.sender = Some(profile);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Profile of the peer this message came from, or a bare one keyed by
    /// the chat when the transport did not describe the sender.
    pub fn sender_profile(&self) -> Profile {
        self.sender
            .clone()
            .unwrap_or_else(|| Profile::new(self.chat_id))
    }
}
