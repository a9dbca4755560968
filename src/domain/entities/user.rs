use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of records per page when a user has not chosen one
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Account state of a stored user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UserStatus {
    #[default]
    #[serde(rename = "active")]
    Active,
    #[serde(rename = "suspended")]
    Suspended,
    #[serde(rename = "temporarily banned")]
    TemporarilyBanned,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Suspended => "suspended",
            UserStatus::TemporarilyBanned => "temporarily banned",
        }
    }
}

impl FromStr for UserStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['_', '-'], " ").as_str() {
            "active" => Ok(UserStatus::Active),
            "suspended" => Ok(UserStatus::Suspended),
            "temporarily banned" | "banned" => Ok(UserStatus::TemporarilyBanned),
            other => Err(format!("unknown user status '{}'", other)),
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of peer a user record stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserKind {
    #[default]
    Individual,
    Channel,
    Group,
}

impl UserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserKind::Individual => "individual",
            UserKind::Channel => "channel",
            UserKind::Group => "group",
        }
    }

    /// Map a Telegram chat type ("private", "group", "supergroup", "channel")
    pub fn from_chat_type(chat_type: &str) -> Self {
        match chat_type {
            "channel" => UserKind::Channel,
            "group" | "supergroup" => UserKind::Group,
            _ => UserKind::Individual,
        }
    }
}

impl FromStr for UserKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "individual" => Ok(UserKind::Individual),
            "channel" => Ok(UserKind::Channel),
            "group" => Ok(UserKind::Group),
            other => Err(format!("unknown user kind '{}'", other)),
        }
    }
}

/// Known keys of the per-user settings map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserSetting {
    PageSize,
}

impl UserSetting {
    pub fn key(&self) -> &'static str {
        match self {
            UserSetting::PageSize => "page_size",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            UserSetting::PageSize => "The number of records displayed per page.",
        }
    }
}

impl fmt::Display for UserSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Platform-side description of a peer, as seen on an inbound message
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Profile {
    pub external_id: i64,
    pub kind: UserKind,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub title: Option<String>,
    pub username: Option<String>,
}

impl Profile {
    pub fn new(external_id: i64) -> Self {
        Self {
            external_id,
            ..Self::default()
        }
    }

    pub fn with_kind(mut self, kind: UserKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_name(mut self, first: impl Into<String>, last: Option<impl Into<String>>) -> Self {
        self.first_name = Some(first.into());
        self.last_name = last.map(|l| l.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Name shown for this peer: first and last name for people, title for
    /// channels and groups, username as the last resort.
    pub fn display_name(&self) -> String {
        let derived = match self.kind {
            UserKind::Individual => [self.first_name.as_deref(), self.last_name.as_deref()]
                .into_iter()
                .flatten()
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
            UserKind::Channel | UserKind::Group => {
                self.title.as_deref().unwrap_or_default().trim().to_string()
            }
        };

        if derived.is_empty() {
            self.username.clone().unwrap_or_default()
        } else {
            derived
        }
    }
}

/// A chat participant known to the bot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub external_id: i64,
    pub display_name: String,
    pub status: UserStatus,
    pub kind: UserKind,
    pub settings: serde_json::Map<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build the record stored on first contact with `profile`
    pub fn from_profile(id: i64, profile: &Profile, now: DateTime<Utc>) -> Self {
        Self {
            id,
            external_id: profile.external_id,
            display_name: profile.display_name(),
            status: UserStatus::Active,
            kind: profile.kind,
            settings: serde_json::Map::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn setting(&self, setting: UserSetting) -> Option<&serde_json::Value> {
        self.settings.get(setting.key())
    }

    pub fn page_size(&self) -> u64 {
        self.setting(UserSetting::PageSize)
            .and_then(|v| v.as_u64())
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "User(id={}, name={}, external_id={}, status={})",
            self.id, self.display_name, self.external_id, self.status
        )
    }
}
