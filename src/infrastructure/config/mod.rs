//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::application::errors::ConfigError;
use crate::application::messaging::RetryPolicy;

/// Bot configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub bot: BotConfig,
    pub telegram: TelegramConfig,
    pub database: DatabaseConfig,
    pub connect: ConnectConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BotConfig {
    pub name: String,
    /// Chat id used for messages typed in console mode
    pub console_user_id: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TelegramConfig {
    pub token: Option<String>,
    pub api_url: String,
    /// Stores the last processed update id between runs
    pub session_file: PathBuf,
    pub poll_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConnectConfig {
    pub retries: u32,
    pub backoff_ms: u64,
    pub poll_error_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot: BotConfig {
                name: "greeter-bot".to_string(),
                console_user_id: 1,
            },
            telegram: TelegramConfig {
                token: None,
                api_url: "https://api.telegram.org".to_string(),
                session_file: PathBuf::from("greeter-bot.session"),
                poll_timeout_seconds: 30,
            },
            database: DatabaseConfig {
                url: "sqlite://greeter-bot.db".to_string(),
            },
            connect: ConnectConfig {
                retries: 3,
                backoff_ms: 1000,
                poll_error_delay_ms: 5000,
            },
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Defaults overlaid with environment variables
    pub fn load_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Overlay values from `lookup` (normally the process environment)
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(token) = lookup("BOT_TOKEN") {
            self.telegram.token = Some(token);
        }
        if let Some(url) = lookup("TELEGRAM_API_URL") {
            self.telegram.api_url = url;
        }
        if let Some(path) = lookup("SESSION_FILE") {
            self.telegram.session_file = PathBuf::from(path);
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = url;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::MissingField("database.url".to_string()));
        }
        if self.telegram.token.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(ConfigError::InvalidValue("telegram.token is empty".to_string()));
        }
        if self.telegram.poll_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "telegram.poll-timeout-seconds must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.connect.retries,
            backoff: Duration::from_millis(self.connect.backoff_ms),
            poll_error_delay: Duration::from_millis(self.connect.poll_error_delay_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_round_trips_through_yaml() {
        let yaml = Config::default().to_yaml().unwrap();
        assert!(yaml.contains("session-file"));

        let parsed = Config::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.database.url, "sqlite://greeter-bot.db");
        assert_eq!(parsed.connect.retries, 3);
    }

    #[test]
    fn environment_overrides_defaults() {
        let env: HashMap<&str, &str> = [
            ("BOT_TOKEN", "123:abc"),
            ("DATABASE_URL", "sqlite::memory:"),
            ("SESSION_FILE", "/tmp/bot.session"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(config.telegram.token.as_deref(), Some("123:abc"));
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.telegram.session_file, PathBuf::from("/tmp/bot.session"));
        assert_eq!(config.telegram.api_url, "https://api.telegram.org");
    }

    #[test]
    fn rejects_empty_token() {
        let mut config = Config::default();
        let err = config
            .apply_env(|k| (k == "BOT_TOKEN").then(|| "  ".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }

    #[test]
    fn retry_policy_uses_milliseconds() {
        let policy = Config::default().retry_policy();
        assert_eq!(policy.backoff, Duration::from_secs(1));
        assert_eq!(policy.poll_error_delay, Duration::from_secs(5));
    }
}
