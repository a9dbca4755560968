//! `/help [command]` - lists registered commands or shows one command's usage

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::Regex;

use super::{COMMAND_NOT_FOUND, DOCS_NOT_FOUND};
use crate::application::errors::CommandError;
use crate::application::messaging::Context;
use crate::domain::entities::{CommandRegistry, SupportedCommand};
use crate::domain::traits::CommandHandler;

static PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!("^{}(.*)", SupportedCommand::Help.as_command())).expect("help pattern compiles")
});

pub struct HelpCommand;

impl HelpCommand {
    pub fn new() -> Self {
        Self
    }

    pub fn factory() -> Arc<dyn CommandHandler> {
        Arc::new(Self::new())
    }

    /// Help Center text listing every registered command, numbered in
    /// registration order
    pub fn listing(registry: &CommandRegistry) -> String {
        let mut text = String::from(
            "Hey there, Welcome to the Help Center\n\nHere's a list of supported commands:\n\n",
        );

        for (n, (name, factory)) in registry.list_all().enumerate() {
            let handler = factory();
            let summary = handler.usage().lines().next().unwrap_or_default().trim().to_string();
            text.push_str(&format!("{}. `/{}`: {}\n", n + 1, name, summary));
        }

        text.push_str(
            "\nFor more information on each command, type `/help <command>`.\n\n\
             If you have any questions or need assistance, feel free to ask. Happy botting!\n",
        );
        text
    }
}

impl Default for HelpCommand {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandHandler for HelpCommand {
    fn pattern(&self) -> &Regex {
        &PATTERN
    }

    fn usage(&self) -> &str {
        "Really bro🥸."
    }

    async fn handle(&self, ctx: &Context) -> Result<String, CommandError> {
        let Some(arg) = ctx.arg() else {
            return Ok(Self::listing(&ctx.registry));
        };

        let Some(command) = SupportedCommand::from_name(arg) else {
            return Ok(COMMAND_NOT_FOUND.to_string());
        };

        match ctx.registry.get(command.name()) {
            Some(factory) => Ok(factory().usage().to_string()),
            None => {
                tracing::warn!("{} is supported but has no registered handler", command);
                Ok(DOCS_NOT_FOUND.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::commands::StartCommand;
    use crate::domain::entities::Message;
    use crate::infrastructure::storage::MemoryStore;

    fn ctx(text: &str, registry: CommandRegistry) -> Context {
        let argument = PATTERN
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string());
        Context::new(Message::new(1, text), Arc::new(MemoryStore::new()), Arc::new(registry))
            .with_argument(argument)
    }

    async fn reply(text: &str, registry: CommandRegistry) -> String {
        HelpCommand::new().handle(&ctx(text, registry)).await.unwrap()
    }

    #[test]
    fn pattern_captures_trailing_text() {
        let caps = PATTERN.captures("/help start").unwrap();
        assert_eq!(caps.get(1).unwrap().as_str(), " start");

        let caps = PATTERN.captures("/help").unwrap();
        assert_eq!(caps.get(1).unwrap().as_str(), "");

        assert!(!PATTERN.is_match("help"));
        assert!(!PATTERN.is_match("I need /help"));
    }

    #[tokio::test]
    async fn listing_has_one_entry_per_command() {
        let registry = CommandRegistry::with_defaults().unwrap();
        let expected = registry.len();

        let text = reply("/help", registry).await;
        let entries = text
            .lines()
            .filter(|l| l.split_once(". `/").is_some_and(|(n, _)| n.parse::<usize>().is_ok()))
            .count();

        assert_eq!(entries, expected);
        assert!(text.contains("1. `/start`: It can be used to check if bot is alive or dead."));
        assert!(text.contains("`/help <command>`"));
    }

    #[tokio::test]
    async fn blank_argument_lists_commands() {
        let text = reply("/help    ", CommandRegistry::with_defaults().unwrap()).await;
        assert!(text.starts_with("Hey there"));
    }

    #[tokio::test]
    async fn known_command_returns_its_usage() {
        let text = reply("/help start", CommandRegistry::with_defaults().unwrap()).await;
        assert_eq!(text, StartCommand::new().usage());

        let text = reply("/help /help", CommandRegistry::with_defaults().unwrap()).await;
        assert_eq!(text, "Really bro🥸.");
    }

    #[tokio::test]
    async fn unknown_command_is_not_found() {
        let text = reply("/help bogus", CommandRegistry::with_defaults().unwrap()).await;
        assert_eq!(text, COMMAND_NOT_FOUND);
    }

    #[tokio::test]
    async fn supported_but_unregistered_reports_missing_docs() {
        let mut registry = CommandRegistry::new();
        registry.register("help", HelpCommand::factory).unwrap();

        let text = reply("/help start", registry).await;
        assert_eq!(text, DOCS_NOT_FOUND);
    }
}
