//! `/start` - greets the sender and records them on first contact

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::Regex;

use crate::application::errors::CommandError;
use crate::application::messaging::Context;
use crate::domain::entities::SupportedCommand;
use crate::domain::traits::CommandHandler;

static PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!("^{}$", SupportedCommand::Start.as_command())).expect("start pattern compiles")
});

pub struct StartCommand;

impl StartCommand {
    pub fn new() -> Self {
        Self
    }

    pub fn factory() -> Arc<dyn CommandHandler> {
        Arc::new(Self::new())
    }
}

impl Default for StartCommand {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandHandler for StartCommand {
    fn pattern(&self) -> &Regex {
        &PATTERN
    }

    fn usage(&self) -> &str {
        "It can be used to check if bot is alive or dead.\n"
    }

    async fn handle(&self, ctx: &Context) -> Result<String, CommandError> {
        let user = ctx.store.get_or_create_user(&ctx.message.sender_profile()).await?;
        tracing::debug!("Greeting {}", user);
        Ok(format!("Hii👋, {} {}", user.display_name, user.external_id))
    }
}
