use async_trait::async_trait;
use regex_lite::Regex;

use crate::application::errors::CommandError;
use crate::application::messaging::Context;

/// A bot command: how to recognise it, how to describe it, how to run it
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Pattern tested against the full message text. The first capture
    /// group, if any, becomes the command argument.
    fn pattern(&self) -> &Regex;

    /// Usage text shown by `/help <command>`
    fn usage(&self) -> &str;

    /// Run the command and return the reply text
    async fn handle(&self, ctx: &Context) -> Result<String, CommandError>;
}
