//! Bot commands and the startup routine that registers them

pub mod help;
pub mod start;

pub use help::HelpCommand;
pub use start::StartCommand;

use crate::application::errors::CommandError;
use crate::domain::entities::{CommandRegistry, HandlerFactory, SupportedCommand};

/// Reply to `/help <name>` when `name` is not a supported command
pub const COMMAND_NOT_FOUND: &str =
    "Command not found. Type /help to see the list of supported commands.";

/// Reply to `/help <name>` when `name` is supported but has no handler
pub const DOCS_NOT_FOUND: &str = "Sorry, no documentation was found for this command.";

/// Reply sent when a command fails on the storage side
pub const GENERIC_FAILURE: &str = "Something went wrong, please try again later.";

/// Handler constructor for each supported command.
///
/// The match is exhaustive: a new `SupportedCommand` does not build until it
/// has a handler.
pub fn factory_for(command: SupportedCommand) -> HandlerFactory {
    match command {
        SupportedCommand::Start => StartCommand::factory,
        SupportedCommand::Help => HelpCommand::factory,
    }
}

impl CommandRegistry {
    /// Registry holding every supported command, in declaration order
    pub fn with_defaults() -> Result<Self, CommandError> {
        let mut registry = Self::new();
        for command in SupportedCommand::ALL {
            registry.register(command.name(), factory_for(command))?;
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_supported_command() {
        let registry = CommandRegistry::with_defaults().unwrap();
        assert_eq!(registry.len(), SupportedCommand::ALL.len());
        assert_eq!(registry.names(), vec!["start", "help"]);
    }

    #[test]
    fn registered_patterns_are_disjoint() {
        let registry = CommandRegistry::with_defaults().unwrap();
        let handlers: Vec<_> = registry.list_all().map(|(_, f)| f()).collect();

        for text in ["/start", "/help", "/help start", "/helpme"] {
            let matches = handlers.iter().filter(|h| h.pattern().is_match(text)).count();
            assert_eq!(matches, 1, "{text} should match exactly one handler");
        }
        for text in ["hello", "start", "/settings", "/stop", ""] {
            assert!(handlers.iter().all(|h| !h.pattern().is_match(text)), "{text} should match nothing");
        }
    }
}
