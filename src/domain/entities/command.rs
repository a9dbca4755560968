use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::application::errors::CommandError;
use crate::domain::traits::CommandHandler;

/// Constructor for a command's handler
pub type HandlerFactory = fn() -> Arc<dyn CommandHandler>;

/// Commands the bot answers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupportedCommand {
    Start,
    Help,
}

impl SupportedCommand {
    pub const ALL: [SupportedCommand; 2] = [SupportedCommand::Start, SupportedCommand::Help];

    /// Registry name, without the leading slash
    pub fn name(&self) -> &'static str {
        match self {
            SupportedCommand::Start => "start",
            SupportedCommand::Help => "help",
        }
    }

    /// Name as typed in a chat
    pub fn as_command(&self) -> &'static str {
        match self {
            SupportedCommand::Start => "/start",
            SupportedCommand::Help => "/help",
        }
    }

    /// Accepts both `start` and `/start`
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        let name = name.strip_prefix('/').unwrap_or(name);
        Self::ALL.into_iter().find(|c| c.name() == name)
    }
}

impl fmt::Display for SupportedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_command())
    }
}

/// Command registry, populated once at startup and read-only afterwards
#[derive(Default)]
pub struct CommandRegistry {
    entries: Vec<(String, HandlerFactory)>,
    index: HashMap<String, usize>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate `name` with `factory`. A name can be registered once.
    pub fn register(&mut self, name: impl Into<String>, factory: HandlerFactory) -> Result<(), CommandError> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(CommandError::Duplicate(name));
        }

        self.index.insert(name.clone(), self.entries.len());
        self.entries.push((name, factory));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<HandlerFactory> {
        self.index.get(name).map(|&i| self.entries[i].1)
    }

    /// All entries in registration order
    pub fn list_all(&self) -> impl Iterator<Item = (&str, HandlerFactory)> {
        self.entries.iter().map(|(name, factory)| (name.as_str(), *factory))
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.names())
            .finish()
    }
}
