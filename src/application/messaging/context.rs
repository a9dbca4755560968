//! Per-invocation context handed to command handlers

use std::sync::Arc;

use crate::domain::entities::{CommandRegistry, Message};
use crate::domain::traits::UserStore;

/// Everything a handler can see while serving one message
#[derive(Clone)]
pub struct Context {
    pub message: Message,
    /// First capture group of the matched pattern, untrimmed
    pub argument: Option<String>,
    pub store: Arc<dyn UserStore>,
    pub registry: Arc<CommandRegistry>,
}

impl Context {
    pub fn new(message: Message, store: Arc<dyn UserStore>, registry: Arc<CommandRegistry>) -> Self {
        Self {
            message,
            argument: None,
            store,
            registry,
        }
    }

    pub fn with_argument(mut self, argument: Option<String>) -> Self {
        self.argument = argument;
        self
    }

    /// Trimmed argument, `None` when absent or blank
    pub fn arg(&self) -> Option<&str> {
        self.argument
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
    }
}
