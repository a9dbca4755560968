use std::sync::Arc;

use crate::application::errors::CommandError;
use crate::application::messaging::Context;
use crate::domain::entities::{CommandRegistry, Message};
use crate::domain::traits::{CommandHandler, UserStore};

/// Instantiated handlers for every registry entry, matched against inbound text
pub struct CommandService {
    registry: Arc<CommandRegistry>,
    store: Arc<dyn UserStore>,
    handlers: Vec<(String, Arc<dyn CommandHandler>)>,
}

impl CommandService {
    pub fn new(registry: Arc<CommandRegistry>, store: Arc<dyn UserStore>) -> Self {
        let handlers = registry
            .list_all()
            .map(|(name, factory)| {
                tracing::debug!("Registered handler for /{}", name);
                (name.to_string(), factory())
            })
            .collect();

        Self {
            registry,
            store,
            handlers,
        }
    }

    /// Names of the handlers in matching order
    pub fn commands(&self) -> Vec<&str> {
        self.handlers.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Name of the first handler whose pattern matches `text`
    pub fn route(&self, text: &str) -> Option<&str> {
        self.handlers
            .iter()
            .find(|(_, handler)| handler.pattern().is_match(text))
            .map(|(name, _)| name.as_str())
    }

    /// Run the first matching handler. `Ok(None)` when no handler matches.
    pub async fn dispatch(&self, message: &Message) -> Result<Option<String>, CommandError> {
        for (name, handler) in &self.handlers {
            let Some(caps) = handler.pattern().captures(&message.text) else {
                continue;
            };

            let argument = caps.get(1).map(|m| m.as_str().to_string());
            let ctx = Context::new(message.clone(), self.store.clone(), self.registry.clone())
                .with_argument(argument);

            tracing::debug!("[{}] /{} matched", message.chat_id, name);
            return handler.handle(&ctx).await.map(Some);
        }

        Ok(None)
    }
}
