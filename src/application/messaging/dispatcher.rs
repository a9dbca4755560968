//! Listener - owns the transport session and routes messages to handlers

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::application::commands::GENERIC_FAILURE;
use crate::application::errors::{BotError, CommandError};
use crate::application::services::CommandService;
use crate::domain::entities::{CommandRegistry, Message};
use crate::domain::traits::{Bot, BotInfo, UserStore};

/// Lifecycle of a listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Disconnected,
    Connected,
    Listening,
    Stopped,
}

/// How hard to try reaching the transport
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Extra connection attempts after the first one
    pub retries: u32,
    /// Delay before the first retry, doubled on every further attempt
    pub backoff: Duration,
    /// Pause after a failed poll before polling again
    pub poll_error_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            backoff: Duration::from_secs(1),
            poll_error_delay: Duration::from_secs(5),
        }
    }
}

pub struct Listener<B: Bot> {
    bot: B,
    registry: Arc<CommandRegistry>,
    store: Arc<dyn UserStore>,
    policy: RetryPolicy,
    state: ListenerState,
    service: Option<CommandService>,
}

impl<B: Bot> Listener<B> {
    pub fn new(bot: B, registry: Arc<CommandRegistry>, store: Arc<dyn UserStore>) -> Self {
        Self {
            bot,
            registry,
            store,
            policy: RetryPolicy::default(),
            state: ListenerState::Disconnected,
            service: None,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn state(&self) -> ListenerState {
        self.state
    }

    pub fn bot(&self) -> &B {
        &self.bot
    }

    /// Disconnected -> Connected. Network failures are retried with
    /// exponential backoff; rejected credentials fail at once.
    pub async fn connect(&mut self) -> Result<BotInfo, BotError> {
        let mut delay = self.policy.backoff;
        let mut attempt = 0;

        loop {
            match self.bot.start().await {
                Ok(info) => {
                    tracing::info!("Connected as @{}", info.username);
                    self.state = ListenerState::Connected;
                    return Ok(info);
                }
                Err(e @ BotError::Auth(_)) => {
                    tracing::error!("Credentials rejected: {}", e);
                    return Err(e);
                }
                Err(e) if attempt < self.policy.retries => {
                    attempt += 1;
                    tracing::warn!(
                        "Unable to connect ({}), retry {}/{} in {:?}",
                        e,
                        attempt,
                        self.policy.retries,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                }
                Err(e) => {
                    tracing::error!("Unable to connect with Telegram: {}", e);
                    return Err(e);
                }
            }
        }
    }

    /// Connected -> Listening: instantiate one handler per registry entry
    pub fn listen(&mut self) -> Result<(), BotError> {
        if self.state != ListenerState::Connected {
            return Err(BotError::Internal(format!(
                "cannot start listening from state {:?}",
                self.state
            )));
        }

        let service = CommandService::new(self.registry.clone(), self.store.clone());
        tracing::info!(
            "Registering {} commands: {:?}",
            service.commands().len(),
            service.commands()
        );
        self.service = Some(service);
        self.state = ListenerState::Listening;
        Ok(())
    }

    /// Listening -> Stopped. Processes messages in arrival order until the
    /// transport closes the session or `shutdown` resolves.
    pub async fn run_until_disconnected<F>(&mut self, shutdown: F) -> Result<(), BotError>
    where
        F: Future<Output = ()>,
    {
        let service = match (self.state, self.service.as_ref()) {
            (ListenerState::Listening, Some(service)) => service,
            (state, _) => {
                return Err(BotError::Internal(format!(
                    "cannot run listener from state {:?}",
                    state
                )))
            }
        };

        tokio::pin!(shutdown);

        loop {
            let polled = tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested");
                    break;
                }
                polled = self.bot.next_messages() => polled,
            };

            match polled {
                Ok(Some(messages)) => {
                    if !messages.is_empty() {
                        tracing::debug!("Received {} messages", messages.len());
                    }
                    for message in &messages {
                        handle_message(&self.bot, service, message).await;
                    }
                }
                Ok(None) => {
                    tracing::info!("Session closed by transport");
                    break;
                }
                Err(e) => {
                    tracing::error!("Failed to get updates: {}", e);
                    tokio::time::sleep(self.policy.poll_error_delay).await;
                }
            }
        }

        self.service = None;
        self.state = ListenerState::Stopped;
        tracing::info!("Stopped!");
        Ok(())
    }

    /// Connect, listen and block until the session ends
    pub async fn run<F>(&mut self, shutdown: F) -> Result<(), BotError>
    where
        F: Future<Output = ()>,
    {
        self.connect().await?;
        self.listen()?;
        self.run_until_disconnected(shutdown).await
    }
}

/// Route one message. Failures are logged and never escape.
async fn handle_message<B: Bot>(bot: &B, service: &CommandService, message: &Message) {
    let reply = match service.dispatch(message).await {
        Ok(Some(reply)) => reply,
        Ok(None) => return,
        Err(CommandError::Storage(e)) => {
            tracing::error!("[{}] Storage failure: {}", message.chat_id, e);
            GENERIC_FAILURE.to_string()
        }
        Err(e) => {
            tracing::error!("[{}] Command failed: {}", message.chat_id, e);
            return;
        }
    };

    tracing::info!(
        "Sending response to chat_id {}: {}",
        message.chat_id,
        reply.chars().take(100).collect::<String>()
    );
    if let Err(e) = bot.reply(message, &reply).await {
        tracing::error!("Failed to send message: {}", e);
    }
}
