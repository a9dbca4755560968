//! Message handling - routing inbound messages to command handlers

pub mod context;
pub mod dispatcher;

pub use context::Context;
pub use dispatcher::{Listener, ListenerState, RetryPolicy};
