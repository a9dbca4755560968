//! Application layer - Use cases and business logic
//!
//! This layer contains:
//! - Commands: the `/start` and `/help` handlers and their registration
//! - Services: handler matching and invocation
//! - Messaging: the listener loop and handler context
//! - Errors: Domain-specific errors

pub mod commands;
pub mod errors;
pub mod services;
pub mod messaging;
