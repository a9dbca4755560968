//! Domain layer - Core business objects
//!
//! This layer contains:
//! - Entities: User, Message, command registry
//! - Traits: Abstractions for infrastructure (Bot, UserStore, CommandHandler)

pub mod entities;
pub mod traits;
