//! greeter-bot: a Telegram bot answering `/start` and `/help`, keeping a
//! user record for every peer it talks to.

pub mod domain;
pub mod application;
pub mod infrastructure;
