//! Infrastructure layer - External concerns
//!
//! This layer contains:
//! - Config: Configuration loading
//! - Database: SQLite user store
//! - Storage: In-memory user store
//! - Adapters: Platform integrations (Telegram, console)

pub mod config;
pub mod database;
pub mod storage;
pub mod adapters;
