//! Domain entities - Core business objects

pub mod user;
pub mod message;
pub mod command;

pub use user::{Profile, User, UserKind, UserSetting, UserStatus};
pub use message::Message;
pub use command::{CommandRegistry, HandlerFactory, SupportedCommand};
