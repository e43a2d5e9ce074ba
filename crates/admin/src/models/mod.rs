//! Domain models for the back-office API.
//!
//! Database row types live next to their queries in [`crate::db`]; these are
//! the validated shapes handlers and services work with.

pub mod admin_user;
pub mod chat;
pub mod setting;

pub use admin_user::AdminUser;
pub use chat::{ChatMessage, ChatSession, ChatSessionWithMessages};
pub use setting::{Setting, UpsertSetting};
