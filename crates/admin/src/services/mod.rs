//! Business logic services for admin.
//!
//! # Services
//!
//! - `auth` - Password login and bearer tokens for admins
//! - `email` - SMTP delivery and the canned email templates
//! - `openai` - `OpenAI` content generation and email composition

pub mod auth;
pub mod email;
pub mod openai;

pub use auth::{AdminAccounts, AdminAuthError, AdminAuthService, TokenService};
pub use email::{EmailError, EmailTemplates, Mailer};
pub use openai::{AiOutcome, AiService, OpenAiError};
