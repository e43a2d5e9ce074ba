//! Core types for ProudShop.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod setting_keys;
pub mod status;

pub use email::{Email, EmailError, mask_local_part};
pub use id::*;
pub use setting_keys::{SettingCategory, infer_category};
pub use status::*;
