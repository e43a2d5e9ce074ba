//! ProudShop Core - Shared types library.
//!
//! This crate provides common types used across all ProudShop components:
//! - `admin` - Back-office API server and service helpers
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no HTTP clients.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, roles and well-known setting keys

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
