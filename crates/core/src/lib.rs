//! Charret Core - Shared types library.
//!
//! This crate provides common types used across all Charret components:
//! - `site` - Public restaurant site and admin back office
//! - `cli` - Command-line tools for migrations, seeding, and management
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs and the order enums

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
