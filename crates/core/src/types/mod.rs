//! Shared type definitions.

pub mod id;
pub mod order;

pub use id::*;
pub use order::*;
