//! Shared model types for the site.

pub mod session;

pub use session::CurrentAdmin;
pub use session::keys as session_keys;
