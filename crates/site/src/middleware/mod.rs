//! Middleware: session layer and admin auth extractors.

pub mod auth;
pub mod session;

pub use auth::RequireAdmin;
pub use session::create_session_layer;
