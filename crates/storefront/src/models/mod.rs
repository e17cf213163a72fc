//! Storefront domain and session types.

pub mod session;

pub use session::{CurrentUser, session_keys};
