//! Session-related types.
//!
//! Types stored in the session for authentication state. The identity
//! provider (a separate service) authenticates the user and writes
//! [`CurrentUser`] into the session; this binary only reads it back.

use serde::{Deserialize, Serialize};

use cloudberry_core::{Email, UserId};

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// The email address registered with the identity provider. Used as a
    /// reconciliation match key, so it is kept in normalized form.
    pub email: Email,
}

/// Session keys for authentication data.
pub mod session_keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";
}
