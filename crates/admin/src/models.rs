//! Admin domain and session types.

use serde::{Deserialize, Serialize};

use cloudberry_core::{AdminUserId, Email};

/// Session-stored admin identity.
///
/// Written into the session by the identity provider after it authenticates
/// an operator; this binary only reads it back. Server-issued and
/// server-validated - there is no client-settable auth flag anywhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentAdmin {
    /// Admin's database ID.
    pub id: AdminUserId,
    /// Admin's email address.
    pub email: Email,
}

/// Session keys for authentication data.
pub mod session_keys {
    /// Key for storing the current logged-in admin.
    pub const CURRENT_ADMIN: &str = "current_admin";
}
