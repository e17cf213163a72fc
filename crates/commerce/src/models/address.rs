//! Reusable standing addresses.

use chrono::{DateTime, Utc};
use cloudberry_core::{AddressId, Email, UserId};
use serde::Serialize;

/// A reusable postal address owned by exactly one authenticated identity.
///
/// Distinct from an order's frozen shipping snapshot: a standing address is
/// the account's current address book entry. The address synthesizer creates
/// the first one from order history; it is never auto-updated afterward.
#[derive(Debug, Clone, Serialize)]
pub struct StandingAddress {
    pub id: AddressId,
    pub owner_id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub email: Option<Email>,
    pub street: String,
    pub city: String,
    pub region: String,
    pub postal_code: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
