//! # Account Identifiers
//!
//! Accounts in VESTA are opaque strings. The ledger never interprets them
//! beyond equality and hashing, so whatever naming scheme the embedding
//! system uses (chain addresses, usernames, UUIDs) passes through unchanged.
//! By convention the ids in this repo are namespaced, e.g. `vesta:alice`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::CUSTODY_ACCOUNT;

/// An opaque account identifier.
///
/// Cheap to clone relative to everything else an operation does, hashable,
/// and serialized as a bare JSON string.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Wraps an id. No validation happens here; operations that require a
    /// non-empty id check at the call site.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The well-known account standing in for the custody pool itself.
    /// Appears as the counterparty in transaction records.
    pub fn custody() -> Self {
        Self(CUSTODY_ACCOUNT.to_string())
    }

    /// True if this id is the custody pool account.
    pub fn is_custody(&self) -> bool {
        self.0 == CUSTODY_ACCOUNT
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the empty id, which no operation accepts as a counterparty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for AccountId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_inner_string() {
        let id = AccountId::new("vesta:alice");
        assert_eq!(id.to_string(), "vesta:alice");
        assert_eq!(id.as_str(), "vesta:alice");
    }

    #[test]
    fn custody_account_is_recognized() {
        let custody = AccountId::custody();
        assert!(custody.is_custody());
        assert!(!AccountId::new("vesta:alice").is_custody());
    }

    #[test]
    fn empty_id_is_flagged() {
        assert!(AccountId::new("").is_empty());
        assert!(!AccountId::new("vesta:bob").is_empty());
    }

    #[test]
    fn serializes_as_bare_string() {
        let id = AccountId::new("vesta:carol");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"vesta:carol\"");

        let back: AccountId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
