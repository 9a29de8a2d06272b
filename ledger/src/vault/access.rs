//! # Access Control
//!
//! The registry has a single owner, fixed at construction with no transfer
//! operation, and a set of authorized accounts the owner may grow and
//! shrink. Only the owner may touch the set.
//!
//! The set itself is bookkeeping: no vault operation consults it. Vault
//! operations authorize by account identity instead (an account acts on its
//! own vault, or claims as the named beneficiary).

use parking_lot::RwLock;
use std::collections::HashSet;
use thiserror::Error;

use crate::account::AccountId;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from administrative operations.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AccessError {
    /// The caller is not the registry owner.
    #[error("{caller} is not the registry owner")]
    NotOwner {
        /// Whoever tried.
        caller: AccountId,
    },
}

// ---------------------------------------------------------------------------
// AccessControl
// ---------------------------------------------------------------------------

/// Owner identity plus the authorized-account set.
#[derive(Debug)]
pub struct AccessControl {
    owner: AccountId,
    authorized: RwLock<HashSet<AccountId>>,
}

impl AccessControl {
    /// Creates the control state with a fixed owner and an empty set.
    pub fn new(owner: AccountId) -> Self {
        Self {
            owner,
            authorized: RwLock::new(HashSet::new()),
        }
    }

    /// The registry owner.
    pub fn owner(&self) -> &AccountId {
        &self.owner
    }

    /// Owner-only: adds `target` to the authorized set.
    ///
    /// Returns `true` if membership changed, `false` if the account was
    /// already authorized.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::NotOwner`] when `caller` is not the owner.
    pub fn authorize(&self, caller: &AccountId, target: AccountId) -> Result<bool, AccessError> {
        self.ensure_owner(caller)?;
        Ok(self.authorized.write().insert(target))
    }

    /// Owner-only: removes `target` from the authorized set.
    ///
    /// Returns `true` if the account was present.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::NotOwner`] when `caller` is not the owner.
    pub fn revoke(&self, caller: &AccountId, target: &AccountId) -> Result<bool, AccessError> {
        self.ensure_owner(caller)?;
        Ok(self.authorized.write().remove(target))
    }

    /// True if `account` is in the authorized set.
    pub fn is_authorized(&self, account: &AccountId) -> bool {
        self.authorized.read().contains(account)
    }

    /// Size of the authorized set.
    pub fn authorized_count(&self) -> usize {
        self.authorized.read().len()
    }

    fn ensure_owner(&self, caller: &AccountId) -> Result<(), AccessError> {
        if caller != &self.owner {
            return Err(AccessError::NotOwner {
                caller: caller.clone(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> AccountId {
        AccountId::new("vesta:custodian")
    }

    #[test]
    fn owner_can_authorize_and_revoke() {
        let access = AccessControl::new(owner());
        let alice = AccountId::new("vesta:alice");

        assert!(access.authorize(&owner(), alice.clone()).unwrap());
        assert!(access.is_authorized(&alice));
        assert_eq!(access.authorized_count(), 1);

        assert!(access.revoke(&owner(), &alice).unwrap());
        assert!(!access.is_authorized(&alice));
        assert_eq!(access.authorized_count(), 0);
    }

    #[test]
    fn repeat_grants_report_no_change() {
        let access = AccessControl::new(owner());
        let alice = AccountId::new("vesta:alice");

        assert!(access.authorize(&owner(), alice.clone()).unwrap());
        assert!(!access.authorize(&owner(), alice.clone()).unwrap());

        assert!(access.revoke(&owner(), &alice).unwrap());
        assert!(!access.revoke(&owner(), &alice).unwrap());
    }

    #[test]
    fn non_owner_callers_rejected() {
        let access = AccessControl::new(owner());
        let mallory = AccountId::new("vesta:mallory");

        let result = access.authorize(&mallory, mallory.clone());
        assert!(matches!(result.unwrap_err(), AccessError::NotOwner { .. }));

        let result = access.revoke(&mallory, &owner());
        assert!(matches!(result.unwrap_err(), AccessError::NotOwner { .. }));
    }

    #[test]
    fn set_starts_empty_and_owner_is_not_implicitly_member() {
        let access = AccessControl::new(owner());
        assert_eq!(access.authorized_count(), 0);
        assert!(!access.is_authorized(&owner()));
    }
}
