//! # Vault Records
//!
//! A [`Vault`] is the per-account custody record: a balance, the time it
//! unlocks, and the beneficiary who may claim it if the owner walks away.
//! [`VaultRegistry`](super::registry::VaultRegistry) owns the records and
//! enforces every rule; the record itself only answers time questions.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::account::AccountId;

// ---------------------------------------------------------------------------
// Vault
// ---------------------------------------------------------------------------

/// Per-account custody record.
///
/// Invariants, maintained by the registry rather than this struct:
/// `active == false` implies `balance == 0`, and `balance > 0` implies
/// `active == true`. A drained record stays in the table, inactive, until
/// the owner opens a new vault over it; its transaction history is kept
/// separately and survives replacement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vault {
    /// The account that created and funds the vault.
    pub owner: AccountId,

    /// Display label, immutable after creation.
    pub name: String,

    /// Locked balance in embers.
    pub balance: u64,

    /// Instant at which the owner may withdraw without penalty.
    pub unlock_time: DateTime<Utc>,

    /// Account allowed to claim after the grace period. Defaults to the
    /// owner's own account when none is supplied at creation.
    pub beneficiary: AccountId,

    /// False once drained through any withdrawal path.
    pub active: bool,

    /// When the vault was created.
    pub created_at: DateTime<Utc>,
}

impl Vault {
    /// True once `now` has reached the unlock time. The boundary is
    /// inclusive: withdrawal opens at exactly `unlock_time`.
    pub fn is_unlocked(&self, now: DateTime<Utc>) -> bool {
        now >= self.unlock_time
    }

    /// Whole days remaining until unlock, floored, never negative.
    pub fn days_left(&self, now: DateTime<Utc>) -> i64 {
        (self.unlock_time - now).num_days().max(0)
    }

    /// Instant after which the beneficiary may claim, given the grace
    /// period in force.
    pub fn claimable_at(&self, grace: Duration) -> DateTime<Utc> {
        self.unlock_time + grace
    }

    /// True once `now` is strictly past the grace deadline. The boundary is
    /// exclusive: a claim at exactly `unlock_time + grace` still fails.
    pub fn is_claimable(&self, now: DateTime<Utc>, grace: Duration) -> bool {
        now > self.claimable_at(grace)
    }
}

// ---------------------------------------------------------------------------
// VaultInfo
// ---------------------------------------------------------------------------

/// Read-only projection of a [`Vault`] plus the derived `days_left`,
/// evaluated at query time. This is what queries and API responses carry;
/// the live record never leaves the registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultInfo {
    pub owner: AccountId,
    pub name: String,
    pub balance: u64,
    pub unlock_time: DateTime<Utc>,
    pub beneficiary: AccountId,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    /// Whole days until unlock at the time of the query; 0 once unlocked.
    pub days_left: i64,
}

impl VaultInfo {
    /// Builds the projection for a query happening at `now`.
    pub fn from_vault(vault: &Vault, now: DateTime<Utc>) -> Self {
        Self {
            owner: vault.owner.clone(),
            name: vault.name.clone(),
            balance: vault.balance,
            unlock_time: vault.unlock_time,
            beneficiary: vault.beneficiary.clone(),
            active: vault.active,
            created_at: vault.created_at,
            days_left: vault.days_left(now),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
