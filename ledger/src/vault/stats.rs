//! # Aggregate Statistics
//!
//! A point-in-time view of the whole registry: how many vaults have ever
//! been opened and how much value custody currently owes back.

use serde::{Deserialize, Serialize};

/// Aggregate registry snapshot.
///
/// `total_locked` is the running counter the registry maintains as
/// operations commit; `held_balance` is recomputed by walking the active
/// vaults at query time. The two must always agree, and the conservation
/// tests hold the registry to that.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStats {
    /// Vaults ever created. Never decremented, so it counts history, not
    /// currently-active vaults.
    pub total_vaults: u64,

    /// Running sum of active vault balances, in embers.
    pub total_locked: u64,

    /// Live sum over active vaults at query time, in embers.
    pub held_balance: u64,
}

impl LedgerStats {
    /// True when the running counter agrees with the live sum.
    pub fn is_reconciled(&self) -> bool {
        self.total_locked == self.held_balance
    }
}
