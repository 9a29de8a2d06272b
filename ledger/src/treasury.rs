//! # Funds Transfer & the Treasury
//!
//! The ledger decides who may take what and when; actually moving value is
//! somebody else's job. [`FundsTransfer`] is that seam: `deposit` pulls value
//! from an account into custody before a vault is credited, `payout` pushes
//! value back out before a vault is debited. Either side may refuse, and the
//! registry treats a refusal as "the whole operation never happened."
//!
//! [`Treasury`] is the in-memory binding used by the node, the demo, and the
//! test suites: a double-entry book of per-account external balances plus a
//! single custody pool. The conservation queries ([`Treasury::pool_balance`],
//! [`Treasury::external_balance`]) exist so tests can check that embers are
//! neither minted nor burned by vault operations.

use dashmap::DashMap;
use parking_lot::Mutex;
use thiserror::Error;

use crate::account::AccountId;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors reported by a [`FundsTransfer`] implementation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransferError {
    /// The paying side does not hold enough value to cover the transfer.
    #[error("insufficient liquidity on {account}: available {available}, requested {requested}")]
    InsufficientLiquidity {
        /// The account that could not pay.
        account: AccountId,
        /// What that account holds.
        available: u64,
        /// What the transfer needed.
        requested: u64,
    },

    /// Crediting the receiving side would overflow its balance.
    #[error("transfer overflow on {account}: current {current}, credit {credit}")]
    Overflow {
        /// The account whose balance would overflow.
        account: AccountId,
        /// The balance before the failed credit.
        current: u64,
        /// The amount that caused the overflow.
        credit: u64,
    },

    /// The transfer rail refused the operation for reasons of its own.
    /// External rails fail in ways the ledger cannot enumerate.
    #[error("transfer rejected: {0}")]
    Rejected(String),
}

// ---------------------------------------------------------------------------
// FundsTransfer
// ---------------------------------------------------------------------------

/// Abstract value-movement capability.
///
/// The registry calls `deposit` before crediting a vault and `payout` before
/// debiting one. Implementations must be all-or-nothing per call: on `Err`,
/// no value may have moved.
pub trait FundsTransfer: Send + Sync {
    /// Moves `amount` embers from `from` into custody.
    fn deposit(&self, from: &AccountId, amount: u64) -> Result<(), TransferError>;

    /// Moves `amount` embers out of custody to `to`.
    fn payout(&self, to: &AccountId, amount: u64) -> Result<(), TransferError>;
}

// ---------------------------------------------------------------------------
// Treasury
// ---------------------------------------------------------------------------

/// In-memory double-entry book: per-account external balances plus a single
/// custody pool.
///
/// Emergency-withdrawal penalties stay in the pool after the vault side
/// forgets about them, so over time `pool_balance` exceeds the sum of live
/// vault balances by exactly the penalties collected.
pub struct Treasury {
    /// External (outside-custody) balance per account.
    external: DashMap<AccountId, u64>,

    /// Value currently held in custody.
    ///
    /// Lock order: pool before any `external` shard, in both transfer
    /// directions.
    pool: Mutex<u64>,
}

impl Treasury {
    /// Creates an empty book: no external balances, empty pool.
    pub fn new() -> Self {
        Self {
            external: DashMap::new(),
            pool: Mutex::new(0),
        }
    }

    /// Faucet credit: value appears from nowhere onto an external balance.
    /// For dev environments and tests, not production accounting.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Overflow`] if the credit would exceed
    /// `u64::MAX`.
    pub fn credit_external(&self, account: &AccountId, amount: u64) -> Result<u64, TransferError> {
        let mut entry = self.external.entry(account.clone()).or_insert(0);
        let new_balance = entry.checked_add(amount).ok_or(TransferError::Overflow {
            account: account.clone(),
            current: *entry,
            credit: amount,
        })?;
        *entry = new_balance;
        Ok(new_balance)
    }

    /// The external balance of an account. Zero for accounts the treasury
    /// has never seen.
    pub fn external_balance(&self, account: &AccountId) -> u64 {
        self.external.get(account).map(|b| *b).unwrap_or(0)
    }

    /// The value currently held in custody.
    pub fn pool_balance(&self) -> u64 {
        *self.pool.lock()
    }
}

impl Default for Treasury {
    fn default() -> Self {
        Self::new()
    }
}

impl FundsTransfer for Treasury {
    fn deposit(&self, from: &AccountId, amount: u64) -> Result<(), TransferError> {
        let mut pool = self.pool.lock();
        let mut entry = self.external.entry(from.clone()).or_insert(0);

        if *entry < amount {
            return Err(TransferError::InsufficientLiquidity {
                account: from.clone(),
                available: *entry,
                requested: amount,
            });
        }

        let new_pool = pool.checked_add(amount).ok_or(TransferError::Overflow {
            account: AccountId::custody(),
            current: *pool,
            credit: amount,
        })?;

        *entry -= amount;
        *pool = new_pool;
        Ok(())
    }

    fn payout(&self, to: &AccountId, amount: u64) -> Result<(), TransferError> {
        let mut pool = self.pool.lock();

        if *pool < amount {
            return Err(TransferError::InsufficientLiquidity {
                account: AccountId::custody(),
                available: *pool,
                requested: amount,
            });
        }

        let mut entry = self.external.entry(to.clone()).or_insert(0);
        let new_balance = entry.checked_add(amount).ok_or(TransferError::Overflow {
            account: to.clone(),
            current: *entry,
            credit: amount,
        })?;

        *pool -= amount;
        *entry = new_balance;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> AccountId {
        AccountId::new("vesta:alice")
    }

    #[test]
    fn faucet_credits_external_balance() {
        let treasury = Treasury::new();
        let new_balance = treasury.credit_external(&alice(), 1_000).unwrap();

        assert_eq!(new_balance, 1_000);
        assert_eq!(treasury.external_balance(&alice()), 1_000);
        assert_eq!(treasury.pool_balance(), 0);
    }

    #[test]
    fn faucet_overflow_rejected() {
        let treasury = Treasury::new();
        treasury.credit_external(&alice(), u64::MAX).unwrap();

        let result = treasury.credit_external(&alice(), 1);
        assert!(matches!(
            result.unwrap_err(),
            TransferError::Overflow { current: u64::MAX, credit: 1, .. }
        ));
    }

    #[test]
    fn deposit_moves_value_into_custody() {
        let treasury = Treasury::new();
        treasury.credit_external(&alice(), 1_000).unwrap();

        treasury.deposit(&alice(), 400).unwrap();

        assert_eq!(treasury.external_balance(&alice()), 600);
        assert_eq!(treasury.pool_balance(), 400);
    }

    #[test]
    fn deposit_without_liquidity_rejected() {
        let treasury = Treasury::new();
        treasury.credit_external(&alice(), 100).unwrap();

        let result = treasury.deposit(&alice(), 250);
        assert!(matches!(
            result.unwrap_err(),
            TransferError::InsufficientLiquidity {
                available: 100,
                requested: 250,
                ..
            }
        ));

        // Nothing moved.
        assert_eq!(treasury.external_balance(&alice()), 100);
        assert_eq!(treasury.pool_balance(), 0);
    }

    #[test]
    fn deposit_from_unseen_account_rejected() {
        let treasury = Treasury::new();
        let result = treasury.deposit(&alice(), 1);
        assert!(matches!(
            result.unwrap_err(),
            TransferError::InsufficientLiquidity { available: 0, .. }
        ));
    }

    #[test]
    fn payout_moves_value_back_out() {
        let treasury = Treasury::new();
        treasury.credit_external(&alice(), 1_000).unwrap();
        treasury.deposit(&alice(), 700).unwrap();

        treasury.payout(&alice(), 300).unwrap();

        assert_eq!(treasury.external_balance(&alice()), 600);
        assert_eq!(treasury.pool_balance(), 400);
    }

    #[test]
    fn payout_exceeding_pool_rejected() {
        let treasury = Treasury::new();
        treasury.credit_external(&alice(), 500).unwrap();
        treasury.deposit(&alice(), 500).unwrap();

        let result = treasury.payout(&alice(), 501);
        assert!(matches!(
            result.unwrap_err(),
            TransferError::InsufficientLiquidity {
                available: 500,
                requested: 501,
                ..
            }
        ));
        assert_eq!(treasury.pool_balance(), 500);
    }

    #[test]
    fn book_total_is_conserved_across_transfers() {
        let treasury = Treasury::new();
        treasury.credit_external(&alice(), 1_000).unwrap();

        treasury.deposit(&alice(), 800).unwrap();
        treasury.payout(&alice(), 150).unwrap();
        treasury.deposit(&alice(), 200).unwrap();

        let total = treasury.external_balance(&alice()) + treasury.pool_balance();
        assert_eq!(total, 1_000);
    }
}
