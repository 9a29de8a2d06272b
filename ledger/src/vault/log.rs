//! # Transaction Log
//!
//! Append-only audit trail, one ordered list of records per account. Records
//! are written by the registry as part of every balance-affecting operation
//! and are never mutated or deleted afterwards; immutability is the audit
//! guarantee. Beneficiary updates and lock extensions move no value and
//! leave no record.
//!
//! The log is keyed by the vault owner's account. A beneficiary claim
//! therefore lands in the drained vault's history, with the claiming account
//! as the record's receiving side.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::account::AccountId;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from log queries.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LogError {
    /// Asked for a record index past the end of an account's history.
    #[error("transaction index {index} out of range for {account}: {len} records")]
    OutOfRange {
        /// The account whose history was queried.
        account: AccountId,
        /// The requested index.
        index: usize,
        /// How many records the account actually has.
        len: usize,
    },
}

// ---------------------------------------------------------------------------
// TransactionRecord
// ---------------------------------------------------------------------------

/// One balance-affecting event in an account's history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Unique record id.
    pub id: Uuid,

    /// Paying side. The custody account on payouts.
    pub from: AccountId,

    /// Receiving side. The custody account on deposits.
    pub to: AccountId,

    /// Value moved, in embers.
    pub amount: u64,

    /// When the operation ran, by the registry's clock.
    pub timestamp: DateTime<Utc>,

    /// Human-readable description of what happened.
    pub description: String,

    /// Always true. The log only ever sees completed operations; the field
    /// exists so exported records state that explicitly.
    pub executed: bool,
}

impl TransactionRecord {
    /// Creates a completed record with a fresh id.
    pub fn new(
        from: AccountId,
        to: AccountId,
        amount: u64,
        timestamp: DateTime<Utc>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            from,
            to,
            amount,
            timestamp,
            description: description.into(),
            executed: true,
        }
    }
}

// ---------------------------------------------------------------------------
// TransactionLog
// ---------------------------------------------------------------------------

/// Append-only per-account history.
#[derive(Debug, Default)]
pub struct TransactionLog {
    entries: DashMap<AccountId, Vec<TransactionRecord>>,
}

impl TransactionLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record to an account's history. Never fails; a fresh list
    /// is created on the account's first record.
    pub fn append(&self, account: &AccountId, record: TransactionRecord) {
        self.entries.entry(account.clone()).or_default().push(record);
    }

    /// Number of records in an account's history. Zero for accounts the log
    /// has never seen.
    pub fn count(&self, account: &AccountId) -> usize {
        self.entries.get(account).map(|list| list.len()).unwrap_or(0)
    }

    /// The record at `index`, in insertion order, cloned out of the log.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::OutOfRange`] if `index` is not below the
    /// account's record count.
    pub fn get(&self, account: &AccountId, index: usize) -> Result<TransactionRecord, LogError> {
        let list = self.entries.get(account);
        let len = list.as_ref().map(|l| l.len()).unwrap_or(0);

        list.as_ref()
            .and_then(|l| l.get(index))
            .cloned()
            .ok_or(LogError::OutOfRange {
                account: account.clone(),
                index,
                len,
            })
    }

    /// Full ordered snapshot of an account's history. Empty for accounts
    /// the log has never seen.
    pub fn history(&self, account: &AccountId) -> Vec<TransactionRecord> {
        self.entries
            .get(account)
            .map(|list| list.clone())
            .unwrap_or_default()
    }

    /// Total records across all accounts.
    pub fn total_records(&self) -> usize {
        self.entries.iter().map(|entry| entry.value().len()).sum()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
