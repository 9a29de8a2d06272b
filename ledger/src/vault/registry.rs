//! # Vault Registry
//!
//! The custody state machine. One [`Vault`] per account; the registry owns
//! the records and enforces every rule: creation bounds, the time lock, the
//! emergency penalty, the beneficiary grace period, and the all-or-nothing
//! coupling between vault state, counters, the transaction log, and the
//! external funds rail.
//!
//! ## Design
//!
//! - `DashMap` keys vaults by owner account. The per-account guard is held
//!   for an operation's full duration, so same-account calls serialize while
//!   different accounts proceed in parallel.
//! - The two aggregate counters live under one `parking_lot::Mutex`. Lock
//!   order is fixed everywhere: vault guard first, counters second.
//! - External transfers run after every check and before any commit. A
//!   refused transfer aborts with vault state, counters, and log untouched;
//!   an accepted one is followed only by infallible commits, so nothing ever
//!   needs rolling back.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::account::AccountId;
use crate::clock::Clock;
use crate::config;
use crate::notify::{NotificationSink, VaultEvent};
use crate::treasury::{FundsTransfer, TransferError};

use super::access::{AccessControl, AccessError};
use super::log::{LogError, TransactionLog, TransactionRecord};
use super::record::{Vault, VaultInfo};
use super::stats::LedgerStats;

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Tunable custody rules.
///
/// Defaults come from [`config`] and match the published product terms.
/// Embedders with different terms construct the registry through
/// [`VaultRegistry::with_policy`].
#[derive(Clone, Debug)]
pub struct VaultPolicy {
    /// Shortest acceptable initial lock, in days.
    pub min_lock_days: u32,

    /// Longest acceptable initial lock, in days.
    pub max_lock_days: u32,

    /// Longest single extension, in days. Extensions accumulate without cap;
    /// only the per-call amount is bounded.
    pub max_extension_days: u32,

    /// Emergency-withdrawal penalty as a percentage of balance, 0..=100.
    pub penalty_pct: u64,

    /// Days past unlock before the beneficiary may claim.
    pub grace_days: i64,
}

impl Default for VaultPolicy {
    fn default() -> Self {
        Self {
            min_lock_days: config::MIN_LOCK_DAYS,
            max_lock_days: config::MAX_LOCK_DAYS,
            max_extension_days: config::MAX_EXTENSION_DAYS,
            penalty_pct: config::EMERGENCY_PENALTY_PCT,
            grace_days: config::BENEFICIARY_GRACE_DAYS,
        }
    }
}

impl VaultPolicy {
    /// The grace period as a duration.
    pub fn grace_period(&self) -> Duration {
        Duration::days(self.grace_days)
    }

    /// Penalty for emergency-draining `balance`, floored. Computed in
    /// `u128` so the intermediate product cannot overflow.
    pub fn emergency_penalty(&self, balance: u64) -> u64 {
        ((balance as u128 * self.penalty_pct as u128) / 100) as u64
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by vault operations.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum VaultError {
    /// Zero-amount deposits and withdrawals are rejected outright.
    #[error("amount must be greater than zero")]
    ZeroAmount,

    /// Lock or extension duration outside the allowed per-call window.
    #[error("lock duration {days} days outside allowed window {min}..={max}")]
    LockOutOfRange {
        /// What the caller asked for.
        days: u32,
        /// Smallest acceptable value.
        min: u32,
        /// Largest acceptable value.
        max: u32,
    },

    /// A vault needs a display name.
    #[error("vault name must not be empty")]
    EmptyName,

    /// Beneficiary ids must be non-empty.
    #[error("beneficiary account must not be empty")]
    EmptyBeneficiary,

    /// One active vault per account; drain before opening another.
    #[error("{0} already has an active vault")]
    AlreadyActive(AccountId),

    /// The account has never had a vault.
    #[error("no vault on record for {0}")]
    UnknownAccount(AccountId),

    /// The account's vault was drained and never reopened.
    #[error("vault for {0} is inactive")]
    VaultInactive(AccountId),

    /// Withdrawal larger than the locked balance.
    #[error("insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance {
        /// What the vault holds.
        available: u64,
        /// What the caller asked for.
        requested: u64,
    },

    /// The time lock has not elapsed.
    #[error("vault is locked until {unlock_time} ({days_left} days left)")]
    StillLocked {
        /// When the owner may withdraw.
        unlock_time: DateTime<Utc>,
        /// Whole days remaining, floored.
        days_left: i64,
    },

    /// Beneficiary claims open strictly after unlock plus the grace period.
    #[error("grace period still running; claimable after {claimable_at}")]
    GraceNotElapsed {
        /// The instant the claim gate opens (exclusive).
        claimable_at: DateTime<Utc>,
    },

    /// Only the named beneficiary may claim.
    #[error("{caller} is not the beneficiary of this vault")]
    NotBeneficiary {
        /// Whoever tried.
        caller: AccountId,
    },

    /// Emergency release and claims need something to release.
    #[error("vault for {0} holds no funds")]
    EmptyVault(AccountId),

    /// Crediting would overflow the balance or the locked-total counter.
    #[error("balance overflow: current {current}, credit {credit}")]
    Overflow {
        /// The balance before the failed credit.
        current: u64,
        /// The amount that caused the overflow.
        credit: u64,
    },

    /// The external funds rail refused the transfer.
    #[error("funds transfer failed: {0}")]
    Transfer(#[from] TransferError),
}

// ---------------------------------------------------------------------------
// Receipts
// ---------------------------------------------------------------------------

/// Outcome of a normal withdrawal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalReceipt {
    /// Embers paid out.
    pub amount: u64,

    /// Balance left in the vault.
    pub remaining_balance: u64,

    /// True when this withdrawal drained the vault and deactivated it.
    pub closed: bool,
}

/// Outcome of an emergency release.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyReceipt {
    /// Embers paid out after the penalty.
    pub payout: u64,

    /// Embers forfeited to the custody pool.
    pub penalty: u64,
}

// ---------------------------------------------------------------------------
// VaultRegistry
// ---------------------------------------------------------------------------

/// The two global counters, always updated together under one lock.
#[derive(Debug, Default)]
struct AggregateTotals {
    /// Vaults ever created. Never decremented.
    total_vaults: u64,

    /// Running sum of active vault balances.
    total_locked: u64,
}

/// Thread-safe custody registry: one vault slot per account, an append-only
/// audit log, owner-gated administration, and aggregate counters.
pub struct VaultRegistry {
    /// Vault records keyed by owner account.
    vaults: DashMap<AccountId, Vault>,

    /// Append-only audit history, keyed by vault owner.
    log: TransactionLog,

    /// Registry owner plus the authorized-account set.
    access: AccessControl,

    /// Aggregate counters. Acquired after a vault guard, never before.
    totals: Mutex<AggregateTotals>,

    /// Time source for every unlock comparison.
    clock: Arc<dyn Clock>,

    /// External value rail.
    funds: Arc<dyn FundsTransfer>,

    /// Fire-and-forget event consumer.
    sink: Arc<dyn NotificationSink>,

    /// Custody rules in force.
    policy: VaultPolicy,
}

impl fmt::Debug for VaultRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Shard locks before the totals lock, same as every operation.
        let vault_count = self.vaults.len();
        let totals = self.totals.lock();
        f.debug_struct("VaultRegistry")
            .field("vaults", &vault_count)
            .field("total_vaults", &totals.total_vaults)
            .field("total_locked", &totals.total_locked)
            .field("policy", &self.policy)
            .finish()
    }
}

impl VaultRegistry {
    /// Creates a registry with the default [`VaultPolicy`].
    pub fn new(
        owner: AccountId,
        clock: Arc<dyn Clock>,
        funds: Arc<dyn FundsTransfer>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self::with_policy(owner, VaultPolicy::default(), clock, funds, sink)
    }

    /// Creates a registry with explicit custody rules.
    pub fn with_policy(
        owner: AccountId,
        policy: VaultPolicy,
        clock: Arc<dyn Clock>,
        funds: Arc<dyn FundsTransfer>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            vaults: DashMap::new(),
            log: TransactionLog::new(),
            access: AccessControl::new(owner),
            totals: Mutex::new(AggregateTotals::default()),
            clock,
            funds,
            sink,
            policy,
        }
    }

    /// The custody rules in force.
    pub fn policy(&self) -> &VaultPolicy {
        &self.policy
    }

    // -----------------------------------------------------------------------
    // Vault lifecycle
    // -----------------------------------------------------------------------

    /// Opens a vault for `owner`, funded with `deposit` embers and locked
    /// for `lock_days`.
    ///
    /// The following checks are applied in order:
    ///
    /// 1. **Inputs** -- non-zero deposit, lock within the policy window,
    ///    non-empty name, non-empty beneficiary when supplied.
    /// 2. **Slot** -- the account must not already have an active vault.
    ///    A drained record may be replaced; its history survives in the log.
    /// 3. **Counters** -- the locked total must not overflow.
    /// 4. **Escrow** -- the deposit moves through the funds rail. A refusal
    ///    aborts with nothing mutated and the caller never charged.
    ///
    /// On success the vault is stored, both counters advance, a creation
    /// record is logged, and `VaultOpened` then `BeneficiaryAssigned` are
    /// emitted. When no beneficiary is supplied the owner is their own
    /// beneficiary.
    pub fn create_vault(
        &self,
        owner: &AccountId,
        name: &str,
        lock_days: u32,
        beneficiary: Option<AccountId>,
        deposit: u64,
    ) -> Result<VaultInfo, VaultError> {
        // 1. Input validation, cheapest first.
        if deposit == 0 {
            return Err(VaultError::ZeroAmount);
        }
        if lock_days < self.policy.min_lock_days || lock_days > self.policy.max_lock_days {
            return Err(VaultError::LockOutOfRange {
                days: lock_days,
                min: self.policy.min_lock_days,
                max: self.policy.max_lock_days,
            });
        }
        if name.is_empty() {
            return Err(VaultError::EmptyName);
        }
        if let Some(candidate) = &beneficiary {
            if candidate.is_empty() {
                return Err(VaultError::EmptyBeneficiary);
            }
        }

        // 2. Slot check. The guard stays held through commit so a concurrent
        //    create on the same account cannot double-fund the slot.
        let entry = self.vaults.entry(owner.clone());
        if let Entry::Occupied(existing) = &entry {
            if existing.get().active {
                return Err(VaultError::AlreadyActive(owner.clone()));
            }
        }

        // 3. Counter headroom, checked under the totals lock which is held
        //    across the escrow call so the check cannot go stale.
        let mut totals = self.totals.lock();
        let new_locked =
            totals
                .total_locked
                .checked_add(deposit)
                .ok_or(VaultError::Overflow {
                    current: totals.total_locked,
                    credit: deposit,
                })?;

        // 4. Escrow the deposit before any ledger mutation.
        self.funds.deposit(owner, deposit)?;

        // Commit.
        let now = self.clock.now();
        let unlock_time = now + Duration::days(lock_days as i64);
        let beneficiary = beneficiary.unwrap_or_else(|| owner.clone());
        let vault = Vault {
            owner: owner.clone(),
            name: name.to_string(),
            balance: deposit,
            unlock_time,
            beneficiary: beneficiary.clone(),
            active: true,
            created_at: now,
        };
        let info = VaultInfo::from_vault(&vault, now);

        match entry {
            Entry::Occupied(mut slot) => {
                slot.insert(vault);
            }
            Entry::Vacant(slot) => {
                slot.insert(vault);
            }
        }
        totals.total_vaults += 1;
        totals.total_locked = new_locked;
        drop(totals);

        self.log.append(
            owner,
            TransactionRecord::new(
                owner.clone(),
                AccountId::custody(),
                deposit,
                now,
                format!(
                    "opened vault \"{}\" with {} {}",
                    name,
                    deposit,
                    config::UNIT_NAME
                ),
            ),
        );
        self.sink.emit(VaultEvent::VaultOpened {
            account: owner.clone(),
            name: name.to_string(),
            amount: deposit,
            unlock_time,
        });
        self.sink.emit(VaultEvent::BeneficiaryAssigned {
            account: owner.clone(),
            beneficiary,
        });

        tracing::debug!(account = %owner, deposit, lock_days, "vault created");
        Ok(info)
    }

    /// Adds `amount` embers to an active vault. Returns the new balance.
    ///
    /// The escrow call happens after the balance and counter headroom
    /// checks, so an accepted transfer is always followed by a commit.
    pub fn deposit(&self, account: &AccountId, amount: u64) -> Result<u64, VaultError> {
        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }

        let mut vault = self.lookup_active_mut(account)?;

        let new_balance = vault
            .balance
            .checked_add(amount)
            .ok_or(VaultError::Overflow {
                current: vault.balance,
                credit: amount,
            })?;

        let mut totals = self.totals.lock();
        let new_locked = totals
            .total_locked
            .checked_add(amount)
            .ok_or(VaultError::Overflow {
                current: totals.total_locked,
                credit: amount,
            })?;

        self.funds.deposit(account, amount)?;

        vault.balance = new_balance;
        totals.total_locked = new_locked;
        drop(totals);

        let now = self.clock.now();
        self.log.append(
            account,
            TransactionRecord::new(
                account.clone(),
                AccountId::custody(),
                amount,
                now,
                format!("deposit of {} {}", amount, config::UNIT_NAME),
            ),
        );
        self.sink.emit(VaultEvent::FundsDeposited {
            account: account.clone(),
            amount,
            balance: new_balance,
        });

        tracing::debug!(account = %account, amount, balance = new_balance, "deposit");
        Ok(new_balance)
    }

    /// Withdraws `amount` embers from an unlocked vault. Draining the vault
    /// deactivates it.
    pub fn withdraw(
        &self,
        account: &AccountId,
        amount: u64,
    ) -> Result<WithdrawalReceipt, VaultError> {
        if amount == 0 {
            return Err(VaultError::ZeroAmount);
        }

        let mut vault = self.lookup_active_mut(account)?;

        if amount > vault.balance {
            return Err(VaultError::InsufficientBalance {
                available: vault.balance,
                requested: amount,
            });
        }

        let now = self.clock.now();
        if !vault.is_unlocked(now) {
            return Err(VaultError::StillLocked {
                unlock_time: vault.unlock_time,
                days_left: vault.days_left(now),
            });
        }

        // Pay out first; commit only once the rail has accepted.
        self.funds.payout(account, amount)?;

        vault.balance -= amount;
        let remaining = vault.balance;
        let closed = remaining == 0;
        if closed {
            vault.active = false;
        }

        {
            let mut totals = self.totals.lock();
            totals.total_locked = totals.total_locked.saturating_sub(amount);
        }

        self.log.append(
            account,
            TransactionRecord::new(
                AccountId::custody(),
                account.clone(),
                amount,
                now,
                format!("withdrawal of {} {}", amount, config::UNIT_NAME),
            ),
        );
        self.sink.emit(VaultEvent::FundsWithdrawn {
            recipient: account.clone(),
            amount,
            remaining,
        });

        tracing::debug!(account = %account, amount, remaining, closed, "withdrawal");
        Ok(WithdrawalReceipt {
            amount,
            remaining_balance: remaining,
            closed,
        })
    }

    /// Drains an active vault immediately, bypassing the time lock, at the
    /// cost of the policy penalty. The penalty stays in the custody pool
    /// and leaves the ledger's books.
    pub fn emergency_withdraw(&self, account: &AccountId) -> Result<EmergencyReceipt, VaultError> {
        let mut vault = self.lookup_active_mut(account)?;

        if vault.balance == 0 {
            return Err(VaultError::EmptyVault(account.clone()));
        }

        let drained = vault.balance;
        let penalty = self.policy.emergency_penalty(drained).min(drained);
        let payout = drained - penalty;
        let now = self.clock.now();

        // No time-lock check: this is the escape hatch.
        self.funds.payout(account, payout)?;

        vault.balance = 0;
        vault.active = false;

        {
            let mut totals = self.totals.lock();
            totals.total_locked = totals.total_locked.saturating_sub(drained);
        }

        self.log.append(
            account,
            TransactionRecord::new(
                AccountId::custody(),
                account.clone(),
                payout,
                now,
                format!(
                    "emergency release of {} {} ({} {} penalty forfeited)",
                    payout,
                    config::UNIT_NAME,
                    penalty,
                    config::UNIT_NAME
                ),
            ),
        );
        self.sink.emit(VaultEvent::EmergencyReleased {
            account: account.clone(),
            payout,
            penalty,
        });

        tracing::debug!(account = %account, payout, penalty, "emergency release");
        Ok(EmergencyReceipt { payout, penalty })
    }

    /// Claims the full balance of `vault_owner`'s vault as its beneficiary.
    ///
    /// Opens strictly after `unlock_time + grace`: at exactly the deadline
    /// the claim still fails. The payout goes to the caller and the log
    /// record lands in the vault owner's history with the caller as the
    /// receiving side.
    pub fn claim_as_beneficiary(
        &self,
        caller: &AccountId,
        vault_owner: &AccountId,
    ) -> Result<u64, VaultError> {
        let mut vault = self
            .vaults
            .get_mut(vault_owner)
            .ok_or_else(|| VaultError::UnknownAccount(vault_owner.clone()))?;

        if &vault.beneficiary != caller {
            return Err(VaultError::NotBeneficiary {
                caller: caller.clone(),
            });
        }
        if !vault.active {
            return Err(VaultError::VaultInactive(vault_owner.clone()));
        }
        if vault.balance == 0 {
            return Err(VaultError::EmptyVault(vault_owner.clone()));
        }

        let now = self.clock.now();
        let grace = self.policy.grace_period();
        if !vault.is_claimable(now, grace) {
            return Err(VaultError::GraceNotElapsed {
                claimable_at: vault.claimable_at(grace),
            });
        }

        let claimed = vault.balance;
        self.funds.payout(caller, claimed)?;

        vault.balance = 0;
        vault.active = false;

        {
            let mut totals = self.totals.lock();
            totals.total_locked = totals.total_locked.saturating_sub(claimed);
        }

        self.log.append(
            vault_owner,
            TransactionRecord::new(
                AccountId::custody(),
                caller.clone(),
                claimed,
                now,
                format!(
                    "beneficiary claim of {} {} by {}",
                    claimed,
                    config::UNIT_NAME,
                    caller
                ),
            ),
        );
        // Attributed to the claimant, not the vault owner.
        self.sink.emit(VaultEvent::FundsWithdrawn {
            recipient: caller.clone(),
            amount: claimed,
            remaining: 0,
        });

        tracing::debug!(owner = %vault_owner, claimant = %caller, claimed, "beneficiary claim");
        Ok(claimed)
    }

    /// Points an active vault at a new beneficiary.
    pub fn update_beneficiary(
        &self,
        account: &AccountId,
        new_beneficiary: AccountId,
    ) -> Result<(), VaultError> {
        let mut vault = self.lookup_active_mut(account)?;

        if new_beneficiary.is_empty() {
            return Err(VaultError::EmptyBeneficiary);
        }

        vault.beneficiary = new_beneficiary.clone();
        self.sink.emit(VaultEvent::BeneficiaryAssigned {
            account: account.clone(),
            beneficiary: new_beneficiary,
        });
        Ok(())
    }

    /// Pushes an active vault's unlock time further out. Returns the new
    /// unlock time. Extensions accumulate without cap; each call is bounded
    /// to the policy's per-call window. No event, no log record.
    pub fn extend_lock(
        &self,
        account: &AccountId,
        additional_days: u32,
    ) -> Result<DateTime<Utc>, VaultError> {
        let mut vault = self.lookup_active_mut(account)?;

        if additional_days < 1 || additional_days > self.policy.max_extension_days {
            return Err(VaultError::LockOutOfRange {
                days: additional_days,
                min: 1,
                max: self.policy.max_extension_days,
            });
        }

        vault.unlock_time = vault.unlock_time + Duration::days(additional_days as i64);
        Ok(vault.unlock_time)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// The current state of an account's vault, drained records included.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::UnknownAccount`] only when the account has
    /// never had a vault.
    pub fn vault_info(&self, account: &AccountId) -> Result<VaultInfo, VaultError> {
        let vault = self
            .vaults
            .get(account)
            .ok_or_else(|| VaultError::UnknownAccount(account.clone()))?;
        Ok(VaultInfo::from_vault(&vault, self.clock.now()))
    }

    /// Full ordered transaction history for an account. Empty for accounts
    /// with no records.
    pub fn history(&self, account: &AccountId) -> Vec<TransactionRecord> {
        self.log.history(account)
    }

    /// Number of transaction records for an account.
    pub fn transaction_count(&self, account: &AccountId) -> usize {
        self.log.count(account)
    }

    /// A single transaction record by index, in insertion order.
    pub fn transaction(
        &self,
        account: &AccountId,
        index: usize,
    ) -> Result<TransactionRecord, LogError> {
        self.log.get(account, index)
    }

    /// Aggregate snapshot: vaults ever created, the running locked total,
    /// and the live sum over active vaults.
    pub fn stats(&self) -> LedgerStats {
        let held_balance: u64 = self
            .vaults
            .iter()
            .filter(|entry| entry.value().active)
            .map(|entry| entry.value().balance)
            .sum();

        let totals = self.totals.lock();
        LedgerStats {
            total_vaults: totals.total_vaults,
            total_locked: totals.total_locked,
            held_balance,
        }
    }

    /// Number of currently active vaults.
    pub fn active_vaults(&self) -> usize {
        self.vaults
            .iter()
            .filter(|entry| entry.value().active)
            .count()
    }

    // -----------------------------------------------------------------------
    // Administration
    // -----------------------------------------------------------------------

    /// The registry owner.
    pub fn owner(&self) -> &AccountId {
        self.access.owner()
    }

    /// Owner-only: adds an account to the authorized set. The set is
    /// bookkeeping; no vault operation consults it.
    pub fn authorize_account(
        &self,
        caller: &AccountId,
        target: AccountId,
    ) -> Result<bool, AccessError> {
        self.access.authorize(caller, target)
    }

    /// Owner-only: removes an account from the authorized set.
    pub fn revoke_account(
        &self,
        caller: &AccountId,
        target: &AccountId,
    ) -> Result<bool, AccessError> {
        self.access.revoke(caller, target)
    }

    /// True if `account` is in the authorized set.
    pub fn is_authorized(&self, account: &AccountId) -> bool {
        self.access.is_authorized(account)
    }

    /// Size of the authorized set.
    pub fn authorized_count(&self) -> usize {
        self.access.authorized_count()
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    /// Mutable guard over an account's vault, rejecting missing records and
    /// drained vaults. The guard serializes same-account operations.
    fn lookup_active_mut(
        &self,
        account: &AccountId,
    ) -> Result<dashmap::mapref::one::RefMut<'_, AccountId, Vault>, VaultError> {
        let vault = self
            .vaults
            .get_mut(account)
            .ok_or_else(|| VaultError::UnknownAccount(account.clone()))?;
        if !vault.active {
            return Err(VaultError::VaultInactive(account.clone()));
        }
        Ok(vault)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
