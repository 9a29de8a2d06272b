//! # Vault Event Notifications
//!
//! Every state-changing vault operation announces itself through a
//! [`NotificationSink`]. Emission is fire-and-forget: sinks cannot fail,
//! cannot veto the operation, and run inside the operation's critical
//! section, so keep them fast.
//!
//! Shipped sinks: [`NullSink`] discards, [`TracingSink`] writes one
//! structured log line per event, [`BufferedSink`] queues events in memory
//! for tests to drain and assert on.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::account::AccountId;

// ---------------------------------------------------------------------------
// VaultEvent
// ---------------------------------------------------------------------------

/// Events emitted by vault operations.
///
/// Creation emits two events in order: the opening, then the initial
/// beneficiary assignment. Lock extensions emit nothing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum VaultEvent {
    /// A vault was created and funded.
    #[serde(rename = "vault_opened")]
    VaultOpened {
        account: AccountId,
        name: String,
        amount: u64,
        unlock_time: DateTime<Utc>,
    },
    /// A beneficiary was assigned, at creation or via an explicit update.
    #[serde(rename = "beneficiary_assigned")]
    BeneficiaryAssigned {
        account: AccountId,
        beneficiary: AccountId,
    },
    /// Funds were added to an existing vault.
    #[serde(rename = "funds_deposited")]
    FundsDeposited {
        account: AccountId,
        amount: u64,
        balance: u64,
    },
    /// Funds left custody toward `recipient`: the vault owner on a normal
    /// withdrawal, the claiming beneficiary on a claim.
    #[serde(rename = "funds_withdrawn")]
    FundsWithdrawn {
        recipient: AccountId,
        amount: u64,
        remaining: u64,
    },
    /// A vault was drained ahead of its unlock time, penalty applied.
    #[serde(rename = "emergency_released")]
    EmergencyReleased {
        account: AccountId,
        payout: u64,
        penalty: u64,
    },
}

impl VaultEvent {
    /// Stable label for logs and metrics, identical to the serde tag.
    pub fn label(&self) -> &'static str {
        match self {
            VaultEvent::VaultOpened { .. } => "vault_opened",
            VaultEvent::BeneficiaryAssigned { .. } => "beneficiary_assigned",
            VaultEvent::FundsDeposited { .. } => "funds_deposited",
            VaultEvent::FundsWithdrawn { .. } => "funds_withdrawn",
            VaultEvent::EmergencyReleased { .. } => "emergency_released",
        }
    }
}

// ---------------------------------------------------------------------------
// NotificationSink
// ---------------------------------------------------------------------------

/// Fire-and-forget event consumer.
pub trait NotificationSink: Send + Sync {
    /// Receives one event. Must not block for long and must not panic.
    fn emit(&self, event: VaultEvent);
}

/// Discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn emit(&self, _event: VaultEvent) {}
}

/// Writes one structured log line per event at `info` level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn emit(&self, event: VaultEvent) {
        match &event {
            VaultEvent::VaultOpened {
                account,
                name,
                amount,
                unlock_time,
            } => {
                tracing::info!(%account, name, amount, %unlock_time, "vault opened");
            }
            VaultEvent::BeneficiaryAssigned {
                account,
                beneficiary,
            } => {
                tracing::info!(%account, %beneficiary, "beneficiary assigned");
            }
            VaultEvent::FundsDeposited {
                account,
                amount,
                balance,
            } => {
                tracing::info!(%account, amount, balance, "funds deposited");
            }
            VaultEvent::FundsWithdrawn {
                recipient,
                amount,
                remaining,
            } => {
                tracing::info!(%recipient, amount, remaining, "funds withdrawn");
            }
            VaultEvent::EmergencyReleased {
                account,
                payout,
                penalty,
            } => {
                tracing::info!(%account, payout, penalty, "emergency release");
            }
        }
    }
}

/// Queues events in memory, in emission order.
#[derive(Debug, Default)]
pub struct BufferedSink {
    events: Mutex<Vec<VaultEvent>>,
}

impl BufferedSink {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns everything emitted so far, oldest first.
    pub fn drain(&self) -> Vec<VaultEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Number of buffered events.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// True if nothing has been emitted since the last drain.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl NotificationSink for BufferedSink {
    fn emit(&self, event: VaultEvent) {
        self.events.lock().push(event);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
