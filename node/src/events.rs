//! # Event Bridge
//!
//! Connects the ledger's notification stream to the node's observability
//! surfaces. The registry emits [`VaultEvent`]s synchronously; the bridge
//! fans each one out three ways: a structured log line, a Prometheus
//! counter bump, and a broadcast send for WebSocket subscribers.
//!
//! The bridge never blocks and never fails the emitting operation. A full
//! broadcast channel, or one with no subscribers, just drops the event for
//! streaming purposes; the ledger's audit log remains the source of truth.

use tokio::sync::broadcast;

use vesta_ledger::notify::{NotificationSink, VaultEvent};

use crate::metrics::SharedMetrics;

/// Fans ledger events out to logging, metrics, and WebSocket streams.
pub struct EventBridge {
    /// Broadcast side of the WebSocket fan-out.
    tx: broadcast::Sender<VaultEvent>,
    /// Counter and histogram handles.
    metrics: SharedMetrics,
}

impl EventBridge {
    /// Creates a bridge over an existing broadcast channel.
    pub fn new(tx: broadcast::Sender<VaultEvent>, metrics: SharedMetrics) -> Self {
        Self { tx, metrics }
    }
}

impl NotificationSink for EventBridge {
    fn emit(&self, event: VaultEvent) {
        match &event {
            VaultEvent::VaultOpened {
                account, amount, ..
            } => {
                self.metrics.vaults_opened_total.inc();
                self.metrics.deposit_size_embers.observe(*amount as f64);
                tracing::info!(account = %account, amount, "vault opened");
            }
            VaultEvent::BeneficiaryAssigned {
                account,
                beneficiary,
            } => {
                tracing::info!(account = %account, beneficiary = %beneficiary, "beneficiary assigned");
            }
            VaultEvent::FundsDeposited {
                account,
                amount,
                balance,
            } => {
                self.metrics.deposits_total.inc();
                self.metrics.deposit_size_embers.observe(*amount as f64);
                tracing::info!(account = %account, amount, balance, "funds deposited");
            }
            VaultEvent::FundsWithdrawn {
                recipient,
                amount,
                remaining,
            } => {
                self.metrics.withdrawals_total.inc();
                tracing::info!(recipient = %recipient, amount, remaining, "funds withdrawn");
            }
            VaultEvent::EmergencyReleased {
                account,
                payout,
                penalty,
            } => {
                self.metrics.emergency_releases_total.inc();
                tracing::info!(account = %account, payout, penalty, "emergency release");
            }
        }

        // Send only fails when nobody is subscribed, which is not an error.
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::NodeMetrics;
    use std::sync::Arc;
    use vesta_ledger::account::AccountId;

    #[tokio::test]
    async fn bridge_forwards_events_and_counts_them() {
        let (tx, mut rx) = broadcast::channel(16);
        let metrics = Arc::new(NodeMetrics::new());
        let bridge = EventBridge::new(tx, metrics.clone());

        bridge.emit(VaultEvent::VaultOpened {
            account: AccountId::new("vesta:alice"),
            name: "demo".into(),
            amount: 1_000,
            unlock_time: chrono::Utc::now(),
        });
        bridge.emit(VaultEvent::FundsDeposited {
            account: AccountId::new("vesta:alice"),
            amount: 250,
            balance: 1_250,
        });

        assert_eq!(metrics.vaults_opened_total.get(), 1);
        assert_eq!(metrics.deposits_total.get(), 1);

        let first = rx.recv().await.unwrap();
        assert_eq!(first.label(), "vault_opened");
        let second = rx.recv().await.unwrap();
        assert_eq!(second.label(), "funds_deposited");
    }

    #[tokio::test]
    async fn emit_without_subscribers_does_not_panic() {
        let (tx, _) = broadcast::channel(16);
        let metrics = Arc::new(NodeMetrics::new());
        let bridge = EventBridge::new(tx, metrics.clone());

        // The initial receiver was dropped; send has nowhere to go.
        bridge.emit(VaultEvent::EmergencyReleased {
            account: AccountId::new("vesta:bob"),
            payout: 900,
            penalty: 100,
        });
        assert_eq!(metrics.emergency_releases_total.get(), 1);
    }
}
