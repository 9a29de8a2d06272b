//! End-to-end integration tests for the VESTA custody ledger.
//!
//! These tests exercise full vault lifecycles through the public registry
//! API: creation, deposits, time-locked withdrawals, emergency releases,
//! beneficiary claims, and the bookkeeping that ties them together. They
//! prove that the registry, the treasury rail, the audit log, the event
//! sink, and the aggregate counters stay consistent with each other no
//! matter which path value takes out of a vault.
//!
//! Each test stands alone with its own registry, treasury, and manual
//! clock. No shared state, no test ordering dependencies, no flaky
//! failures.

use std::sync::Arc;

use vesta_ledger::account::AccountId;
use vesta_ledger::clock::ManualClock;
use vesta_ledger::config;
use vesta_ledger::notify::{BufferedSink, VaultEvent};
use vesta_ledger::treasury::Treasury;
use vesta_ledger::vault::{VaultError, VaultRegistry};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

/// Spins up a full custody stack on a manual clock. Returns the shared
/// components so tests can inspect them directly.
fn setup() -> (VaultRegistry, Arc<ManualClock>, Arc<Treasury>, Arc<BufferedSink>) {
    let clock = Arc::new(ManualClock::starting_now());
    let treasury = Arc::new(Treasury::new());
    let sink = Arc::new(BufferedSink::new());
    let registry = VaultRegistry::new(
        AccountId::new("vesta:custodian"),
        clock.clone(),
        treasury.clone(),
        sink.clone(),
    );
    (registry, clock, treasury, sink)
}

/// Creates an account and gives it an external balance to lock up.
fn fund(treasury: &Treasury, name: &str, amount: u64) -> AccountId {
    let account = AccountId::new(format!("vesta:{}", name));
    treasury.credit_external(&account, amount).unwrap();
    account
}

// ---------------------------------------------------------------------------
// 1. Full Custody Lifecycle
// ---------------------------------------------------------------------------

#[test]
fn full_custody_lifecycle() {
    let (registry, clock, treasury, _sink) = setup();
    let alice = fund(&treasury, "alice", 1_000);

    // Open a 30-day vault with the whole balance.
    let info = registry
        .create_vault(&alice, "first egg", 30, None, 1_000)
        .unwrap();
    assert_eq!(info.balance, 1_000);
    assert_eq!(info.days_left, 30);
    assert!(info.active);

    let stats = registry.stats();
    assert_eq!(stats.total_vaults, 1);
    assert_eq!(stats.total_locked, 1_000);
    assert_eq!(registry.transaction_count(&alice), 1);
    assert_eq!(treasury.external_balance(&alice), 0);
    assert_eq!(treasury.pool_balance(), 1_000);

    // Too early: the lock holds and nothing moves.
    let early = registry.withdraw(&alice, 500);
    assert!(matches!(early, Err(VaultError::StillLocked { .. })));
    assert_eq!(registry.vault_info(&alice).unwrap().balance, 1_000);
    assert_eq!(registry.transaction_count(&alice), 1);

    // Day 30: the lock opens, inclusive.
    clock.advance_days(30);
    let receipt = registry.withdraw(&alice, 500).unwrap();
    assert_eq!(receipt.remaining_balance, 500);
    assert!(!receipt.closed);
    assert_eq!(registry.stats().total_locked, 500);
    assert_eq!(registry.transaction_count(&alice), 2);

    // Draining the rest closes the vault.
    let receipt = registry.withdraw(&alice, 500).unwrap();
    assert!(receipt.closed);

    let info = registry.vault_info(&alice).unwrap();
    assert!(!info.active);
    assert_eq!(info.balance, 0);

    let stats = registry.stats();
    assert_eq!(stats.total_vaults, 1); // never decremented
    assert_eq!(stats.total_locked, 0);
    assert_eq!(registry.transaction_count(&alice), 3);

    // Every ember is back where it started.
    assert_eq!(treasury.external_balance(&alice), 1_000);
    assert_eq!(treasury.pool_balance(), 0);
}

// ---------------------------------------------------------------------------
// 2. Deposits Compound Into The Locked Total
// ---------------------------------------------------------------------------

#[test]
fn deposits_compound_into_locked_total() {
    let (registry, _clock, treasury, _sink) = setup();
    let alice = fund(&treasury, "alice", 10_000);

    registry
        .create_vault(&alice, "growing", 90, None, 2_000)
        .unwrap();
    registry.deposit(&alice, 1_500).unwrap();
    let balance = registry.deposit(&alice, 500).unwrap();

    assert_eq!(balance, 4_000);
    assert_eq!(registry.stats().total_locked, 4_000);
    assert_eq!(treasury.pool_balance(), 4_000);
    assert_eq!(treasury.external_balance(&alice), 6_000);
    // Creation plus two deposits.
    assert_eq!(registry.transaction_count(&alice), 3);
}

// ---------------------------------------------------------------------------
// 3. Emergency Release With Penalty
// ---------------------------------------------------------------------------

#[test]
fn emergency_release_with_penalty() {
    let (registry, _clock, treasury, sink) = setup();
    let alice = fund(&treasury, "alice", 2_000);

    registry
        .create_vault(&alice, "urgent", 365, None, 2_000)
        .unwrap();
    sink.drain();

    let receipt = registry.emergency_withdraw(&alice).unwrap();
    assert_eq!(receipt.payout, 1_800); // 2000 - 10%
    assert_eq!(receipt.penalty, 200);

    // The payout came back; the penalty stayed in the custody pool.
    assert_eq!(treasury.external_balance(&alice), 1_800);
    assert_eq!(treasury.pool_balance(), 200);

    // The full drained amount leaves the books, not just the payout.
    let stats = registry.stats();
    assert_eq!(stats.total_locked, 0);
    assert!(stats.is_reconciled());

    let events = sink.drain();
    assert_eq!(events.len(), 1);
    assert!(matches!(
        events[0],
        VaultEvent::EmergencyReleased {
            payout: 1_800,
            penalty: 200,
            ..
        }
    ));
}

// ---------------------------------------------------------------------------
// 4. Penalty Floors On Tiny Balances
// ---------------------------------------------------------------------------

#[test]
fn penalty_floors_on_tiny_balances() {
    let (registry, _clock, treasury, _sink) = setup();

    // Below 10 embers the 10% penalty floors to zero.
    let alice = fund(&treasury, "alice", 9);
    registry.create_vault(&alice, "pennies", 30, None, 9).unwrap();
    let receipt = registry.emergency_withdraw(&alice).unwrap();
    assert_eq!(receipt.payout, 9);
    assert_eq!(receipt.penalty, 0);

    // At 15 embers the penalty is exactly 1 (15 * 10 / 100 floored).
    let bob = fund(&treasury, "bob", 15);
    registry.create_vault(&bob, "pennies", 30, None, 15).unwrap();
    let receipt = registry.emergency_withdraw(&bob).unwrap();
    assert_eq!(receipt.payout, 14);
    assert_eq!(receipt.penalty, 1);
}

// ---------------------------------------------------------------------------
// 5. Beneficiary Claim After Grace
// ---------------------------------------------------------------------------

#[test]
fn beneficiary_claim_after_grace() {
    let (registry, clock, treasury, sink) = setup();
    let alice = fund(&treasury, "alice", 5_000);
    let bob = AccountId::new("vesta:bob");

    registry
        .create_vault(&alice, "inheritance", 30, Some(bob.clone()), 5_000)
        .unwrap();
    sink.drain();

    // 30-day lock plus 30-day grace, then one second past the deadline.
    clock.advance_days(30 + config::BENEFICIARY_GRACE_DAYS);
    clock.advance_secs(1);

    let claimed = registry.claim_as_beneficiary(&bob, &alice).unwrap();
    assert_eq!(claimed, 5_000);

    // The payout went to Bob, not back to Alice.
    assert_eq!(treasury.external_balance(&bob), 5_000);
    assert_eq!(treasury.external_balance(&alice), 0);

    // The vault is spent and the books are clean.
    let info = registry.vault_info(&alice).unwrap();
    assert!(!info.active);
    assert_eq!(registry.stats().total_locked, 0);

    // The claim is attributed to Bob in the withdrawal event.
    let events = sink.drain();
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        VaultEvent::FundsWithdrawn { recipient, amount: 5_000, remaining: 0 } if *recipient == bob
    ));
}

// ---------------------------------------------------------------------------
// 6. Claim Blocked At The Exact Deadline
// ---------------------------------------------------------------------------

#[test]
fn claim_blocked_at_exact_deadline() {
    let (registry, clock, treasury, _sink) = setup();
    let alice = fund(&treasury, "alice", 1_000);
    let bob = AccountId::new("vesta:bob");

    registry
        .create_vault(&alice, "inheritance", 30, Some(bob.clone()), 1_000)
        .unwrap();

    // Exactly at unlock + grace the gate stays shut.
    clock.advance_days(30 + config::BENEFICIARY_GRACE_DAYS);
    let result = registry.claim_as_beneficiary(&bob, &alice);
    assert!(matches!(result, Err(VaultError::GraceNotElapsed { .. })));

    // The owner, meanwhile, has been free to withdraw since day 30.
    let receipt = registry.withdraw(&alice, 1_000).unwrap();
    assert!(receipt.closed);
}

// ---------------------------------------------------------------------------
// 7. Slot Reopening After Drain
// ---------------------------------------------------------------------------

#[test]
fn slot_reopening_preserves_history_and_counters() {
    let (registry, clock, treasury, _sink) = setup();
    let alice = fund(&treasury, "alice", 10_000);

    registry
        .create_vault(&alice, "first", 30, None, 3_000)
        .unwrap();
    registry.emergency_withdraw(&alice).unwrap();

    // A second vault while the first is active would be rejected; after a
    // drain the slot is free again.
    let info = registry
        .create_vault(&alice, "second", 60, None, 4_000)
        .unwrap();
    assert_eq!(info.name, "second");
    assert_eq!(info.days_left, 60);

    let stats = registry.stats();
    assert_eq!(stats.total_vaults, 2);
    assert_eq!(stats.total_locked, 4_000);

    // History spans both vaults: create, emergency, create.
    assert_eq!(registry.transaction_count(&alice), 3);

    clock.advance_days(60);
    registry.withdraw(&alice, 4_000).unwrap();
    assert_eq!(registry.transaction_count(&alice), 4);
}

// ---------------------------------------------------------------------------
// 8. Escrow Refusal Leaves No Trace
// ---------------------------------------------------------------------------

#[test]
fn escrow_refusal_leaves_no_trace() {
    let (registry, _clock, treasury, sink) = setup();
    let pauper = AccountId::new("vesta:pauper");

    // No external balance: the treasury refuses the escrow.
    let result = registry.create_vault(&pauper, "dreams", 30, None, 1_000);
    assert!(matches!(result, Err(VaultError::Transfer(_))));

    // Nothing was created, counted, logged, or announced.
    assert!(matches!(
        registry.vault_info(&pauper),
        Err(VaultError::UnknownAccount(_))
    ));
    let stats = registry.stats();
    assert_eq!(stats.total_vaults, 0);
    assert_eq!(stats.total_locked, 0);
    assert_eq!(registry.transaction_count(&pauper), 0);
    assert!(sink.is_empty());
    assert_eq!(treasury.pool_balance(), 0);

    // Partial funding fails the same way on deposit top-ups.
    let alice = fund(&treasury, "alice", 1_000);
    registry.create_vault(&alice, "thin", 30, None, 900).unwrap();
    let result = registry.deposit(&alice, 500); // only 100 left outside
    assert!(matches!(result, Err(VaultError::Transfer(_))));
    assert_eq!(registry.vault_info(&alice).unwrap().balance, 900);
    assert_eq!(registry.stats().total_locked, 900);
}

// ---------------------------------------------------------------------------
// 9. Conservation Across Mixed Traffic
// ---------------------------------------------------------------------------

#[test]
fn conservation_across_mixed_traffic() {
    let (registry, clock, treasury, _sink) = setup();
    let alice = fund(&treasury, "alice", 10_000);
    let bob = fund(&treasury, "bob", 10_000);
    let carol = fund(&treasury, "carol", 10_000);
    let dave = fund(&treasury, "dave", 10_000);

    registry.create_vault(&alice, "a", 30, None, 4_000).unwrap();
    registry.create_vault(&bob, "b", 30, None, 3_000).unwrap();
    registry
        .create_vault(&carol, "c", 90, Some(dave.clone()), 2_000)
        .unwrap();
    registry.deposit(&alice, 1_000).unwrap();

    // Bob bails out early: 3000 leaves the books, 300 stays in the pool.
    registry.emergency_withdraw(&bob).unwrap();

    // Alice withdraws half at unlock.
    clock.advance_days(30);
    registry.withdraw(&alice, 2_500).unwrap();

    // Dave claims Carol's vault after the grace period.
    clock.advance_days(60 + config::BENEFICIARY_GRACE_DAYS);
    clock.advance_secs(1);
    registry.claim_as_beneficiary(&dave, &carol).unwrap();

    // Books: alice 2500 still locked, everything else released.
    let stats = registry.stats();
    assert_eq!(stats.total_vaults, 3);
    assert_eq!(stats.total_locked, 2_500);
    assert!(stats.is_reconciled());
    assert_eq!(registry.active_vaults(), 1);

    // Pool holds the locked remainder plus the forfeited penalty.
    assert_eq!(treasury.pool_balance(), 2_500 + 300);

    // External balances line up ember for ember.
    assert_eq!(treasury.external_balance(&alice), 7_500); // 10000 - 5000 + 2500
    assert_eq!(treasury.external_balance(&bob), 9_700); // 10000 - 3000 + 2700
    assert_eq!(treasury.external_balance(&carol), 8_000); // 10000 - 2000
    assert_eq!(treasury.external_balance(&dave), 12_000); // 10000 + 2000
}

// ---------------------------------------------------------------------------
// 10. The Audit Log Tells The Whole Story
// ---------------------------------------------------------------------------

#[test]
fn audit_log_tells_the_whole_story() {
    let (registry, clock, treasury, _sink) = setup();
    let alice = fund(&treasury, "alice", 5_000);
    let bob = AccountId::new("vesta:bob");
    let custody = AccountId::custody();

    registry
        .create_vault(&alice, "story", 30, Some(bob.clone()), 2_000)
        .unwrap();
    registry.deposit(&alice, 1_000).unwrap();
    clock.advance_days(30 + config::BENEFICIARY_GRACE_DAYS);
    clock.advance_secs(1);
    registry.claim_as_beneficiary(&bob, &alice).unwrap();

    let history = registry.history(&alice);
    assert_eq!(history.len(), 3);

    // Creation: owner pays in to custody.
    assert_eq!(history[0].from, alice);
    assert_eq!(history[0].to, custody);
    assert_eq!(history[0].amount, 2_000);
    assert!(history[0].executed);

    // Deposit: same direction.
    assert_eq!(history[1].from, alice);
    assert_eq!(history[1].to, custody);
    assert_eq!(history[1].amount, 1_000);

    // Claim: custody pays the beneficiary, recorded in the owner's history.
    assert_eq!(history[2].from, custody);
    assert_eq!(history[2].to, bob);
    assert_eq!(history[2].amount, 3_000);

    // Timestamps never go backwards.
    assert!(history[1].timestamp >= history[0].timestamp);
    assert!(history[2].timestamp >= history[1].timestamp);

    // Record ids are unique.
    assert_ne!(history[0].id, history[1].id);
    assert_ne!(history[1].id, history[2].id);

    // The beneficiary's own history is empty; nothing was keyed to Bob.
    assert!(registry.history(&bob).is_empty());
}

// ---------------------------------------------------------------------------
// 11. Extension Holds The Door Shut
// ---------------------------------------------------------------------------

#[test]
fn extension_holds_the_door_shut() {
    let (registry, clock, treasury, sink) = setup();
    let alice = fund(&treasury, "alice", 1_000);

    registry
        .create_vault(&alice, "patience", 30, None, 1_000)
        .unwrap();
    sink.drain();

    registry.extend_lock(&alice, 30).unwrap();

    // Extensions are silent: no event, no log record.
    assert!(sink.is_empty());
    assert_eq!(registry.transaction_count(&alice), 1);

    // Day 30 is no longer enough.
    clock.advance_days(30);
    assert!(matches!(
        registry.withdraw(&alice, 1_000),
        Err(VaultError::StillLocked { days_left: 30, .. })
    ));

    // Day 60 is.
    clock.advance_days(30);
    assert!(registry.withdraw(&alice, 1_000).unwrap().closed);
}

// ---------------------------------------------------------------------------
// 12. Beneficiary Update Redirects Claims
// ---------------------------------------------------------------------------

#[test]
fn beneficiary_update_redirects_claims() {
    let (registry, clock, treasury, _sink) = setup();
    let alice = fund(&treasury, "alice", 1_000);
    let bob = AccountId::new("vesta:bob");
    let carol = AccountId::new("vesta:carol");

    registry
        .create_vault(&alice, "redirect", 30, Some(bob.clone()), 1_000)
        .unwrap();
    registry.update_beneficiary(&alice, carol.clone()).unwrap();

    clock.advance_days(30 + config::BENEFICIARY_GRACE_DAYS + 1);

    // The old beneficiary is locked out, the new one collects.
    assert!(matches!(
        registry.claim_as_beneficiary(&bob, &alice),
        Err(VaultError::NotBeneficiary { .. })
    ));
    assert_eq!(registry.claim_as_beneficiary(&carol, &alice).unwrap(), 1_000);
    assert_eq!(treasury.external_balance(&carol), 1_000);
}

// ---------------------------------------------------------------------------
// 13. Concurrent Accounts Stay Independent
// ---------------------------------------------------------------------------

#[test]
fn concurrent_accounts_stay_independent() {
    use std::thread;

    let (registry, clock, treasury, _sink) = setup();
    let registry = Arc::new(registry);

    let mut handles = vec![];
    for i in 0..10 {
        let registry = Arc::clone(&registry);
        let treasury = Arc::clone(&treasury);
        handles.push(thread::spawn(move || {
            let account = AccountId::new(format!("vesta:worker_{}", i));
            treasury.credit_external(&account, 5_000).unwrap();
            registry
                .create_vault(&account, "worker vault", 30, None, 1_000)
                .unwrap();
            registry.deposit(&account, 200).unwrap();
        }));
    }
    for handle in handles {
        handle.join().expect("worker thread should not panic");
    }

    let stats = registry.stats();
    assert_eq!(stats.total_vaults, 10);
    assert_eq!(stats.total_locked, 12_000); // 10 * (1000 + 200)
    assert!(stats.is_reconciled());
    assert_eq!(treasury.pool_balance(), 12_000);

    // Unlock and drain them all from the main thread.
    clock.advance_days(30);
    for i in 0..10 {
        let account = AccountId::new(format!("vesta:worker_{}", i));
        let receipt = registry.withdraw(&account, 1_200).unwrap();
        assert!(receipt.closed);
    }

    assert_eq!(registry.stats().total_locked, 0);
    assert_eq!(treasury.pool_balance(), 0);
}

// ---------------------------------------------------------------------------
// 14. Events Arrive In Lifecycle Order
// ---------------------------------------------------------------------------

#[test]
fn events_arrive_in_lifecycle_order() {
    let (registry, clock, treasury, sink) = setup();
    let alice = fund(&treasury, "alice", 5_000);
    let bob = AccountId::new("vesta:bob");

    registry
        .create_vault(&alice, "noisy", 30, Some(bob.clone()), 2_000)
        .unwrap();
    registry.deposit(&alice, 500).unwrap();
    registry.update_beneficiary(&alice, bob.clone()).unwrap();
    clock.advance_days(30);
    registry.withdraw(&alice, 2_500).unwrap();

    let events = sink.drain();
    let labels: Vec<&str> = events.iter().map(|e| e.label()).collect();
    assert_eq!(
        labels,
        vec![
            "vault_opened",
            "beneficiary_assigned", // from creation
            "funds_deposited",
            "beneficiary_assigned", // from the explicit update
            "funds_withdrawn",
        ]
    );

    // The withdrawal event carries the closing balance.
    assert!(matches!(
        events[4],
        VaultEvent::FundsWithdrawn {
            amount: 2_500,
            remaining: 0,
            ..
        }
    ));
}

// ---------------------------------------------------------------------------
// 15. Owner Gates Administration
// ---------------------------------------------------------------------------

#[test]
fn owner_gates_administration() {
    let (registry, _clock, treasury, _sink) = setup();
    let custodian = AccountId::new("vesta:custodian");
    let alice = fund(&treasury, "alice", 1_000);
    let bob = AccountId::new("vesta:bob");

    assert_eq!(registry.owner(), &custodian);

    // Only the custodian can grow the authorized set.
    assert!(registry.authorize_account(&custodian, alice.clone()).unwrap());
    assert!(matches!(
        registry.authorize_account(&alice, bob.clone()),
        Err(vesta_ledger::vault::AccessError::NotOwner { .. })
    ));

    // Authorization is bookkeeping only: it grants no vault powers.
    registry.create_vault(&alice, "v", 30, None, 1_000).unwrap();
    registry.authorize_account(&custodian, bob.clone()).unwrap();
    assert!(registry.is_authorized(&bob));
    assert!(matches!(
        registry.claim_as_beneficiary(&bob, &alice),
        Err(VaultError::NotBeneficiary { .. })
    ));

    // Re-adding is idempotent, reported through the return value.
    assert!(!registry.authorize_account(&custodian, bob.clone()).unwrap());
    assert_eq!(registry.authorized_count(), 2);

    assert!(registry.revoke_account(&custodian, &bob).unwrap());
    assert!(!registry.revoke_account(&custodian, &bob).unwrap());
    assert_eq!(registry.authorized_count(), 1);
}
