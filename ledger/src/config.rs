//! # Ledger Configuration & Constants
//!
//! Every magic number in VESTA lives here. If you're hardcoding a constant
//! somewhere else, you're doing it wrong and you owe the team coffee.
//!
//! These values define the custody rules. Vault owners plan around them, so
//! changing any of them after launch is a breach of trust, not a refactor.

use chrono::Duration;

// ---------------------------------------------------------------------------
// Ledger Identity
// ---------------------------------------------------------------------------

/// Ledger fingerprint for service identification. Shows up in the status
/// endpoint and in handshake-style logging at startup.
pub const LEDGER_FINGERPRINT: &str = "ALAS-VESTA-2026";

/// The full version string, assembled by hand so we don't allocate for
/// something this trivial at runtime.
pub const LEDGER_VERSION: &str = "0.1.0";

/// Name of the smallest transferable value unit (every ledger needs a cute
/// name for its smallest denomination). All balances and amounts in this
/// crate are denominated in embers.
pub const UNIT_NAME: &str = "embers";

/// Well-known account id standing in for the custody pool itself. Deposits
/// flow to it, payouts flow from it, and it appears as the counterparty in
/// transaction records.
pub const CUSTODY_ACCOUNT: &str = "vesta:custody";

// ---------------------------------------------------------------------------
// Lock Window
// ---------------------------------------------------------------------------

/// Shortest lock an owner may request, in days. Zero-day locks would make a
/// vault a checking account.
pub const MIN_LOCK_DAYS: u32 = 1;

/// Longest lock an owner may request at creation, in days. One year. Anyone
/// who wants longer can extend after creating.
pub const MAX_LOCK_DAYS: u32 = 365;

/// Longest single extension of an existing lock, in days. Extensions may be
/// repeated, so the cumulative lock is unbounded; each individual call is not.
pub const MAX_EXTENSION_DAYS: u32 = 365;

// ---------------------------------------------------------------------------
// Recovery Parameters
// ---------------------------------------------------------------------------

/// Penalty on emergency withdrawal, as a percentage of the vault balance.
/// The remaining 90% pays out immediately. The penalty stays in the custody
/// pool; the ledger stops tracking it.
pub const EMERGENCY_PENALTY_PCT: u64 = 10;

/// Days past the unlock time before a beneficiary may claim. The claim gate
/// is strict: at exactly `unlock + grace` the claim still fails.
pub const BENEFICIARY_GRACE_DAYS: i64 = 30;

// ---------------------------------------------------------------------------
// Service Parameters
// ---------------------------------------------------------------------------

/// Default REST API port.
pub const DEFAULT_API_PORT: u16 = 9750;

/// Default metrics (Prometheus) port.
pub const DEFAULT_METRICS_PORT: u16 = 9751;

// ---------------------------------------------------------------------------
// Utility
// ---------------------------------------------------------------------------

/// The beneficiary grace period as a `chrono::Duration`. A function because
/// `Duration::days` is not const.
pub fn grace_period() -> Duration {
    Duration::days(BENEFICIARY_GRACE_DAYS)
}
