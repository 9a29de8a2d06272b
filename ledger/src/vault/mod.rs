//! # Vault Module: Custody State & Rules
//!
//! The vault is where value lives in VESTA. Every locked ember, every
//! beneficiary designation, every audit record passes through this module.
//! The registry is the only writer; everything else is a record type or a
//! supporting ledger it drives.
//!
//! ## Architecture
//!
//! ```text
//! record.rs    — Vault record and its read-only projection
//! registry.rs  — The custody state machine: all mutations live here
//! log.rs       — Append-only per-account transaction history
//! access.rs    — Registry owner and the authorized-account set
//! stats.rs     — Aggregate counter snapshot
//! ```
//!
//! ## Design Principles
//!
//! 1. **All amounts are `u64` embers.** No floating point, no decimals in
//!    arithmetic. Percentages are computed in `u128` and floored.
//!
//! 2. **One vault slot per account.** A drained vault deactivates in place;
//!    the slot can be reopened but the old record's history is never erased.
//!
//! 3. **Checks before transfers, transfers before commits.** An operation
//!    that touches the funds rail runs every validation first, moves value
//!    second, and mutates ledger state last. Nothing ever rolls back.
//!
//! 4. **Serializable state.** Record and receipt types derive `Serialize`
//!    and `Deserialize` so vault state can be snapshotted or served over
//!    an API without translation layers.

pub mod access;
pub mod log;
pub mod record;
pub mod registry;
pub mod stats;

pub use access::{AccessControl, AccessError};
pub use log::{LogError, TransactionLog, TransactionRecord};
pub use record::{Vault, VaultInfo};
pub use registry::{
    EmergencyReceipt, VaultError, VaultPolicy, VaultRegistry, WithdrawalReceipt,
};
pub use stats::LedgerStats;
