// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # VESTA Ledger — Core Library
//!
//! VESTA is a custody ledger for time-locked value: every account gets one
//! vault, funds stay locked until a date the owner picked, and a named
//! beneficiary can recover the balance if the owner never comes back.
//! Think safe-deposit box, not trading venue.
//!
//! The library is deliberately boring about money. Amounts are integer
//! embers, arithmetic is checked or floored, and no operation is allowed
//! to half-happen: either every side effect of a call lands (balance,
//! counters, audit log, events) or none of them do.
//!
//! ## Architecture
//!
//! The crate is split into modules that mirror the actual concerns of a
//! custody service:
//!
//! - **account** -- Account identifiers. Newtyped so a recipient can never
//!   be confused with a description.
//! - **clock** -- Time as a capability. Production reads the wall clock;
//!   tests move time by hand.
//! - **treasury** -- The funds rail: where embers live when they are not
//!   in a vault, and the trait the registry moves them through.
//! - **notify** -- Lifecycle events and the sinks that observe them.
//! - **vault** -- The custody state machine itself: records, registry,
//!   audit log, access control, aggregate stats.
//! - **config** -- Ledger constants and product terms.
//!
//! ## Design Philosophy
//!
//! 1. Correctness over performance (but lock contention is per-account).
//! 2. External transfers happen before state commits, never after.
//! 3. Every public API is documented. Every rule about money has a test.
//! 4. Collaborators are traits. The registry cannot tell a test harness
//!    from production wiring, which is the point.

pub mod account;
pub mod clock;
pub mod config;
pub mod notify;
pub mod treasury;
pub mod vault;
