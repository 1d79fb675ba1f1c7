// Copyright (c) James Kassemi, SC, US. All rights reserved.

//! Per-player result ledgers and the registry that owns them.
//!
//! The crate exposes:
//! - [`PlayerLedger`]: ordered, day-unique result history with streak state.
//! - [`StreakReconstructor`]: recomputes a streak from history; the source of truth.
//! - [`Registry`]: process-wide `PlayerId -> ledger` map with one lock per ledger.

pub mod error;
pub mod ledger;
pub mod registry;
pub mod streak;

pub use error::{LedgerError, Result};
pub use ledger::{PlayerLedger, PlayerStats, RecordOutcome};
pub use registry::{LedgerHandle, Registry};
pub use streak::StreakReconstructor;
