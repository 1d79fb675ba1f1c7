// Copyright (c) James Kassemi, SC, US. All rights reserved.

use core_types::{PlayerId, PuzzleDay};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("ledger {player_id} invariant violated at puzzle {puzzle_day}: {detail}")]
    InvariantViolation {
        player_id: PlayerId,
        puzzle_day: PuzzleDay,
        detail: &'static str,
    },
}
