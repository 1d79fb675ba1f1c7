// Copyright (c) James Kassemi, SC, US. All rights reserved.

//! Shared schemas, clock abstraction, configuration and status handles for the streak keeper.

pub mod clock;
pub mod config;
pub mod status;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use types::{
    ChatMessage, GRID_COLUMNS, InvalidTries, MAX_TRIES, PlayerId, PuzzleDay, PuzzleResult,
    ScoreMatrix, Square, Tries,
};
