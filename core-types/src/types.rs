// Copyright (c) James Kassemi, SC, US. All rights reserved.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sequential puzzle number; one per calendar day.
pub type PuzzleDay = i64;

/// Highest solved tries count; anything worse is [`Tries::FAILED`].
pub const MAX_TRIES: u8 = 6;

/// Fixed width of a decoded [`ScoreMatrix`] row.
pub const GRID_COLUMNS: usize = 3;

/// Opaque chat author identifier. Display metadata never travels with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for PlayerId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Solved within `1..=MAX_TRIES` guesses, or failed. Only [`Tries::solved`] and
/// [`Tries::FAILED`] produce values, deserialisation included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Option<u8>", into = "Option<u8>")]
pub struct Tries(Option<u8>);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("tries count {count} outside 1..={MAX_TRIES}")]
pub struct InvalidTries {
    pub count: u8,
}

impl Tries {
    pub const FAILED: Tries = Tries(None);

    /// Returns `None` unless `count` is within `1..=MAX_TRIES`.
    pub fn solved(count: u8) -> Option<Self> {
        (1..=MAX_TRIES)
            .contains(&count)
            .then_some(Tries(Some(count)))
    }

    pub fn is_failed(&self) -> bool {
        self.0.is_none()
    }

    pub fn count(&self) -> Option<u8> {
        self.0
    }
}

impl TryFrom<Option<u8>> for Tries {
    type Error = InvalidTries;

    fn try_from(value: Option<u8>) -> Result<Self, Self::Error> {
        match value {
            None => Ok(Tries::FAILED),
            Some(count) => Tries::solved(count).ok_or(InvalidTries { count }),
        }
    }
}

impl From<Tries> for Option<u8> {
    fn from(value: Tries) -> Self {
        value.0
    }
}

impl fmt::Display for Tries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(count) => write!(f, "{count}/{MAX_TRIES}"),
            None => write!(f, "X/{MAX_TRIES}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Square {
    #[default]
    Empty,
    Present,
    Correct,
}

/// Raw board as posted; rows in guess order, [`GRID_COLUMNS`] cells each.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreMatrix {
    rows: Vec<[Square; GRID_COLUMNS]>,
}

impl ScoreMatrix {
    pub fn new(rows: Vec<[Square; GRID_COLUMNS]>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[[Square; GRID_COLUMNS]] {
        &self.rows
    }

    pub fn push_row(&mut self, row: [Square; GRID_COLUMNS]) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One player's submission for one puzzle day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuzzleResult {
    puzzle_day: PuzzleDay,
    tries: Tries,
    hard_mode: bool,
    submitted_at: DateTime<Utc>,
    grid: ScoreMatrix,
}

impl PuzzleResult {
    pub fn new(
        puzzle_day: PuzzleDay,
        tries: Tries,
        hard_mode: bool,
        submitted_at: DateTime<Utc>,
        grid: ScoreMatrix,
    ) -> Self {
        Self {
            puzzle_day,
            tries,
            hard_mode,
            submitted_at,
            grid,
        }
    }

    pub fn puzzle_day(&self) -> PuzzleDay {
        self.puzzle_day
    }

    pub fn tries(&self) -> Tries {
        self.tries
    }

    pub fn is_failed(&self) -> bool {
        self.tries.is_failed()
    }

    pub fn hard_mode(&self) -> bool {
        self.hard_mode
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    pub fn grid(&self) -> &ScoreMatrix {
        &self.grid
    }
}

/// Message as supplied by the chat source collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub author_id: PlayerId,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(
        author_id: impl Into<PlayerId>,
        text: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            author_id: author_id.into(),
            text: text.into(),
            created_at,
        }
    }
}
