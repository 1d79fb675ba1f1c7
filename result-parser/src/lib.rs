// Copyright (c) James Kassemi, SC, US. All rights reserved.

//! Parses shared puzzle results (`Wordle 260 4/6*` plus the emoji board) out of
//! free-form chat messages. Most chat traffic is not a result, so the reject
//! path is a single anchored regex miss with no allocation or logging.

pub mod grid;

pub use grid::GridDecoder;

use core_types::{ChatMessage, PuzzleDay, PuzzleResult, Tries};
use regex::Regex;
use thiserror::Error;

const HEADER_PATTERN: &str =
    r"^Wordle\s+(?P<num>\d{1,3}(?:,\d{3})+|\d+)\s+(?P<tries>[1-6X])/6(?P<hard>\*)?$";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseRejection {
    #[error("message is not a puzzle result")]
    NotAResult,
    #[error("puzzle {puzzle_day} is ahead of today's puzzle {today}")]
    FutureDay {
        puzzle_day: PuzzleDay,
        today: PuzzleDay,
    },
}

pub struct ResultParser {
    header: Regex,
}

impl ResultParser {
    pub fn new() -> Self {
        Self {
            header: Regex::new(HEADER_PATTERN).expect("valid header pattern"),
        }
    }

    /// Parses `message` relative to `today`. Results for puzzles after `today`
    /// are rejected; they point at a malformed number or clock skew.
    pub fn parse(
        &self,
        message: &ChatMessage,
        today: PuzzleDay,
    ) -> Result<PuzzleResult, ParseRejection> {
        let mut lines = message.text.lines();
        let header = lines.next().ok_or(ParseRejection::NotAResult)?;
        let caps = self
            .header
            .captures(header.trim())
            .ok_or(ParseRejection::NotAResult)?;

        let puzzle_day = parse_puzzle_number(&caps["num"]).ok_or(ParseRejection::NotAResult)?;
        let tries = match &caps["tries"] {
            "X" => Tries::FAILED,
            digits => digits
                .parse::<u8>()
                .ok()
                .and_then(Tries::solved)
                .ok_or(ParseRejection::NotAResult)?,
        };
        let hard_mode = caps.name("hard").is_some();

        if puzzle_day > today {
            return Err(ParseRejection::FutureDay { puzzle_day, today });
        }

        let mut rest = lines.peekable();
        // one blank separator between header and board
        rest.next_if(|line| line.trim().is_empty());
        let grid = GridDecoder::decode(rest);

        Ok(PuzzleResult::new(
            puzzle_day,
            tries,
            hard_mode,
            message.created_at,
            grid,
        ))
    }
}

impl Default for ResultParser {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_puzzle_number(raw: &str) -> Option<PuzzleDay> {
    if raw.contains(',') {
        raw.replace(',', "").parse().ok()
    } else {
        raw.parse().ok()
    }
}
