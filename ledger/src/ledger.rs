// Copyright (c) James Kassemi, SC, US. All rights reserved.

use core_types::{PlayerId, PuzzleDay, PuzzleResult};
use serde::Serialize;

use crate::{error::Result, streak::StreakReconstructor};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordOutcome {
    Accepted,
    DuplicateDay,
    FutureDay,
}

/// Read-only view handed to reporting sinks.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlayerStats {
    pub player_id: PlayerId,
    pub current_streak: u32,
    pub total_games: usize,
    pub average_tries: Option<f64>,
    pub last_played_day: Option<PuzzleDay>,
    pub first_played_day: Option<PuzzleDay>,
    pub hard_mode_games: usize,
    pub failed_games: usize,
}

/// One player's results, unique per puzzle day and sorted ascending.
#[derive(Clone, Debug)]
pub struct PlayerLedger {
    player_id: PlayerId,
    results: Vec<PuzzleResult>,
    current_streak: u32,
    last_played_day: Option<PuzzleDay>,
}

impl PlayerLedger {
    pub fn new(player_id: PlayerId) -> Self {
        Self {
            player_id,
            results: Vec::new(),
            current_streak: 0,
            last_played_day: None,
        }
    }

    /// Stores `result` unless its day is after `today` or already recorded.
    ///
    /// Only a result for `today` moves the streak: failed sets it to 0, solved
    /// sets it to one more than the solved run stored up to yesterday. The run is
    /// read from history, so a streak left stale by a sweep that has not run yet
    /// is never extended. Late or replayed days need [`Self::rebuild_streak`].
    pub fn record(&mut self, result: PuzzleResult, today: PuzzleDay) -> RecordOutcome {
        let day = result.puzzle_day();
        if day > today {
            return RecordOutcome::FutureDay;
        }
        let idx = match self
            .results
            .binary_search_by_key(&day, PuzzleResult::puzzle_day)
        {
            Ok(_) => return RecordOutcome::DuplicateDay,
            Err(idx) => idx,
        };

        if day == today {
            self.current_streak = if result.is_failed() {
                0
            } else {
                solved_run_ending(&self.results[..idx], day - 1).saturating_add(1)
            };
        }
        self.last_played_day = Some(self.last_played_day.map_or(day, |last| last.max(day)));
        self.results.insert(idx, result);
        RecordOutcome::Accepted
    }

    /// Replaces the streak with the reconstructed value. On error the current
    /// streak is left as it was.
    pub fn rebuild_streak(&mut self, today: PuzzleDay) -> Result<u32> {
        let streak = StreakReconstructor::rebuild(self.player_id, &self.results, today)?;
        self.current_streak = streak;
        Ok(streak)
    }

    /// Zeroes the streak of a player who did not play yesterday. A player who
    /// already posted today keeps the streak [`Self::record`] derived for today.
    /// Returns whether the streak was reset; never raises it.
    pub fn rollover(&mut self, today: PuzzleDay) -> bool {
        if self.current_streak == 0 {
            return false;
        }
        let yesterday = today - 1;
        let still_running = self
            .last_played_day
            .is_some_and(|last| last == yesterday || last == today);
        if still_running {
            return false;
        }
        self.current_streak = 0;
        true
    }

    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    pub fn results(&self) -> &[PuzzleResult] {
        &self.results
    }

    pub fn result_for(&self, day: PuzzleDay) -> Option<&PuzzleResult> {
        self.results
            .binary_search_by_key(&day, PuzzleResult::puzzle_day)
            .ok()
            .map(|idx| &self.results[idx])
    }

    pub fn current_streak(&self) -> u32 {
        self.current_streak
    }

    pub fn total_games(&self) -> usize {
        self.results.len()
    }

    pub fn last_played_day(&self) -> Option<PuzzleDay> {
        self.last_played_day
    }

    /// Mean tries over solved results; `None` until something was solved.
    pub fn average_tries(&self) -> Option<f64> {
        let (sum, solved) = self
            .results
            .iter()
            .filter_map(|r| r.tries().count())
            .fold((0u64, 0u64), |(sum, n), tries| (sum + tries as u64, n + 1));
        (solved > 0).then(|| sum as f64 / solved as f64)
    }

    pub fn stats(&self) -> PlayerStats {
        PlayerStats {
            player_id: self.player_id,
            current_streak: self.current_streak,
            total_games: self.total_games(),
            average_tries: self.average_tries(),
            last_played_day: self.last_played_day,
            first_played_day: self.results.first().map(PuzzleResult::puzzle_day),
            hard_mode_games: self.results.iter().filter(|r| r.hard_mode()).count(),
            failed_games: self.results.iter().filter(|r| r.is_failed()).count(),
        }
    }
}

/// Consecutive solved days in `results` ending at `last_day`. `results` is
/// sorted ascending and unique per day.
fn solved_run_ending(results: &[PuzzleResult], last_day: PuzzleDay) -> u32 {
    let mut expected = last_day;
    let mut run = 0u32;
    for result in results.iter().rev() {
        if result.puzzle_day() != expected || result.is_failed() {
            break;
        }
        run += 1;
        expected -= 1;
    }
    run
}
