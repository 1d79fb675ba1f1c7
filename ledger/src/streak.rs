// Copyright (c) James Kassemi, SC, US. All rights reserved.

use core_types::{PlayerId, PuzzleDay, PuzzleResult};

use crate::error::{LedgerError, Result};

/// Recomputes a streak from a player's full history.
///
/// Counting walks backward from `today`. Today's puzzle extends the run when it
/// was solved, ends it at zero when it was failed, and is simply not counted when
/// it has not been played yet. Every earlier day must then be present and solved;
/// the first missing or failed day stops the count. Results after `today` are not
/// in play yet and are ignored.
pub struct StreakReconstructor;

impl StreakReconstructor {
    pub fn rebuild(
        player_id: PlayerId,
        results: &[PuzzleResult],
        today: PuzzleDay,
    ) -> Result<u32> {
        check_ordering(player_id, results)?;

        let mut played = results
            .iter()
            .rev()
            .skip_while(|result| result.puzzle_day() > today)
            .peekable();

        let mut streak = 0u32;
        if let Some(latest) = played.next_if(|result| result.puzzle_day() == today) {
            if latest.is_failed() {
                return Ok(0);
            }
            streak += 1;
        }

        let mut expected_day = today - 1;
        for result in played {
            if result.puzzle_day() != expected_day || result.is_failed() {
                break;
            }
            streak += 1;
            expected_day -= 1;
        }
        Ok(streak)
    }
}

fn check_ordering(player_id: PlayerId, results: &[PuzzleResult]) -> Result<()> {
    for pair in results.windows(2) {
        let (prev, next) = (pair[0].puzzle_day(), pair[1].puzzle_day());
        if prev == next {
            return Err(LedgerError::InvariantViolation {
                player_id,
                puzzle_day: next,
                detail: "more than one result stored for the puzzle day",
            });
        }
        if prev > next {
            return Err(LedgerError::InvariantViolation {
                player_id,
                puzzle_day: next,
                detail: "results are not ordered by puzzle day",
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use core_types::{ScoreMatrix, Tries};

    const PLAYER: PlayerId = PlayerId(1);

    fn result(day: PuzzleDay, tries: Tries) -> PuzzleResult {
        PuzzleResult::new(
            day,
            tries,
            false,
            Utc.with_ymd_and_hms(2022, 3, 5, 8, 0, 0).unwrap(),
            ScoreMatrix::default(),
        )
    }

    fn solved(days: &[PuzzleDay]) -> Vec<PuzzleResult> {
        days.iter().map(|d| result(*d, Tries::solved(3).unwrap())).collect()
    }

    fn rebuild(results: &[PuzzleResult], today: PuzzleDay) -> Result<u32> {
        StreakReconstructor::rebuild(PLAYER, results, today)
    }

    #[test]
    fn empty_history_has_no_streak() {
        assert_eq!(rebuild(&[], 300), Ok(0));
    }

    #[test]
    fn gap_breaks_run_before_older_days() {
        assert_eq!(rebuild(&solved(&[300, 301, 303]), 303), Ok(1));
    }

    #[test]
    fn unplayed_today_keeps_yesterdays_run() {
        assert_eq!(rebuild(&solved(&[300, 301, 302]), 303), Ok(3));
    }

    #[test]
    fn run_ending_before_yesterday_is_gone() {
        assert_eq!(rebuild(&solved(&[299, 300, 301]), 303), Ok(0));
    }

    #[test]
    fn failure_today_resets() {
        let mut results = solved(&[300, 301, 302]);
        results.push(result(303, Tries::FAILED));
        assert_eq!(rebuild(&results, 303), Ok(0));
    }

    #[test]
    fn failure_today_does_not_reach_past_a_missing_yesterday() {
        let mut results = solved(&[300, 301]);
        results.push(result(303, Tries::FAILED));
        assert_eq!(rebuild(&results, 303), Ok(0));
    }

    #[test]
    fn failure_in_history_stops_count() {
        let results = vec![
            result(300, Tries::solved(2).unwrap()),
            result(301, Tries::FAILED),
            result(302, Tries::solved(5).unwrap()),
            result(303, Tries::solved(6).unwrap()),
        ];
        assert_eq!(rebuild(&results, 303), Ok(2));
    }

    #[test]
    fn results_after_today_are_ignored() {
        assert_eq!(rebuild(&solved(&[301, 302, 303, 304]), 303), Ok(3));
    }

    #[test]
    fn duplicate_days_are_an_invariant_violation() {
        let results = solved(&[300, 301, 301]);
        assert_eq!(
            rebuild(&results, 301),
            Err(LedgerError::InvariantViolation {
                player_id: PLAYER,
                puzzle_day: 301,
                detail: "more than one result stored for the puzzle day",
            })
        );
    }

    #[test]
    fn unordered_results_are_an_invariant_violation() {
        let results = solved(&[302, 301]);
        assert!(matches!(
            rebuild(&results, 302),
            Err(LedgerError::InvariantViolation { puzzle_day: 301, .. })
        ));
    }
}
