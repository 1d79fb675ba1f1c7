// Copyright (c) James Kassemi, SC, US. All rights reserved.

//! Entry points that move chat traffic into player ledgers.
//!
//! Two independent operations are exposed and may be driven by any scheduler:
//! [`IngestionPipeline::ingest_live`] for each incoming message and
//! [`IngestionPipeline::rollover`] once per local day boundary.
//! [`IngestionPipeline::backfill`] replays history at startup.
//!
//! Backfill must run at most once per process and must finish before live
//! ingestion begins. Nothing here enforces that ordering; the caller does.

pub mod metrics;
pub mod source;

use std::{collections::BTreeSet, sync::Arc};

use core_types::{
    ChatMessage, Clock, PlayerId, PuzzleDay,
    status::{OverallStatus, ServiceStatusHandle, ServiceStatusReporter, ServiceStatusSnapshot},
};
use ledger::{LedgerError, PlayerStats, RecordOutcome, Registry};
use log::{debug, error, info, warn};
use puzzle_calendar::PuzzleCalendar;
use result_parser::{ParseRejection, ResultParser};
use serde::Serialize;

pub use metrics::{IngestCounters, IngestCountersSnapshot};
pub use source::{JsonlMessageSource, MessageSource, SourceError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IngestOutcome {
    NotAResult,
    Accepted,
    DuplicateDay,
    FutureDay,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BackfillReport {
    pub messages: usize,
    pub accepted: usize,
    pub duplicates: usize,
    pub future_days: usize,
    pub rebuilt: usize,
    pub violations: Vec<LedgerError>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RolloverReport {
    pub today: PuzzleDay,
    pub inspected: usize,
    pub reset: usize,
}

pub struct IngestionPipeline {
    calendar: PuzzleCalendar,
    clock: Arc<dyn Clock>,
    registry: Arc<Registry>,
    parser: ResultParser,
    counters: IngestCounters,
    status: ServiceStatusHandle,
}

impl IngestionPipeline {
    pub fn new(calendar: PuzzleCalendar, clock: Arc<dyn Clock>, registry: Arc<Registry>) -> Self {
        let status = ServiceStatusHandle::new("ingest");
        status.set_overall(OverallStatus::Ok);
        Self {
            calendar,
            clock,
            registry,
            parser: ResultParser::new(),
            counters: IngestCounters::new(),
            status,
        }
    }

    /// Puzzle number of the current local day.
    pub fn today(&self) -> PuzzleDay {
        self.calendar.today(self.clock.now())
    }

    pub fn ingest_live(&self, message: &ChatMessage) -> IngestOutcome {
        let today = self.today();
        let outcome = self.ingest_for_day(message, today);
        self.counters.record_outcome(outcome);
        self.publish_gauges();
        outcome
    }

    fn ingest_for_day(&self, message: &ChatMessage, today: PuzzleDay) -> IngestOutcome {
        let result = match self.parser.parse(message, today) {
            Ok(result) => result,
            Err(ParseRejection::NotAResult) => return IngestOutcome::NotAResult,
            Err(ParseRejection::FutureDay { puzzle_day, today }) => {
                warn!(
                    "[ingest] player {} posted puzzle {} while today is {}; dropped",
                    message.author_id, puzzle_day, today
                );
                return IngestOutcome::FutureDay;
            }
        };

        let puzzle_day = result.puzzle_day();
        let tries = result.tries();
        let handle = self.registry.get_or_insert(message.author_id);
        let mut ledger = handle.lock();
        match ledger.record(result, today) {
            RecordOutcome::Accepted => {
                debug!(
                    "[ingest] player {} puzzle {} {} streak={}",
                    message.author_id,
                    puzzle_day,
                    tries,
                    ledger.current_streak()
                );
                IngestOutcome::Accepted
            }
            RecordOutcome::DuplicateDay => {
                debug!(
                    "[ingest] player {} already has puzzle {}",
                    message.author_id, puzzle_day
                );
                IngestOutcome::DuplicateDay
            }
            RecordOutcome::FutureDay => {
                warn!(
                    "[ingest] player {} puzzle {} is after today {}; dropped",
                    message.author_id, puzzle_day, today
                );
                IngestOutcome::FutureDay
            }
        }
    }

    /// Replays `messages` oldest first, then recomputes the streak of every
    /// player that gained a result. A ledger whose history breaks an invariant
    /// keeps its previous streak and is reported; the rest of the batch is
    /// unaffected.
    pub fn backfill<I>(&self, messages: I) -> BackfillReport
    where
        I: IntoIterator<Item = ChatMessage>,
    {
        let mut messages: Vec<ChatMessage> = messages.into_iter().collect();
        messages.sort_by_key(|msg| msg.created_at);

        let mut report = BackfillReport {
            messages: messages.len(),
            ..BackfillReport::default()
        };
        let mut touched = BTreeSet::new();
        for message in &messages {
            match self.ingest_live(message) {
                IngestOutcome::Accepted => {
                    report.accepted += 1;
                    touched.insert(message.author_id);
                }
                IngestOutcome::DuplicateDay => report.duplicates += 1,
                IngestOutcome::FutureDay => report.future_days += 1,
                IngestOutcome::NotAResult => {}
            }
        }

        let today = self.today();
        for player_id in touched {
            match self.rebuild_player(player_id, today) {
                Some(Ok(_)) => report.rebuilt += 1,
                Some(Err(err)) => report.violations.push(err),
                None => {}
            }
        }

        info!(
            "[backfill] replayed {} messages: accepted={} duplicates={} future={} rebuilt={} violations={}",
            report.messages,
            report.accepted,
            report.duplicates,
            report.future_days,
            report.rebuilt,
            report.violations.len()
        );
        self.publish_gauges();
        report
    }

    /// Pulls history newer than `after` from `source` and backfills it.
    pub fn backfill_from(
        &self,
        source: &dyn MessageSource,
        after: chrono::DateTime<chrono::Utc>,
    ) -> Result<BackfillReport, SourceError> {
        let history = source.history(after)?;
        Ok(self.backfill(history))
    }

    fn rebuild_player(
        &self,
        player_id: PlayerId,
        today: PuzzleDay,
    ) -> Option<Result<u32, LedgerError>> {
        let handle = self.registry.get(player_id)?;
        let outcome = handle.lock().rebuild_streak(today);
        match &outcome {
            Ok(streak) => debug!("[backfill] player {} streak rebuilt to {}", player_id, streak),
            Err(err) => {
                error!("[backfill] {}", err);
                self.counters.record_invariant_violation();
                self.status.set_overall(OverallStatus::Warn);
                self.status.push_error(err.to_string());
            }
        }
        Some(outcome)
    }

    /// Zeroes the streak of every player who missed yesterday's puzzle.
    /// Safe to repeat: a second sweep for the same day changes nothing.
    pub fn rollover(&self) -> RolloverReport {
        let today = self.today();
        let handles = self.registry.handles();
        let mut reset = 0;
        for (player_id, handle) in &handles {
            let mut ledger = handle.lock();
            let previous = ledger.current_streak();
            if ledger.rollover(today) {
                reset += 1;
                debug!(
                    "[rollover] player {} streak {} reset (last played {:?})",
                    player_id,
                    previous,
                    ledger.last_played_day()
                );
            }
        }
        self.counters.record_rollover(reset);
        self.publish_gauges();

        let report = RolloverReport {
            today,
            inspected: handles.len(),
            reset,
        };
        info!(
            "[rollover] puzzle {}: inspected={} reset={}",
            report.today, report.inspected, report.reset
        );
        report
    }

    fn publish_gauges(&self) {
        let counters = self.counters.snapshot();
        let gauges = [
            ("players", self.registry.len() as u64),
            ("accepted", counters.accepted),
            ("duplicates", counters.duplicates),
            ("future_days", counters.future_days),
            ("not_results", counters.not_results),
            ("invariant_violations", counters.invariant_violations),
            ("rollover_resets", counters.rollover_resets),
        ];
        for (label, value) in gauges {
            self.status.set_gauge(label, value as f64, None);
        }
    }

    pub fn player_stats(&self, player_id: PlayerId) -> Option<PlayerStats> {
        self.registry.player_stats(player_id)
    }

    pub fn stats(&self) -> Vec<PlayerStats> {
        self.registry.stats()
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn calendar(&self) -> &PuzzleCalendar {
        &self.calendar
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn counters(&self) -> &IngestCounters {
        &self.counters
    }

    pub fn status_handle(&self) -> ServiceStatusHandle {
        self.status.clone()
    }
}

impl ServiceStatusReporter for IngestionPipeline {
    fn service_name(&self) -> &'static str {
        self.status.service_name()
    }

    fn status(&self) -> ServiceStatusSnapshot {
        self.status.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use core_types::ManualClock;

    // Puzzle 259 at noon UTC.
    fn noon_of_259() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 3, 5, 12, 0, 0).unwrap()
    }

    fn pipeline(clock: Arc<ManualClock>) -> IngestionPipeline {
        IngestionPipeline::new(PuzzleCalendar::standard(), clock, Arc::new(Registry::new()))
    }

    fn msg(author: u64, text: &str, at: DateTime<Utc>) -> ChatMessage {
        ChatMessage::new(author, text, at)
    }

    #[test]
    fn chatter_does_not_open_a_ledger() {
        let clock = Arc::new(ManualClock::new(noon_of_259()));
        let pipeline = pipeline(clock);
        let outcome = pipeline.ingest_live(&msg(1, "good morning", noon_of_259()));
        assert_eq!(outcome, IngestOutcome::NotAResult);
        assert!(pipeline.registry().is_empty());
        assert_eq!(pipeline.counters().snapshot().not_results, 1);
    }

    #[test]
    fn future_puzzle_is_counted_and_dropped() {
        let clock = Arc::new(ManualClock::new(noon_of_259()));
        let pipeline = pipeline(clock);
        let outcome = pipeline.ingest_live(&msg(1, "Wordle 260 3/6", noon_of_259()));
        assert_eq!(outcome, IngestOutcome::FutureDay);
        assert!(pipeline.player_stats(PlayerId(1)).is_none());
        assert_eq!(pipeline.counters().snapshot().future_days, 1);
    }

    #[test]
    fn gauges_follow_ingestion() {
        let clock = Arc::new(ManualClock::new(noon_of_259()));
        let pipeline = pipeline(clock);
        pipeline.ingest_live(&msg(1, "Wordle 259 3/6", noon_of_259()));
        pipeline.ingest_live(&msg(1, "Wordle 259 3/6", noon_of_259()));
        pipeline.ingest_live(&msg(2, "Wordle 259 X/6", noon_of_259()));

        let snapshot = pipeline.status();
        let gauge = |label: &str| {
            snapshot
                .gauges
                .iter()
                .find(|g| g.label == label)
                .map(|g| g.value)
        };
        assert_eq!(snapshot.name, "ingest");
        assert_eq!(snapshot.overall, OverallStatus::Ok);
        assert_eq!(gauge("players"), Some(2.0));
        assert_eq!(gauge("accepted"), Some(2.0));
        assert_eq!(gauge("duplicates"), Some(1.0));
    }

    #[test]
    fn backfill_rebuilds_touched_players_only() {
        let clock = Arc::new(ManualClock::new(noon_of_259() + Duration::days(2)));
        let pipeline = pipeline(clock);
        let history = vec![
            msg(7, "Wordle 260 2/6", noon_of_259() + Duration::days(1)),
            msg(7, "Wordle 259 4/6", noon_of_259()),
            msg(8, "lunch?", noon_of_259()),
            msg(7, "Wordle 260 5/6", noon_of_259() + Duration::days(1)),
        ];

        let report = pipeline.backfill(history);

        assert_eq!(report.messages, 4);
        assert_eq!(report.accepted, 2);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.rebuilt, 1);
        assert!(report.violations.is_empty());
        // 259 and 260 solved, 261 not yet played.
        assert_eq!(pipeline.player_stats(PlayerId(7)).unwrap().current_streak, 2);
    }

    #[test]
    fn backfill_from_source_respects_cutoff() {
        let clock = Arc::new(ManualClock::new(noon_of_259() + Duration::days(1)));
        let pipeline = pipeline(clock);
        let history = vec![
            msg(3, "Wordle 259 3/6", noon_of_259()),
            msg(3, "Wordle 260 3/6", noon_of_259() + Duration::days(1)),
        ];

        let report = pipeline
            .backfill_from(&history, noon_of_259() + Duration::hours(1))
            .unwrap();

        assert_eq!(report.messages, 1);
        let stats = pipeline.player_stats(PlayerId(3)).unwrap();
        assert_eq!(stats.total_games, 1);
        assert_eq!(stats.current_streak, 1);
    }

    #[test]
    fn rollover_reports_inspected_and_reset() {
        let clock = Arc::new(ManualClock::new(noon_of_259()));
        let pipeline = pipeline(Arc::clone(&clock));
        pipeline.ingest_live(&msg(1, "Wordle 259 3/6", noon_of_259()));
        clock.advance(Duration::days(1));
        pipeline.ingest_live(&msg(2, "Wordle 260 3/6", clock.now()));
        clock.advance(Duration::days(1));

        let report = pipeline.rollover();

        assert_eq!(
            report,
            RolloverReport {
                today: 261,
                inspected: 2,
                reset: 1
            }
        );
        assert_eq!(pipeline.player_stats(PlayerId(1)).unwrap().current_streak, 0);
        assert_eq!(pipeline.player_stats(PlayerId(2)).unwrap().current_streak, 1);
        assert_eq!(pipeline.counters().snapshot().rollover_resets, 1);
    }
}
