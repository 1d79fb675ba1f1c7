// Copyright (c) James Kassemi, SC, US. All rights reserved.

use std::{collections::HashMap, sync::Arc};

use core_types::PlayerId;
use log::debug;
use parking_lot::{Mutex, RwLock};

use crate::ledger::{PlayerLedger, PlayerStats};

/// Exclusive access to one player's ledger. Every mutation of a player goes
/// through this mutex; different players never contend.
pub type LedgerHandle = Arc<Mutex<PlayerLedger>>;

/// `PlayerId -> ledger` map owned by the pipeline for the life of the process.
#[derive(Default)]
pub struct Registry {
    ledgers: RwLock<HashMap<PlayerId, LedgerHandle>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the player's ledger, creating it atomically on first sight.
    pub fn get_or_insert(&self, player_id: PlayerId) -> LedgerHandle {
        if let Some(handle) = self.ledgers.read().get(&player_id) {
            return Arc::clone(handle);
        }
        let mut guard = self.ledgers.write();
        let handle = guard.entry(player_id).or_insert_with(|| {
            debug!("[registry] opened ledger for player {}", player_id);
            Arc::new(Mutex::new(PlayerLedger::new(player_id)))
        });
        Arc::clone(handle)
    }

    pub fn get(&self, player_id: PlayerId) -> Option<LedgerHandle> {
        self.ledgers.read().get(&player_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.ledgers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ledgers.read().is_empty()
    }

    pub fn player_ids(&self) -> Vec<PlayerId> {
        let mut ids: Vec<_> = self.ledgers.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Snapshot of every handle, ordered by player id. The map lock is released
    /// before the caller touches any ledger.
    pub fn handles(&self) -> Vec<(PlayerId, LedgerHandle)> {
        let mut handles: Vec<_> = self
            .ledgers
            .read()
            .iter()
            .map(|(id, handle)| (*id, Arc::clone(handle)))
            .collect();
        handles.sort_unstable_by_key(|(id, _)| *id);
        handles
    }

    pub fn player_stats(&self, player_id: PlayerId) -> Option<PlayerStats> {
        self.get(player_id).map(|handle| handle.lock().stats())
    }

    pub fn stats(&self) -> Vec<PlayerStats> {
        self.handles()
            .into_iter()
            .map(|(_, handle)| handle.lock().stats())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::RecordOutcome;
    use chrono::{TimeZone, Utc};
    use core_types::{PuzzleResult, ScoreMatrix, Tries};
    use std::thread;

    fn result(day: i64) -> PuzzleResult {
        PuzzleResult::new(
            day,
            Tries::solved(3).unwrap(),
            false,
            Utc.with_ymd_and_hms(2022, 3, 5, 8, 0, 0).unwrap(),
            ScoreMatrix::default(),
        )
    }

    #[test]
    fn first_sight_creates_exactly_one_ledger() {
        let registry = Arc::new(Registry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.get_or_insert(PlayerId(77)))
            })
            .collect();
        let ledgers: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(registry.len(), 1);
        assert!(ledgers.iter().all(|l| Arc::ptr_eq(l, &ledgers[0])));
    }

    #[test]
    fn concurrent_records_for_one_player_serialise() {
        let registry = Arc::new(Registry::new());
        let workers: Vec<_> = (0..4)
            .map(|worker| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    for day in 0..50 {
                        let handle = registry.get_or_insert(PlayerId(5));
                        let outcome = handle.lock().record(result(day * 4 + worker), 1_000);
                        assert_eq!(outcome, RecordOutcome::Accepted);
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
        let stats = registry.player_stats(PlayerId(5)).unwrap();
        assert_eq!(stats.total_games, 200);
    }

    #[test]
    fn handles_and_stats_are_ordered_by_player() {
        let registry = Registry::new();
        assert!(registry.is_empty());
        for id in [30, 10, 20] {
            registry.get_or_insert(PlayerId(id));
        }
        assert_eq!(
            registry.player_ids(),
            vec![PlayerId(10), PlayerId(20), PlayerId(30)]
        );
        let stats_ids: Vec<_> = registry.stats().iter().map(|s| s.player_id).collect();
        assert_eq!(stats_ids, registry.player_ids());
        assert!(registry.get(PlayerId(99)).is_none());
        assert!(registry.player_stats(PlayerId(99)).is_none());
    }
}
