// Copyright (c) James Kassemi, SC, US. All rights reserved.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use core_types::status::OverallStatus;
use engine_api::{Engine, EngineError, EngineHealth, EngineResult, HealthStatus};
use ingestion_service::{IngestionPipeline, RolloverReport};
use log::{error, info, warn};
use parking_lot::Mutex;
use tokio::{runtime::Runtime, task::JoinHandle, time::sleep};
use tokio_util::sync::CancellationToken;

const DEFAULT_GRACE_SECS: u64 = 5;

#[derive(Clone)]
pub struct RolloverEngineConfig {
    pub label: String,
    /// Delay after local midnight before sweeping, so results posted right
    /// at the boundary settle on the correct day first.
    pub grace: Duration,
}

impl RolloverEngineConfig {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            grace: Duration::from_secs(DEFAULT_GRACE_SECS),
        }
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }
}

/// Runs [`IngestionPipeline::rollover`] once per local day.
pub struct RolloverEngine {
    inner: Arc<RolloverInner>,
}

impl RolloverEngine {
    pub fn new(config: RolloverEngineConfig, pipeline: Arc<IngestionPipeline>) -> Self {
        Self {
            inner: RolloverInner::new(config, pipeline),
        }
    }

    pub fn last_report(&self) -> Option<RolloverReport> {
        *self.inner.last_report.lock()
    }
}

impl Engine for RolloverEngine {
    fn start(&self) -> EngineResult<()> {
        self.inner.start()
    }

    fn stop(&self) -> EngineResult<()> {
        self.inner.stop()
    }

    fn health(&self) -> EngineHealth {
        self.inner.health()
    }

    fn describe(&self) -> &'static str {
        "daily streak rollover"
    }
}

struct RolloverInner {
    config: RolloverEngineConfig,
    pipeline: Arc<IngestionPipeline>,
    state: Mutex<EngineRuntimeState>,
    health: Mutex<EngineHealth>,
    last_report: Mutex<Option<RolloverReport>>,
}

impl RolloverInner {
    fn new(config: RolloverEngineConfig, pipeline: Arc<IngestionPipeline>) -> Arc<Self> {
        Arc::new(Self {
            config,
            pipeline,
            state: Mutex::new(EngineRuntimeState::Stopped),
            health: Mutex::new(EngineHealth::new(HealthStatus::Stopped, None)),
            last_report: Mutex::new(None),
        })
    }

    fn start(self: &Arc<Self>) -> EngineResult<()> {
        let mut guard = self.state.lock();
        if matches!(*guard, EngineRuntimeState::Running(_)) {
            return Err(EngineError::AlreadyRunning);
        }
        self.set_health(HealthStatus::Starting, None);
        let runtime = Runtime::new().map_err(|err| EngineError::Failure {
            source: Box::new(err),
        })?;
        let cancel = CancellationToken::new();
        let runner = Arc::clone(self);
        let cancel_clone = cancel.clone();
        let handle = runtime.spawn(async move {
            runner.run(cancel_clone).await;
        });
        *guard = EngineRuntimeState::Running(RuntimeBundle {
            runtime,
            handle,
            cancel,
        });
        info!("[{}] rollover engine starting", self.config.label);
        Ok(())
    }

    fn stop(&self) -> EngineResult<()> {
        let mut guard = self.state.lock();
        let Some(bundle) = guard.take_running() else {
            return Err(EngineError::NotRunning);
        };
        bundle.cancel.cancel();
        if let Err(err) = RuntimeBundle::join(bundle) {
            error!(
                "[{}] rollover runtime join failed: {:?}",
                self.config.label, err
            );
        }
        self.set_health(HealthStatus::Stopped, None);
        Ok(())
    }

    fn health(&self) -> EngineHealth {
        self.health.lock().clone()
    }

    fn set_health(&self, status: HealthStatus, detail: Option<String>) {
        let mut guard = self.health.lock();
        guard.status = status;
        guard.detail = detail;
    }

    async fn run(self: Arc<Self>, cancel: CancellationToken) {
        self.set_health(HealthStatus::Ready, None);
        loop {
            let now = self.pipeline.clock().now();
            let delay =
                delay_until_next_rollover(self.pipeline.as_ref(), now, self.config.grace);
            info!(
                "[{}] next rollover in {}s",
                self.config.label,
                delay.as_secs()
            );
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep(delay) => {}
            }

            let report = self.pipeline.rollover();
            let detail = format!(
                "puzzle {} swept: {} of {} streaks reset",
                report.today, report.reset, report.inspected
            );
            let ingest = self.pipeline.status_handle().snapshot();
            if ingest.overall == OverallStatus::Ok {
                self.set_health(HealthStatus::Ready, Some(detail));
            } else {
                warn!(
                    "[{}] ingest reports {} ledger errors",
                    self.config.label,
                    ingest.errors.len()
                );
                self.set_health(
                    HealthStatus::Degraded,
                    Some(format!("{detail}; ingest errors: {}", ingest.errors.join("; "))),
                );
            }
            *self.last_report.lock() = Some(report);
        }
        self.set_health(HealthStatus::Stopped, None);
        info!("[{}] rollover engine stopped", self.config.label);
    }
}

/// Time from `now` until the sweep for the next local day is due.
pub fn delay_until_next_rollover(
    pipeline: &IngestionPipeline,
    now: DateTime<Utc>,
    grace: Duration,
) -> Duration {
    let grace = chrono::Duration::from_std(grace).unwrap_or_else(|_| chrono::Duration::zero());
    let due = pipeline.calendar().next_boundary(now) + grace;
    due.signed_duration_since(now).to_std().unwrap_or(Duration::ZERO)
}

enum EngineRuntimeState {
    Stopped,
    Running(RuntimeBundle),
}

impl EngineRuntimeState {
    fn take_running(&mut self) -> Option<RuntimeBundle> {
        match std::mem::replace(self, EngineRuntimeState::Stopped) {
            EngineRuntimeState::Running(bundle) => Some(bundle),
            other => {
                *self = other;
                None
            }
        }
    }
}

struct RuntimeBundle {
    runtime: Runtime,
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

impl RuntimeBundle {
    fn join(bundle: RuntimeBundle) -> Result<(), tokio::task::JoinError> {
        let RuntimeBundle {
            runtime,
            handle,
            cancel: _,
        } = bundle;
        runtime.block_on(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use core_types::{ChatMessage, Clock, ManualClock, PlayerId};
    use ledger::Registry;
    use puzzle_calendar::PuzzleCalendar;
    use std::{thread, time::Instant};

    fn pipeline_at(now: DateTime<Utc>) -> (Arc<ManualClock>, Arc<IngestionPipeline>) {
        let clock = Arc::new(ManualClock::new(now));
        let pipeline = IngestionPipeline::new(
            PuzzleCalendar::standard(),
            Arc::clone(&clock) as Arc<dyn Clock>,
            Arc::new(Registry::new()),
        );
        (clock, Arc::new(pipeline))
    }

    #[test]
    fn delay_targets_midnight_plus_grace() {
        let now = Utc.with_ymd_and_hms(2022, 3, 5, 23, 0, 0).unwrap();
        let (_clock, pipeline) = pipeline_at(now);
        let delay = delay_until_next_rollover(&pipeline, now, Duration::from_secs(5));
        assert_eq!(delay, Duration::from_secs(3_605));
    }

    #[test]
    fn start_twice_and_stop_twice_are_rejected() {
        let now = Utc.with_ymd_and_hms(2022, 3, 5, 12, 0, 0).unwrap();
        let (_clock, pipeline) = pipeline_at(now);
        let engine = RolloverEngine::new(RolloverEngineConfig::new("test"), pipeline);

        assert_eq!(engine.health().status, HealthStatus::Stopped);
        engine.start().unwrap();
        assert!(matches!(engine.start(), Err(EngineError::AlreadyRunning)));
        engine.stop().unwrap();
        assert!(matches!(engine.stop(), Err(EngineError::NotRunning)));
        assert_eq!(engine.health().status, HealthStatus::Stopped);
        assert!(engine.last_report().is_none());
    }

    fn wait_for_sweep(engine: &RolloverEngine) -> RolloverReport {
        let deadline = Instant::now() + Duration::from_secs(5);
        while engine.last_report().is_none() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        engine.last_report().expect("sweep ran")
    }

    // Puzzle 261, 50ms before local midnight.
    fn just_before_midnight() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 3, 7, 23, 59, 59).unwrap() + chrono::Duration::milliseconds(950)
    }

    #[test]
    fn sweep_runs_when_boundary_passes() {
        let (clock, pipeline) = pipeline_at(Utc.with_ymd_and_hms(2022, 3, 5, 12, 0, 0).unwrap());
        pipeline.ingest_live(&ChatMessage::new(1u64, "Wordle 259 3/6", clock.now()));
        // 260 was missed.
        clock.set(just_before_midnight());
        let engine = RolloverEngine::new(
            RolloverEngineConfig::new("test").with_grace(Duration::ZERO),
            Arc::clone(&pipeline),
        );
        engine.start().unwrap();
        let report = wait_for_sweep(&engine);
        assert_eq!(engine.health().status, HealthStatus::Ready);
        engine.stop().unwrap();

        assert_eq!(report.today, 261);
        assert_eq!(pipeline.counters().snapshot().rollover_resets, 1);
        assert_eq!(pipeline.player_stats(PlayerId(1)).unwrap().current_streak, 0);
        assert_eq!(engine.health().status, HealthStatus::Stopped);
    }

    #[test]
    fn ledger_errors_degrade_health_after_sweep() {
        let (_clock, pipeline) = pipeline_at(just_before_midnight());
        let status = pipeline.status_handle();
        status.set_overall(OverallStatus::Warn);
        status.push_error("ledger 7 invariant violated at puzzle 300");
        let engine = RolloverEngine::new(
            RolloverEngineConfig::new("test").with_grace(Duration::ZERO),
            Arc::clone(&pipeline),
        );
        engine.start().unwrap();
        wait_for_sweep(&engine);
        let health = engine.health();
        engine.stop().unwrap();

        assert_eq!(health.status, HealthStatus::Degraded);
        assert!(health.detail.unwrap().contains("ledger 7"));
    }
}
