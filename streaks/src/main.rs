// Copyright (c) James Kassemi, SC, US. All rights reserved.

mod config;

use std::{
    env,
    io::{self, BufRead},
    process,
    str::FromStr,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc,
    },
    thread,
    time::Duration,
};

use config::{ConfigError, Environment};
use core_types::{SystemClock, status::ServiceStatusReporter};
use engine_api::{Engine, EngineError};
use ingestion_service::{IngestionPipeline, JsonlMessageSource, SourceError, source::decode_line};
use ledger::{PlayerStats, Registry};
use log::{info, warn};
use puzzle_calendar::PuzzleCalendar;
use rollover_engine::{RolloverEngine, RolloverEngineConfig};
use thiserror::Error;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = run() {
        eprintln!("streaks failed: {err}");
        process::exit(1);
    }
}

fn run() -> Result<(), AppError> {
    let env = parse_environment()?;
    let config = config::load(env)?;

    let calendar = PuzzleCalendar::from_config(&config.calendar).map_err(ConfigError::from)?;
    let registry = Arc::new(Registry::new());
    let pipeline = Arc::new(IngestionPipeline::new(
        calendar,
        Arc::new(SystemClock),
        Arc::clone(&registry),
    ));
    info!(
        "streaks booted in {} mode; puzzle {} is {}, today is puzzle {}",
        env.label(),
        calendar.base_number(),
        calendar.base_date(),
        pipeline.today()
    );

    // Backfill finishes before the live feed is opened below.
    if let Some(path) = &config.history_path {
        let source = JsonlMessageSource::new(path);
        let report = pipeline.backfill_from(&source, config.calendar.history_start)?;
        for violation in &report.violations {
            warn!("[backfill] ledger left unchanged: {violation}");
        }
    } else {
        info!("[backfill] no history_path configured; starting empty");
    }

    let rollover = RolloverEngine::new(
        RolloverEngineConfig::new(env.label())
            .with_grace(Duration::from_secs(config.rollover.grace_secs)),
        Arc::clone(&pipeline),
    );
    rollover.start()?;
    log_engine_health(&rollover);

    let status_logger = StatusLogger::spawn(
        Arc::clone(&pipeline),
        Duration::from_secs(config.status.log_interval_secs),
    );

    let (shutdown_tx, shutdown_rx) = mpsc::channel();
    let ctrlc_tx = shutdown_tx.clone();
    ctrlc::set_handler(move || {
        let _ = ctrlc_tx.send(Shutdown::Signal);
    })?;
    spawn_live_reader(Arc::clone(&pipeline), shutdown_tx);
    info!("reading live messages from stdin; press Ctrl+C to shut down");

    match shutdown_rx.recv()? {
        Shutdown::Signal => info!("shutdown signal received"),
        Shutdown::EndOfInput => info!("live feed closed"),
    }
    status_logger.shutdown();
    rollover.stop()?;
    log_leaderboard(&pipeline.stats());
    Ok(())
}

fn parse_environment() -> Result<Environment, AppError> {
    let arg = env::args().nth(1).ok_or(AppError::Usage)?;
    Environment::from_str(&arg).map_err(AppError::from)
}

#[derive(Debug, Error)]
enum AppError {
    #[error("usage: streaks <dev|prod>")]
    Usage,
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("failed to install signal handler: {0}")]
    Signal(#[from] ctrlc::Error),
    #[error("failed while waiting for shutdown signal: {0}")]
    ShutdownWait(#[from] mpsc::RecvError),
}

enum Shutdown {
    Signal,
    EndOfInput,
}

/// One JSON chat message per stdin line. The thread is left detached on
/// Ctrl+C since it may be blocked on a read.
fn spawn_live_reader(pipeline: Arc<IngestionPipeline>, shutdown: mpsc::Sender<Shutdown>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for (idx, line) in stdin.lock().lines().enumerate() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    warn!("[live] stdin read failed: {err}");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match decode_line(&line) {
                Ok(message) => {
                    pipeline.ingest_live(&message);
                }
                Err(err) => warn!("[live] line {} skipped: {err}", idx + 1),
            }
        }
        let _ = shutdown.send(Shutdown::EndOfInput);
    });
}

fn log_engine_health(engine: &dyn Engine) {
    let health = engine.health();
    info!("{} status: {health}", engine.describe());
}

fn log_leaderboard(stats: &[PlayerStats]) {
    for player in stats {
        let average = player
            .average_tries
            .map_or_else(|| "-".to_string(), |avg| format!("{avg:.2}"));
        info!(
            "player {}: streak={} games={} avg={} hard={} failed={}",
            player.player_id,
            player.current_streak,
            player.total_games,
            average,
            player.hard_mode_games,
            player.failed_games
        );
    }
}

struct StatusLogger {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl StatusLogger {
    fn spawn(pipeline: Arc<IngestionPipeline>, interval: Duration) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_clone = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            while !stop_clone.load(Ordering::Relaxed) {
                info!("{}", pipeline.status());
                log_leaderboard(&pipeline.stats());
                if stop_clone.load(Ordering::Relaxed) {
                    break;
                }
                sleep_with_stop(&stop_clone, interval);
            }
        });
        Self {
            stop,
            handle: Some(handle),
        }
    }

    fn shutdown(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for StatusLogger {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn sleep_with_stop(stop: &AtomicBool, interval: Duration) {
    let mut remaining = interval;
    const STEP: Duration = Duration::from_millis(500);
    while remaining > Duration::ZERO {
        if stop.load(Ordering::Relaxed) {
            break;
        }
        let sleep_for = remaining.min(STEP);
        thread::sleep(sleep_for);
        remaining = remaining.saturating_sub(sleep_for);
    }
}
