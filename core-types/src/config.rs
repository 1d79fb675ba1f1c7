// Copyright (c) James Kassemi, SC, US. All rights reserved.

use std::path::PathBuf;

use ::config::{Config, Environment, File};
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::PuzzleDay;

pub const ENV_PREFIX: &str = "STREAKS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Source(#[from] ::config::ConfigError),
    #[error("calendar.utc_offset_minutes {value} outside +/-1439")]
    InvalidUtcOffset { value: i32 },
}

/// Runtime knobs. File values are overridden by `STREAKS_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub history_path: Option<PathBuf>,
    #[serde(default)]
    pub rollover: RolloverConfig,
    #[serde(default)]
    pub status: StatusConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    #[serde(default = "default_base_date")]
    pub base_date: NaiveDate,
    #[serde(default = "default_base_number")]
    pub base_number: PuzzleDay,
    #[serde(default)]
    pub utc_offset_minutes: i32,
    #[serde(default = "default_history_start")]
    pub history_start: DateTime<Utc>,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            base_date: default_base_date(),
            base_number: default_base_number(),
            utc_offset_minutes: 0,
            history_start: default_history_start(),
        }
    }
}

impl CalendarConfig {
    pub fn utc_offset(&self) -> Result<FixedOffset, ConfigError> {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or(ConfigError::InvalidUtcOffset {
                value: self.utc_offset_minutes,
            })
    }
}

fn default_base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, 3, 5).expect("valid anchor date")
}

fn default_base_number() -> PuzzleDay {
    259
}

fn default_history_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0)
        .single()
        .expect("valid history start")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolloverConfig {
    #[serde(default = "default_grace_secs")]
    pub grace_secs: u64,
}

impl Default for RolloverConfig {
    fn default() -> Self {
        Self {
            grace_secs: default_grace_secs(),
        }
    }
}

fn default_grace_secs() -> u64 {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusConfig {
    #[serde(default = "default_log_interval_secs")]
    pub log_interval_secs: u64,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            log_interval_secs: default_log_interval_secs(),
        }
    }
}

fn default_log_interval_secs() -> u64 {
    60
}

impl AppConfig {
    /// Loads `<file_stem>.toml` (optional) and layers `STREAKS_*` overrides on top.
    pub fn load(file_stem: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name(file_stem).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        let config: Self = settings.try_deserialize()?;
        config.calendar.utc_offset()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_published_anchor() {
        let config = AppConfig::default();
        assert_eq!(config.calendar.base_number, 259);
        assert_eq!(
            config.calendar.base_date,
            NaiveDate::from_ymd_opt(2022, 3, 5).unwrap()
        );
        assert_eq!(config.rollover.grace_secs, 5);
        assert!(config.history_path.is_none());
    }

    #[test]
    fn utc_offset_is_validated() {
        let mut calendar = CalendarConfig::default();
        calendar.utc_offset_minutes = 60;
        assert_eq!(calendar.utc_offset().unwrap().local_minus_utc(), 3600);
        calendar.utc_offset_minutes = 24 * 60;
        assert!(matches!(
            calendar.utc_offset(),
            Err(ConfigError::InvalidUtcOffset { value: 1440 })
        ));
    }

    #[test]
    fn load_without_file_yields_defaults() {
        let config = AppConfig::load("does-not-exist-streaks").unwrap();
        assert_eq!(config.calendar.base_number, 259);
        assert_eq!(config.status.log_interval_secs, 60);
    }
}
