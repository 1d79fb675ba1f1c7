// Copyright (c) James Kassemi, SC, US. All rights reserved.

//! Maps calendar dates to sequential puzzle numbers and back.
//!
//! The mapping is anchored at a single `(date, number)` pair and advances by one
//! per calendar day. "Today" is the local date of an instant under a fixed UTC
//! offset, so every day-relative decision in the workspace goes through
//! [`PuzzleCalendar::today`].

use chrono::{DateTime, Days, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use core_types::{PuzzleDay, config::CalendarConfig, config::ConfigError};

pub const DEFAULT_BASE_NUMBER: PuzzleDay = 259;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PuzzleCalendar {
    base_date: NaiveDate,
    base_number: PuzzleDay,
    offset: FixedOffset,
}

impl PuzzleCalendar {
    pub fn new(base_date: NaiveDate, base_number: PuzzleDay, offset: FixedOffset) -> Self {
        Self {
            base_date,
            base_number,
            offset,
        }
    }

    /// Anchor used by the public game: puzzle 259 was played on 2022-03-05.
    pub fn standard() -> Self {
        let base_date = NaiveDate::from_ymd_opt(2022, 3, 5).expect("valid anchor date");
        Self::new(base_date, DEFAULT_BASE_NUMBER, utc())
    }

    pub fn from_config(config: &CalendarConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            config.base_date,
            config.base_number,
            config.utc_offset()?,
        ))
    }

    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    pub fn base_date(&self) -> NaiveDate {
        self.base_date
    }

    pub fn base_number(&self) -> PuzzleDay {
        self.base_number
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Dates before the anchor simply map to smaller numbers.
    pub fn date_to_day(&self, date: NaiveDate) -> PuzzleDay {
        self.base_number + date.signed_duration_since(self.base_date).num_days()
    }

    /// Inverse of [`Self::date_to_day`]; saturates at chrono's representable range.
    pub fn day_to_date(&self, day: PuzzleDay) -> NaiveDate {
        let delta = day.saturating_sub(self.base_number);
        let shifted = if delta >= 0 {
            self.base_date.checked_add_days(Days::new(delta.unsigned_abs()))
        } else {
            self.base_date.checked_sub_days(Days::new(delta.unsigned_abs()))
        };
        shifted.unwrap_or(if delta >= 0 {
            NaiveDate::MAX
        } else {
            NaiveDate::MIN
        })
    }

    pub fn local_date(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.offset).date_naive()
    }

    pub fn today(&self, now: DateTime<Utc>) -> PuzzleDay {
        self.date_to_day(self.local_date(now))
    }

    /// First local midnight strictly after `now`.
    pub fn next_boundary(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.local_date(now)
            .succ_opt()
            .map(|date| date.and_time(NaiveTime::MIN))
            .and_then(|naive| self.offset.from_local_datetime(&naive).single())
            .map(|local| local.with_timezone(&Utc))
            .unwrap_or_else(|| now + Duration::days(1))
    }
}

impl Default for PuzzleCalendar {
    fn default() -> Self {
        Self::standard()
    }
}

fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).expect("zero offset")
}
