//! Billing cycle windows.
//!
//! A cycle runs from the configured start day of one month up to the day
//! before it in the following month (26th to 25th by default). Both ends are
//! inclusive.

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

pub const DEFAULT_START_DAY: u32 = 26;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BillingCycle {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl BillingCycle {
    /// Cycle that contains `date`. `start_day` is clamped to 1..=28 so that
    /// every month has it.
    pub fn containing(date: NaiveDate, start_day: u32) -> Self {
        let start_day = start_day.clamp(1, 28);
        let (year, month) = if date.day() >= start_day {
            (date.year(), date.month())
        } else {
            previous_month(date.year(), date.month())
        };

        let start = ymd(year, month, start_day);
        let (next_year, next_month) = next_month(year, month);
        let end = ymd(next_year, next_month, start_day) - Duration::days(1);

        Self { start, end }
    }

    /// The cycle that ended the day before this one started.
    pub fn previous(&self) -> Self {
        Self::containing(self.start - Duration::days(1), self.start.day())
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Stable identifier used for "already sent" bookkeeping.
    pub fn key(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    pub fn label(&self) -> String {
        format!(
            "{} to {}",
            self.start.format("%b %-d, %Y"),
            self.end.format("%b %-d, %Y")
        )
    }
}

fn previous_month(year: i32, month: u32) -> (i32, u32) {
    if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    // day <= 28 always exists
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}
