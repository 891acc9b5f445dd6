//! Period resolution: turns the optional `startDate`/`endDate` query pair
//! into the current reporting window plus the immediately preceding window
//! of equal length, and provides the calendar-month boundaries used by
//! month-over-month growth.

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::error::{AppError, AppResult};

/// A reporting window with inclusive endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Period {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl Period {
    pub fn days(&self) -> i64 {
        (self.to - self.from).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.from && date <= self.to
    }

    /// The window of identical duration ending the day before this one
    /// starts.
    pub fn preceding(&self) -> Period {
        let span = self.days();
        Period {
            from: self.from - Duration::days(span),
            to: self.from - Duration::days(1),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPeriods {
    /// `None` means "all time".
    pub current: Option<Period>,
    pub previous: Option<Period>,
}

impl ResolvedPeriods {
    pub const ALL_TIME: ResolvedPeriods = ResolvedPeriods {
        current: None,
        previous: None,
    };
}

pub fn parse_date(value: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("Invalid ISO date '{}'.", value.trim())))
}

/// Resolves the reporting windows. Both dates must be supplied together;
/// a reversed range is rejected rather than silently swapped, and an
/// optional maximum window (scan cap) can be enforced from configuration.
pub fn resolve(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    max_days: Option<i64>,
) -> AppResult<ResolvedPeriods> {
    let (start, end) = match (start, end) {
        (None, None) => return Ok(ResolvedPeriods::ALL_TIME),
        (Some(start), Some(end)) => (start, end),
        _ => {
            return Err(AppError::BadRequest(
                "startDate and endDate must be provided together.".to_string(),
            ))
        }
    };

    if end < start {
        return Err(AppError::BadRequest(
            "endDate must not be earlier than startDate.".to_string(),
        ));
    }

    let current = Period { from: start, to: end };
    if let Some(max_days) = max_days {
        if current.days() > max_days {
            return Err(AppError::BadRequest(format!(
                "Requested range spans {} days; the maximum is {max_days}.",
                current.days()
            )));
        }
    }

    Ok(ResolvedPeriods {
        current: Some(current),
        previous: Some(current.preceding()),
    })
}

/// The calendar month containing `anchor`, as an inclusive window.
pub fn month_window(anchor: NaiveDate) -> Period {
    let from = NaiveDate::from_ymd_opt(anchor.year(), anchor.month(), 1).unwrap_or(anchor);
    let to = if anchor.month() == 12 {
        NaiveDate::from_ymd_opt(anchor.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(anchor.year(), anchor.month() + 1, 1)
    }
    .map(|next_month| next_month - Duration::days(1))
    .unwrap_or(anchor);
    Period { from, to }
}

pub fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// Keeps the rows whose date falls inside `period`; `None` keeps everything.
pub fn filter_by_date<T, F>(rows: &[T], period: Option<Period>, date_of: F) -> Vec<T>
where
    T: Clone,
    F: Fn(&T) -> NaiveDate,
{
    rows.iter()
        .filter(|row| period.is_none_or(|p| p.contains(date_of(row))))
        .cloned()
        .collect()
}
