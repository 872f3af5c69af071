use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone};
use serde::Serialize;
use thiserror::Error;

use crate::stats::VisitRecord;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history store unavailable: {0}")]
    Unavailable(String),

    #[error("history query failed: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("invalid time range {start}..={end}")]
    InvalidRange { start: i64, end: i64 },
}

/// Source of visit records for a time range.
///
/// `start_time` and `end_time` are inclusive Unix milliseconds. Implementations
/// return at most `max_results` records, one per URL.
pub trait HistoryProvider {
    fn query(
        &self,
        start_time: i64,
        end_time: i64,
        max_results: usize,
    ) -> Result<Vec<VisitRecord>, HistoryError>;
}

/// A local calendar day as an inclusive millisecond interval,
/// 00:00:00.000 through 23:59:59.999.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayWindow {
    pub date: NaiveDate,
    pub start_time: i64,
    pub end_time: i64,
}

impl DayWindow {
    pub fn for_day<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Option<Self> {
        let next = date.checked_add_days(Days::new(1))?;
        let start = start_of_day(date, tz)?;
        let next_start = start_of_day(next, tz)?;

        Some(Self {
            date,
            start_time: start.timestamp_millis(),
            end_time: next_start.timestamp_millis() - 1,
        })
    }
}

// Midnight may not exist locally on DST switch days; the day then starts at
// the first representable instant after it.
fn start_of_day<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Option<DateTime<Tz>> {
    let midnight = NaiveDateTime::new(date, NaiveTime::MIN);
    (0..=2)
        .filter_map(|hours| midnight.checked_add_signed(TimeDelta::hours(hours)))
        .find_map(|local| tz.from_local_datetime(&local).earliest())
}
