use chrono::{DateTime, Days, NaiveDate, TimeDelta, TimeZone};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::history::{DayWindow, HistoryProvider};
use crate::stats::{total_visits, SearchResult, VisitRecord};

pub const DEFAULT_SEARCH_RANGE: u32 = 5;
pub const DEFAULT_EXACT_DAY_THRESHOLD: u64 = 5;
pub const DEFAULT_WINDOW_THRESHOLD: u64 = 10;
pub const DEFAULT_MAX_RESULTS: usize = 1000;

/// Tuning for the expanding-window search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchConfig {
    /// Largest offset in days from the target date.
    pub search_range: u32,
    /// The exact target day is used as-is once its visits exceed this.
    pub exact_day_threshold: u64,
    /// Expansion stops once the best day's visits exceed this.
    pub window_threshold: u64,
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            search_range: DEFAULT_SEARCH_RANGE,
            exact_day_threshold: DEFAULT_EXACT_DAY_THRESHOLD,
            window_threshold: DEFAULT_WINDOW_THRESHOLD,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

pub fn search<P, Tz>(provider: &P, period_days_ago: i64, now: &DateTime<Tz>) -> SearchResult
where
    P: HistoryProvider + ?Sized,
    Tz: TimeZone,
{
    search_with(provider, period_days_ago, now, &SearchConfig::default())
}

/// Finds the busiest day near `period_days_ago` days before `now`.
///
/// Candidates are visited offset by offset, the earlier day before the later
/// one, and days after `now`'s calendar day are never queried. A failing query
/// only drops its own candidate.
pub fn search_with<P, Tz>(
    provider: &P,
    period_days_ago: i64,
    now: &DateTime<Tz>,
    config: &SearchConfig,
) -> SearchResult
where
    P: HistoryProvider + ?Sized,
    Tz: TimeZone,
{
    let start_time = Instant::now();
    let tz = now.timezone();
    let today = now.date_naive();

    let Some(target_date) = TimeDelta::try_days(period_days_ago)
        .and_then(|delta| now.clone().checked_sub_signed(delta))
        .map(|target| target.date_naive())
    else {
        warn!(
            action = "skip",
            component = "window_search",
            period_days_ago,
            "Target date out of range"
        );
        return SearchResult::empty();
    };

    info!(
        action = "start",
        component = "window_search",
        period_days_ago,
        target_date = %target_date,
        "Searching for the busiest day near target date"
    );

    let mut best_results: Vec<VisitRecord> = Vec::new();
    let mut actual_date: Option<NaiveDate> = None;
    let mut max_visits: u64 = 0;
    let mut queries = 0usize;

    for offset in 0..=config.search_range {
        for candidate in candidate_days(target_date, offset) {
            if candidate > today {
                debug!(action = "skip", component = "window_search", candidate = %candidate, "Candidate is in the future");
                continue;
            }

            let Some(window) = DayWindow::for_day(candidate, &tz) else {
                warn!(action = "skip", component = "window_search", candidate = %candidate, "Candidate has no local day window");
                continue;
            };

            queries += 1;
            let mut records =
                match provider.query(window.start_time, window.end_time, config.max_results) {
                    Ok(records) => records,
                    Err(e) => {
                        warn!(
                            action = "query",
                            component = "window_search",
                            candidate = %candidate,
                            error = %e,
                            "History query failed, trying next candidate"
                        );
                        continue;
                    }
                };

            let day_visits = total_visits(&records);
            debug!(
                action = "query",
                component = "window_search",
                candidate = %candidate,
                offset,
                record_count = records.len(),
                total_visits = day_visits,
                "Candidate queried"
            );

            if day_visits > max_visits {
                records.sort_by(|a, b| b.visit_count.cmp(&a.visit_count));
                best_results = records;
                actual_date = Some(candidate);
                max_visits = day_visits;
            }

            if offset == 0 && day_visits > config.exact_day_threshold {
                break;
            }
        }

        if max_visits > config.window_threshold {
            break;
        }
    }

    let search_time = start_time.elapsed();

    if best_results.is_empty() {
        info!(
            action = "complete",
            component = "window_search",
            queries,
            duration_ms = search_time.as_millis(),
            "No activity found near target date"
        );
        return SearchResult::empty();
    }

    info!(
        action = "complete",
        component = "window_search",
        queries,
        actual_date = ?actual_date,
        total_visits = max_visits,
        duration_ms = search_time.as_millis(),
        "Window search completed"
    );

    SearchResult {
        records: best_results,
        actual_date,
    }
}

/// Candidate days at one offset: the target itself at zero, otherwise the
/// earlier day followed by the later day.
pub fn candidate_days(target: NaiveDate, offset: u32) -> Vec<NaiveDate> {
    if offset == 0 {
        return vec![target];
    }

    let days = Days::new(u64::from(offset));
    [target.checked_sub_days(days), target.checked_add_days(days)]
        .into_iter()
        .flatten()
        .collect()
}
