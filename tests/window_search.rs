use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::cell::RefCell;
use std::collections::HashMap;

use timecapsule::{search, search_with, HistoryError, HistoryProvider, SearchConfig, VisitRecord};

/// Serves canned records per UTC day and remembers every day it was asked for.
#[derive(Default)]
struct ScriptedHistory {
    days: HashMap<NaiveDate, Vec<VisitRecord>>,
    failing: Vec<NaiveDate>,
    fail_all: bool,
    queried: RefCell<Vec<NaiveDate>>,
    max_results_seen: RefCell<Vec<usize>>,
}

impl ScriptedHistory {
    fn with_day(mut self, day: NaiveDate, counts: &[u64]) -> Self {
        let noon = Utc
            .from_utc_datetime(&day.and_hms_opt(12, 0, 0).unwrap())
            .timestamp_millis();
        let records = counts
            .iter()
            .enumerate()
            .map(|(i, &count)| {
                VisitRecord::new(format!("https://site{i}.com/{day}"), "", noon, count)
            })
            .collect();
        self.days.insert(day, records);
        self
    }

    fn failing_on(mut self, day: NaiveDate) -> Self {
        self.failing.push(day);
        self
    }

    fn queried(&self) -> Vec<NaiveDate> {
        self.queried.borrow().clone()
    }
}

impl HistoryProvider for ScriptedHistory {
    fn query(
        &self,
        start_time: i64,
        end_time: i64,
        max_results: usize,
    ) -> Result<Vec<VisitRecord>, HistoryError> {
        assert_eq!(end_time - start_time, 86_400_000 - 1, "full-day window");
        let day = DateTime::from_timestamp_millis(start_time)
            .unwrap()
            .date_naive();
        self.queried.borrow_mut().push(day);
        self.max_results_seen.borrow_mut().push(max_results);

        if self.fail_all || self.failing.contains(&day) {
            return Err(HistoryError::Unavailable(format!("no history for {day}")));
        }
        Ok(self.days.get(&day).cloned().unwrap_or_default())
    }
}

fn day(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, m, d).unwrap()
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap()
}

#[test]
fn scans_offsets_outward_with_earlier_day_first() {
    let history = ScriptedHistory::default();
    let result = search(&history, 30, &now());

    assert!(result.is_empty());
    assert_eq!(result.actual_date, None);
    assert_eq!(
        history.queried(),
        vec![
            day(5, 31),
            day(5, 30),
            day(6, 1),
            day(5, 29),
            day(6, 2),
            day(5, 28),
            day(6, 3),
            day(5, 27),
            day(6, 4),
            day(5, 26),
            day(6, 5),
        ]
    );
}

#[test]
fn never_queries_days_after_today() {
    let history = ScriptedHistory::default();
    search(&history, 2, &now());

    let queried = history.queried();
    assert!(queried.iter().all(|d| *d <= day(6, 30)));
    assert_eq!(
        queried,
        vec![
            day(6, 28),
            day(6, 27),
            day(6, 29),
            day(6, 26),
            day(6, 30),
            day(6, 25),
            day(6, 24),
            day(6, 23),
        ]
    );
}

#[test]
fn falls_back_to_earlier_day_and_stops_once_window_is_busy() {
    let history = ScriptedHistory::default().with_day(day(5, 30), &[5, 7]);
    let result = search(&history, 30, &now());

    assert_eq!(result.actual_date, Some(day(5, 30)));
    assert_eq!(result.total_visits(), 12);
    assert_eq!(history.queried(), vec![day(5, 31), day(5, 30), day(6, 1)]);
}

#[test]
fn busy_target_day_still_expands_until_window_threshold() {
    let history = ScriptedHistory::default()
        .with_day(day(5, 31), &[6])
        .with_day(day(6, 1), &[20]);
    let result = search(&history, 30, &now());

    assert_eq!(result.actual_date, Some(day(6, 1)));
    assert_eq!(result.total_visits(), 20);
    assert_eq!(history.queried(), vec![day(5, 31), day(5, 30), day(6, 1)]);
}

#[test]
fn busy_target_day_over_window_threshold_stops_immediately() {
    let history = ScriptedHistory::default().with_day(day(5, 31), &[11]);
    let result = search(&history, 30, &now());

    assert_eq!(result.actual_date, Some(day(5, 31)));
    assert_eq!(history.queried(), vec![day(5, 31)]);
}

#[test]
fn equal_activity_prefers_the_earlier_day() {
    let history = ScriptedHistory::default()
        .with_day(day(5, 30), &[12])
        .with_day(day(6, 1), &[12]);
    let result = search(&history, 30, &now());

    assert_eq!(result.actual_date, Some(day(5, 30)));
}

#[test]
fn quiet_days_keep_scanning_the_whole_window() {
    let history = ScriptedHistory::default()
        .with_day(day(5, 29), &[2])
        .with_day(day(6, 4), &[4]);
    let result = search(&history, 30, &now());

    assert_eq!(result.actual_date, Some(day(6, 4)));
    assert_eq!(history.queried().len(), 11);
}

#[test]
fn failed_day_is_skipped() {
    let history = ScriptedHistory::default()
        .failing_on(day(5, 31))
        .with_day(day(5, 30), &[3]);
    let result = search(&history, 30, &now());

    assert_eq!(result.actual_date, Some(day(5, 30)));
    assert_eq!(history.queried().len(), 11);
}

#[test]
fn every_query_failing_yields_empty_result() {
    let history = ScriptedHistory {
        fail_all: true,
        ..Default::default()
    };
    let result = search(&history, 7, &now());

    assert!(result.records.is_empty());
    assert_eq!(result.actual_date, None);
    assert_eq!(history.queried().len(), 11);
}

#[test]
fn days_with_zero_visits_are_never_chosen() {
    let history = ScriptedHistory::default().with_day(day(6, 23), &[0, 0]);
    let result = search(&history, 7, &now());

    assert!(result.is_empty());
    assert_eq!(result.actual_date, None);
}

#[test]
fn chosen_records_are_sorted_by_visit_count_stably() {
    let history = ScriptedHistory::default().with_day(day(6, 23), &[2, 9, 2, 4]);
    let result = search(&history, 7, &now());

    let order: Vec<(u64, &str)> = result
        .records
        .iter()
        .map(|r| (r.visit_count, r.url.split('/').nth(2).unwrap()))
        .collect();
    assert_eq!(
        order,
        vec![
            (9, "site1.com"),
            (4, "site3.com"),
            (2, "site0.com"),
            (2, "site2.com"),
        ]
    );
}

#[test]
fn custom_config_bounds_the_scan_and_result_cap() {
    let history = ScriptedHistory::default();
    let config = SearchConfig {
        search_range: 1,
        max_results: 50,
        ..SearchConfig::default()
    };
    search_with(&history, 7, &now(), &config);

    assert_eq!(history.queried(), vec![day(6, 23), day(6, 22), day(6, 24)]);
    assert!(history.max_results_seen.borrow().iter().all(|&m| m == 50));
}

#[test]
fn default_cap_is_one_thousand_records() {
    let history = ScriptedHistory::default();
    search(&history, 7, &now());
    assert!(history.max_results_seen.borrow().iter().all(|&m| m == 1000));
}

#[test]
fn lowered_thresholds_stop_earlier() {
    let history = ScriptedHistory::default()
        .with_day(day(6, 23), &[3])
        .with_day(day(6, 22), &[50]);
    let config = SearchConfig {
        exact_day_threshold: 1,
        window_threshold: 2,
        ..SearchConfig::default()
    };
    let result = search_with(&history, 7, &now(), &config);

    assert_eq!(result.actual_date, Some(day(6, 23)));
    assert_eq!(history.queried(), vec![day(6, 23)]);
}
