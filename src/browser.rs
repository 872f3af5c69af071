use anyhow::Result;
use chrono::{DateTime, Datelike, Local, TimeZone};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

use crate::analyzer::analyze_in;
use crate::domain::hostname;
use crate::history::HistoryProvider;
use crate::period::Lookback;
use crate::rules::RuleSet;
use crate::search::{search_with, SearchConfig};
use crate::sqlite::{self, SqliteHistory};
use crate::stats::{AnalysisResult, Capsule, SearchResult, VisitRecord};
use crate::utils::{format_number, redact_domain};
use crate::Args;

const TOP_CATEGORY_COUNT: usize = 5;
const HISTOGRAM_WIDTH: u64 = 30;

/// Finds the busiest day near the lookback date and analyzes it.
pub fn recall<P, Tz>(
    provider: &P,
    days_ago: i64,
    now: &DateTime<Tz>,
    rules: &RuleSet,
    config: &SearchConfig,
) -> Capsule
where
    P: HistoryProvider + ?Sized,
    Tz: TimeZone,
{
    let search = search_with(provider, days_ago, now, config);
    if search.is_empty() {
        return Capsule::Empty;
    }

    let analysis = analyze_in(&search.records, rules, &now.timezone());
    Capsule::Populated { search, analysis }
}

pub fn recall_browser_history(
    args: &Args,
    lookback: &Lookback,
    rules: &RuleSet,
    config: &SearchConfig,
) -> Result<Capsule> {
    let total_start_time = Instant::now();
    info!(
        action = "start",
        component = "recall",
        days_ago = lookback.days_ago,
        "Starting browser history recall"
    );

    let history_path = match &args.history_path {
        Some(path) => path.clone(),
        None => sqlite::get_browser_history_path(&args.browser)?,
    };
    let temp_copy = TempCopy::new(sqlite::copy_history_database(
        &history_path,
        args.temp_path.as_deref(),
    )?);

    let capsule = {
        let history = SqliteHistory::open(temp_copy.path())?;
        recall(&history, lookback.days_ago, &Local::now(), rules, config)
    };
    drop(temp_copy);

    let total_time = total_start_time.elapsed();
    info!(
        action = "complete",
        component = "recall",
        duration_ms = total_time.as_millis(),
        "Recall completed successfully"
    );

    Ok(capsule)
}

/// Deletes the copied history database when dropped, on every exit path.
struct TempCopy(PathBuf);

impl TempCopy {
    fn new(path: PathBuf) -> Self {
        Self(path)
    }

    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for TempCopy {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.0) {
            warn!(action = "cleanup", component = "database_copy", error = %e, "Failed to remove temporary file");
        }
    }
}

fn display_host(host: &str, redact: bool) -> String {
    if redact {
        redact_domain(host)
    } else {
        host.to_string()
    }
}

fn visit_clock(record: &VisitRecord) -> String {
    DateTime::from_timestamp_millis(record.last_visit_time)
        .map(|t| t.with_timezone(&Local).format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_string())
}

pub fn print_capsule(capsule: &Capsule, lookback: &Lookback, args: &Args, show_analytics: bool) {
    match capsule {
        Capsule::Loading => println!("Loading..."),
        Capsule::Empty => {
            println!("\n--- {} ---", lookback.description);
            println!("No browsing activity found around that date.");
        }
        Capsule::Populated { search, analysis } => {
            print_timeline(search, lookback, args);
            if show_analytics {
                print_analysis(analysis, args);
            }
        }
    }
}

fn print_timeline(search: &SearchResult, lookback: &Lookback, args: &Args) {
    match search.actual_date {
        Some(date) => println!(
            "\n--- {} around ({}/{}) ---",
            lookback.description,
            date.month(),
            date.day()
        ),
        None => println!("\n--- {} ---", lookback.description),
    }

    let unique_sites: HashSet<String> = search
        .records
        .iter()
        .filter_map(|r| hostname(&r.url))
        .collect();
    println!("Sites visited: {}", format_number(unique_sites.len() as u64));
    println!("Total visits: {}", format_number(search.total_visits()));

    println!(
        "\nTimeline (top {}):",
        std::cmp::min(args.top, search.records.len())
    );
    for record in search.records.iter().take(args.top) {
        let host = hostname(&record.url).unwrap_or_else(|| record.url.clone());
        let host = display_host(&host, args.redact);
        let title = if record.title.is_empty() || args.redact {
            host.as_str()
        } else {
            record.title.as_str()
        };
        println!("- {}  {} ({})", visit_clock(record), title, host);
    }
}

fn print_analysis(analysis: &AnalysisResult, args: &Args) {
    println!("\nTop domains:");
    for entry in &analysis.domain_frequency {
        println!(
            "- {}: {} visits",
            display_host(&entry.domain, args.redact),
            format_number(entry.count)
        );
    }

    println!("\nInterests:");
    for category in analysis.top_categories(TOP_CATEGORY_COUNT) {
        println!("- {}: {} visits", category.label, format_number(category.count));
    }

    println!("\nURL categories:");
    for category in analysis.top_url_categories(analysis.url_categories.len()) {
        println!("- {}: {} visits", category.label, format_number(category.count));
    }

    if let Some(top) = analysis.top_categories(1).first() {
        println!(
            "\nMost visited category: {} ({} visits)",
            top.label,
            format_number(top.count)
        );
    }

    if let Some(hour) = analysis.busiest_hour() {
        println!("Busiest hour: {:02}:00", hour);
    }

    let peak = analysis.hourly_distribution.iter().copied().max().unwrap_or(0);
    if peak == 0 {
        return;
    }
    println!("\nHourly activity:");
    for (hour, count) in analysis.hourly_distribution.iter().enumerate() {
        let width = bar_width(*count, peak);
        println!("{:02} {:<30} {}", hour, "#".repeat(width), count);
    }
}

fn bar_width(count: u64, peak: u64) -> usize {
    if peak == 0 {
        return 0;
    }
    let scaled = (u128::from(count) * u128::from(HISTOGRAM_WIDTH)).div_ceil(u128::from(peak));
    scaled.min(u128::from(HISTOGRAM_WIDTH)) as usize
}

pub fn capsule_json(capsule: &Capsule) -> Result<String> {
    Ok(serde_json::to_string_pretty(capsule)?)
}
