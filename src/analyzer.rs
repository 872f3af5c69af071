use chrono::{DateTime, Local, TimeZone, Timelike};
use std::time::Instant;
use tracing::info;

use crate::domain::{hostname, DomainCounter, TOP_DOMAIN_LIMIT};
use crate::rules::RuleSet;
use crate::stats::{AnalysisResult, CategoryCount, VisitRecord};

/// Aggregates `records` using local time for the hourly buckets.
pub fn analyze(records: &[VisitRecord], rules: &RuleSet) -> AnalysisResult {
    analyze_in(records, rules, &Local)
}

/// Aggregates `records` into hourly, domain, and category totals.
///
/// Every record's visit count reaches exactly one bucket of each category
/// scheme. Records without a hostname are left out of the domain list and
/// records without a usable timestamp are left out of the hourly totals.
pub fn analyze_in<Tz: TimeZone>(
    records: &[VisitRecord],
    rules: &RuleSet,
    tz: &Tz,
) -> AnalysisResult {
    let start_time = Instant::now();

    let mut hourly_distribution = [0u64; 24];
    let mut domains = DomainCounter::new();
    let mut url_categories = buckets(rules.url_labels());
    let mut interest_categories = buckets(rules.keyword_labels());
    let mut malformed = 0usize;

    for record in records {
        if let Some(hour) = visit_hour(record.last_visit_time, tz) {
            hourly_distribution[hour] = hourly_distribution[hour].saturating_add(record.visit_count);
        }

        let host = hostname(&record.url);
        match host.as_deref() {
            Some(host) => domains.add(host, record.visit_count),
            None => malformed += 1,
        }

        add_to(&mut url_categories, rules.classify_url(&record.url), record.visit_count);
        add_to(
            &mut interest_categories,
            rules.classify_host(host.as_deref()),
            record.visit_count,
        );
    }

    let unique_domains = domains.unique_domains();
    let domain_frequency = domains.top(TOP_DOMAIN_LIMIT);

    info!(
        action = "complete",
        component = "pattern_analysis",
        record_count = records.len(),
        unique_domains,
        malformed_urls = malformed,
        duration_ms = start_time.elapsed().as_millis(),
        "Pattern analysis completed"
    );

    AnalysisResult {
        hourly_distribution,
        domain_frequency,
        url_categories,
        interest_categories,
    }
}

pub fn visit_hour<Tz: TimeZone>(timestamp_ms: i64, tz: &Tz) -> Option<usize> {
    let instant = DateTime::from_timestamp_millis(timestamp_ms)?;
    Some(instant.with_timezone(tz).hour() as usize)
}

fn buckets<'a>(labels: impl Iterator<Item = &'a str>) -> Vec<CategoryCount> {
    labels
        .map(|label| CategoryCount {
            label: label.to_string(),
            count: 0,
        })
        .collect()
}

fn add_to(categories: &mut [CategoryCount], label: &str, count: u64) {
    if let Some(bucket) = categories.iter_mut().find(|c| c.label == label) {
        bucket.count = bucket.count.saturating_add(count);
    }
}
