use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One browsing-history entry as returned by a history provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitRecord {
    pub url: String,
    #[serde(default)]
    pub title: String,
    /// Milliseconds since the Unix epoch.
    pub last_visit_time: i64,
    pub visit_count: u64,
}

impl VisitRecord {
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        last_visit_time: i64,
        visit_count: u64,
    ) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            last_visit_time,
            visit_count,
        }
    }
}

pub fn total_visits(records: &[VisitRecord]) -> u64 {
    records
        .iter()
        .map(|r| r.visit_count)
        .fold(0, u64::saturating_add)
}

/// The day chosen by the window search and its records, busiest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub records: Vec<VisitRecord>,
    pub actual_date: Option<NaiveDate>,
}

impl SearchResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn total_visits(&self) -> u64 {
        total_visits(&self.records)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainCount {
    pub domain: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub label: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisResult {
    pub hourly_distribution: [u64; 24],
    /// At most ten entries, busiest first.
    pub domain_frequency: Vec<DomainCount>,
    /// Regex scheme, every bucket in table order.
    pub url_categories: Vec<CategoryCount>,
    /// Keyword scheme, every bucket in table order.
    pub interest_categories: Vec<CategoryCount>,
}

impl AnalysisResult {
    pub fn category_count(categories: &[CategoryCount], label: &str) -> u64 {
        categories
            .iter()
            .find(|c| c.label == label)
            .map(|c| c.count)
            .unwrap_or(0)
    }

    /// Interest buckets ranked by count, ties keep table order.
    pub fn top_categories(&self, n: usize) -> Vec<&CategoryCount> {
        rank(&self.interest_categories, n)
    }

    pub fn top_url_categories(&self, n: usize) -> Vec<&CategoryCount> {
        rank(&self.url_categories, n)
    }

    pub fn busiest_hour(&self) -> Option<usize> {
        let (hour, count) = self
            .hourly_distribution
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))?;
        (*count > 0).then_some(hour)
    }
}

fn rank(categories: &[CategoryCount], n: usize) -> Vec<&CategoryCount> {
    let mut ranked: Vec<&CategoryCount> = categories.iter().filter(|c| c.count > 0).collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(n);
    ranked
}

/// What the presentation layer renders for one recall request.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Capsule {
    Loading,
    Populated {
        search: SearchResult,
        analysis: AnalysisResult,
    },
    Empty,
}
