use std::collections::HashMap;
use url::Url;

use crate::stats::DomainCount;

pub const TOP_DOMAIN_LIMIT: usize = 10;

/// Hostname of `url`, or `None` when it does not parse or has no host.
pub fn hostname(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    match parsed.host_str() {
        Some(host) if !host.is_empty() => Some(host.to_string()),
        _ => None,
    }
}

/// Visit totals per domain, remembering the order domains were first seen.
#[derive(Debug, Default)]
pub struct DomainCounter {
    index: HashMap<String, usize>,
    counts: Vec<DomainCount>,
}

impl DomainCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, domain: &str, count: u64) {
        match self.index.get(domain) {
            Some(&slot) => {
                let entry = &mut self.counts[slot];
                entry.count = entry.count.saturating_add(count);
            }
            None => {
                self.index.insert(domain.to_string(), self.counts.len());
                self.counts.push(DomainCount {
                    domain: domain.to_string(),
                    count,
                });
            }
        }
    }

    pub fn unique_domains(&self) -> usize {
        self.counts.len()
    }

    /// Busiest `limit` domains; equal counts keep first-seen order.
    pub fn top(mut self, limit: usize) -> Vec<DomainCount> {
        self.counts.sort_by(|a, b| b.count.cmp(&a.count));
        self.counts.truncate(limit);
        self.counts
    }
}
