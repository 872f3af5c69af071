pub mod analyzer;
pub mod args;
pub mod browser;
pub mod config;
pub mod domain;
pub mod history;
pub mod period;
pub mod rules;
pub mod search;
pub mod sqlite;
pub mod stats;
pub mod utils;

pub use analyzer::{analyze, analyze_in};
pub use args::Args;
pub use browser::{recall, recall_browser_history};
pub use history::{DayWindow, HistoryError, HistoryProvider};
pub use period::{Lookback, Period};
pub use rules::{init_default_rules, load_rules, RuleSet};
pub use search::{search, search_with, SearchConfig};
pub use stats::{AnalysisResult, Capsule, SearchResult, VisitRecord};
