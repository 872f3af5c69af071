use serde::{Deserialize, Serialize};
use std::fmt;

/// Lookback periods offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Period {
    #[default]
    Week,
    Month,
    Quarter,
    Half,
    Year,
}

impl Period {
    /// Maps a period label to a period. Unknown labels fall back to a week.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "week" => Period::Week,
            "month" => Period::Month,
            "quarter" => Period::Quarter,
            "half" => Period::Half,
            "year" => Period::Year,
            _ => Period::Week,
        }
    }

    pub fn days_ago(self) -> i64 {
        match self {
            Period::Week => 7,
            Period::Month => 30,
            Period::Quarter => 90,
            Period::Half => 180,
            Period::Year => 365,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Period::Week => "week",
            Period::Month => "month",
            Period::Quarter => "quarter",
            Period::Half => "half",
            Period::Year => "year",
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            Period::Week => "1 week ago",
            Period::Month => "1 month ago",
            Period::Quarter => "3 months ago",
            Period::Half => "6 months ago",
            Period::Year => "1 year ago",
        }
    }
}

impl From<String> for Period {
    fn from(label: String) -> Self {
        Period::from_label(&label)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub fn period_days_ago(label: &str) -> i64 {
    Period::from_label(label).days_ago()
}

/// How far back to look, with the phrase used in report headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookback {
    pub days_ago: i64,
    pub description: String,
}

impl Lookback {
    pub fn from_days(days_ago: i64) -> Self {
        let description = match days_ago {
            1 => "1 day ago".to_string(),
            n => format!("{} days ago", n),
        };
        Self {
            days_ago,
            description,
        }
    }
}

impl From<Period> for Lookback {
    fn from(period: Period) -> Self {
        Self {
            days_ago: period.days_ago(),
            description: period.describe().to_string(),
        }
    }
}
