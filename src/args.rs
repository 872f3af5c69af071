use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "timecapsule",
    about = "Revisit what you were browsing a week, a month, or a year ago",
    version,
    long_about = None
)]
pub struct Args {
    /// Browser to read history from (chrome, chromium, brave, edge, vivaldi)
    #[arg(short, long, default_value = "Chrome")]
    pub browser: String,

    /// Lookback period: week, month, quarter, half or year
    #[arg(short, long, conflicts_with = "days")]
    pub period: Option<String>,

    /// Look back an exact number of days instead of a named period
    #[arg(short, long)]
    pub days: Option<i64>,

    /// Number of timeline entries to display
    #[arg(short, long, default_value_t = 20)]
    pub top: usize,

    /// Path to custom category rule file
    #[arg(short, long)]
    pub rules: Option<PathBuf>,

    /// Read this History database instead of the browser's default one
    #[arg(long)]
    pub history_path: Option<PathBuf>,

    /// Custom temporary file path for database copy
    #[arg(long)]
    pub temp_path: Option<PathBuf>,

    /// Path to the settings file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Redact domain names for privacy
    #[arg(long)]
    pub redact: bool,

    /// Initialize category_rules.txt with default rules
    #[arg(long)]
    pub init: bool,
}
