use anyhow::{Context, Result};
use rusqlite::{params, Connection, OpenFlags};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

use crate::history::{HistoryError, HistoryProvider};
use crate::stats::VisitRecord;

/// Milliseconds between 1601-01-01 (Chromium's epoch) and 1970-01-01.
pub const CHROME_EPOCH_OFFSET_MS: i64 = 11_644_473_600_000;

pub fn unix_ms_to_chrome(unix_ms: i64) -> i64 {
    unix_ms
        .saturating_add(CHROME_EPOCH_OFFSET_MS)
        .saturating_mul(1000)
}

pub fn chrome_to_unix_ms(chrome_us: i64) -> i64 {
    chrome_us / 1000 - CHROME_EPOCH_OFFSET_MS
}

// (linux, macos, windows) profile directories, relative to the config root.
fn profile_dirs(browser: &str) -> Option<(&'static str, &'static str, &'static str)> {
    match browser {
        "chrome" => Some((
            ".config/google-chrome/Default",
            "Library/Application Support/Google/Chrome/Default",
            "Google/Chrome/User Data/Default",
        )),
        "chromium" => Some((
            ".config/chromium/Default",
            "Library/Application Support/Chromium/Default",
            "Chromium/User Data/Default",
        )),
        "brave" => Some((
            ".config/BraveSoftware/Brave-Browser/Default",
            "Library/Application Support/BraveSoftware/Brave-Browser/Default",
            "BraveSoftware/Brave-Browser/User Data/Default",
        )),
        "edge" => Some((
            ".config/microsoft-edge/Default",
            "Library/Application Support/Microsoft Edge/Default",
            "Microsoft/Edge/User Data/Default",
        )),
        "vivaldi" => Some((
            ".config/vivaldi/default",
            "Library/Application Support/Vivaldi/Default",
            "Vivaldi/User Data/Default",
        )),
        _ => None,
    }
}

pub fn get_browser_history_path(browser: &str) -> Result<PathBuf> {
    let system = env::consts::OS;
    let key = browser.to_lowercase();

    let Some((linux, macos, windows)) = profile_dirs(&key) else {
        anyhow::bail!("Unsupported browser '{}'", browser);
    };

    let profile = match system {
        "windows" => {
            let local_app_data = env::var("LOCALAPPDATA")?;
            PathBuf::from(local_app_data).join(windows)
        }
        "macos" | "linux" => {
            let home = env::var("HOME").or_else(|_| env::var("USERPROFILE"))?;
            PathBuf::from(home).join(if system == "macos" { macos } else { linux })
        }
        _ => anyhow::bail!(
            "Unsupported browser '{}' or operating system '{}'",
            browser,
            system
        ),
    };

    let path = profile.join("History");
    info!(action = "resolve", component = "browser_path", browser = browser, path = ?path, "Browser history path resolved");
    Ok(path)
}

/// Copies the history database aside, since the browser keeps it locked.
pub fn copy_history_database(history_path: &Path, temp_path: Option<&Path>) -> Result<PathBuf> {
    let start_time = Instant::now();
    info!(action = "start", component = "database_copy", "Copying browser history database");

    let temp_path = temp_path
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| env::temp_dir().join("timecapsule_history_copy.db"));

    info!(action = "copy", component = "database_copy", source = ?history_path, destination = ?temp_path, "Database copy paths");

    if !history_path.exists() {
        anyhow::bail!("History file not found at {:?}", history_path);
    }

    fs::copy(history_path, &temp_path).with_context(|| {
        format!("Failed to copy {:?} to {:?}", history_path, temp_path)
    })?;

    let copy_time = start_time.elapsed();
    info!(action = "complete", component = "database_copy", duration_ms = copy_time.as_millis(), "Database copy completed");
    Ok(temp_path)
}

/// History provider over a Chromium-family `History` database.
pub struct SqliteHistory {
    conn: Connection,
}

impl SqliteHistory {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .with_context(|| format!("Failed to open history database {:?}", path))?;
        info!(action = "open", component = "history_database", path = ?path, "Connected to database");
        Ok(Self { conn })
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }
}

impl HistoryProvider for SqliteHistory {
    /// One record per URL visited in the range: its latest visit inside the
    /// range and the number of visits inside the range, newest first.
    fn query(
        &self,
        start_time: i64,
        end_time: i64,
        max_results: usize,
    ) -> Result<Vec<VisitRecord>, HistoryError> {
        if start_time > end_time {
            return Err(HistoryError::InvalidRange {
                start: start_time,
                end: end_time,
            });
        }

        let query_start = Instant::now();
        let mut stmt = self.conn.prepare_cached(
            "SELECT u.url, u.title, MAX(v.visit_time) AS last_visit, COUNT(*) AS visits
             FROM visits v
             JOIN urls u ON u.id = v.url
             WHERE v.visit_time BETWEEN ?1 AND ?2
             GROUP BY u.id
             ORDER BY last_visit DESC
             LIMIT ?3",
        )?;

        let limit = i64::try_from(max_results).unwrap_or(i64::MAX);
        let records = stmt
            .query_map(
                params![
                    unix_ms_to_chrome(start_time),
                    unix_ms_to_chrome(end_time).saturating_add(999),
                    limit
                ],
                |row| {
                    let title: Option<String> = row.get(1)?;
                    let last_visit: i64 = row.get(2)?;
                    let visits: i64 = row.get(3)?;
                    Ok(VisitRecord {
                        url: row.get(0)?,
                        title: title.unwrap_or_default(),
                        last_visit_time: chrome_to_unix_ms(last_visit),
                        visit_count: u64::try_from(visits).unwrap_or(0),
                    })
                },
            )?
            .collect::<rusqlite::Result<Vec<VisitRecord>>>()?;

        debug!(
            action = "query",
            component = "history_database",
            record_count = records.len(),
            duration_ms = query_start.elapsed().as_millis(),
            "History range query completed"
        );
        Ok(records)
    }
}
