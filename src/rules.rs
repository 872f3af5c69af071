use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

// Include default rules at compile time
const DEFAULT_RULES_BYTES: &[u8] = include_bytes!("../default_category_rules.txt");

pub const RULES_FILE_NAME: &str = "category_rules.txt";
pub const DEFAULT_URL_FALLBACK: &str = "other";
pub const DEFAULT_KEYWORD_FALLBACK: &str = "🌐 Other";

/// Regex-scheme rule, matched against the full URL.
#[derive(Debug, Clone)]
pub struct UrlRule {
    pub label: String,
    pub pattern: Regex,
}

/// Keyword-scheme rule, matched against the lowercased hostname.
#[derive(Debug, Clone)]
pub struct KeywordRule {
    pub label: String,
    pub keywords: Vec<String>,
}

impl KeywordRule {
    pub fn matches(&self, host: &str) -> bool {
        self.keywords.iter().any(|keyword| host.contains(keyword.as_str()))
    }
}

/// Both category tables. Rules are tried in order and the first match wins.
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub url_rules: Vec<UrlRule>,
    pub url_fallback: String,
    pub keyword_rules: Vec<KeywordRule>,
    pub keyword_fallback: String,
}

impl RuleSet {
    pub fn embedded() -> Result<Self> {
        let content = std::str::from_utf8(DEFAULT_RULES_BYTES)
            .context("Failed to decode embedded default rules")?;
        parse_rules(content, true).context("Embedded default rules are invalid")
    }

    pub fn is_empty(&self) -> bool {
        self.url_rules.is_empty() && self.keyword_rules.is_empty()
    }

    pub fn classify_url(&self, url: &str) -> &str {
        self.url_rules
            .iter()
            .find(|rule| rule.pattern.is_match(url))
            .map(|rule| rule.label.as_str())
            .unwrap_or(self.url_fallback.as_str())
    }

    /// `None` hosts land in the catch-all bucket.
    pub fn classify_host(&self, host: Option<&str>) -> &str {
        let Some(host) = host else {
            return &self.keyword_fallback;
        };
        let host = host.to_lowercase();
        self.keyword_rules
            .iter()
            .find(|rule| rule.matches(&host))
            .map(|rule| rule.label.as_str())
            .unwrap_or(self.keyword_fallback.as_str())
    }

    /// Regex-scheme bucket labels in report order, catch-all last.
    pub fn url_labels(&self) -> impl Iterator<Item = &str> {
        self.url_rules
            .iter()
            .map(|rule| rule.label.as_str())
            .chain(std::iter::once(self.url_fallback.as_str()))
    }

    /// Keyword-scheme bucket labels in report order, catch-all last.
    pub fn keyword_labels(&self) -> impl Iterator<Item = &str> {
        self.keyword_rules
            .iter()
            .map(|rule| rule.label.as_str())
            .chain(std::iter::once(self.keyword_fallback.as_str()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Url,
    Keyword,
}

/// Parses a rule file. With `strict`, the first bad line is an error;
/// otherwise bad lines are logged and skipped.
pub fn parse_rules(content: &str, strict: bool) -> Result<RuleSet> {
    let mut section = None;
    let mut url_rules = Vec::new();
    let mut keyword_rules = Vec::new();
    let mut url_fallback = None;
    let mut keyword_fallback = None;
    let mut seen_url = HashSet::new();
    let mut seen_keyword = HashSet::new();

    for (line_num, line) in content.lines().enumerate() {
        let line_num = line_num + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match line {
            "[url]" => {
                section = Some(Section::Url);
                continue;
            }
            "[keyword]" => {
                section = Some(Section::Keyword);
                continue;
            }
            _ => {}
        }

        let Some(current) = section else {
            reject(strict, line_num, "rule appears before any [url] or [keyword] section")?;
            continue;
        };

        let Some((label, rule)) = line.split_once('=') else {
            reject(strict, line_num, "expected `label = rule`")?;
            continue;
        };
        let label = label.trim();
        let rule = rule.trim();

        if label.is_empty() {
            reject(strict, line_num, "empty category label")?;
            continue;
        }

        let seen = match current {
            Section::Url => &mut seen_url,
            Section::Keyword => &mut seen_keyword,
        };
        if !seen.insert(label.to_string()) {
            reject(strict, line_num, &format!("duplicate category label '{}'", label))?;
            continue;
        }

        match (current, rule.is_empty()) {
            (Section::Url, true) => url_fallback = Some(label.to_string()),
            (Section::Keyword, true) => keyword_fallback = Some(label.to_string()),
            (Section::Url, false) => {
                match RegexBuilder::new(rule).case_insensitive(true).build() {
                    Ok(pattern) => url_rules.push(UrlRule {
                        label: label.to_string(),
                        pattern,
                    }),
                    Err(e) => {
                        reject(strict, line_num, &format!("invalid regex pattern: {}", e))?;
                    }
                }
            }
            (Section::Keyword, false) => {
                let keywords: Vec<String> = rule
                    .split(',')
                    .map(|keyword| keyword.trim().to_lowercase())
                    .filter(|keyword| !keyword.is_empty())
                    .collect();
                keyword_rules.push(KeywordRule {
                    label: label.to_string(),
                    keywords,
                });
            }
        }
    }

    let url_fallback = url_fallback.unwrap_or_else(|| DEFAULT_URL_FALLBACK.to_string());
    let keyword_fallback =
        keyword_fallback.unwrap_or_else(|| DEFAULT_KEYWORD_FALLBACK.to_string());

    // A rule sharing the catch-all's label would report the bucket twice.
    url_rules.retain(|rule| rule.label != url_fallback);
    keyword_rules.retain(|rule| rule.label != keyword_fallback);

    Ok(RuleSet {
        url_rules,
        url_fallback,
        keyword_rules,
        keyword_fallback,
    })
}

fn reject(strict: bool, line_num: usize, reason: &str) -> Result<()> {
    if strict {
        anyhow::bail!("Invalid rule at line {}: {}", line_num, reason);
    }
    warn!(action = "parse", component = "category_rule", line_number = line_num, reason, "Skipping invalid rule");
    Ok(())
}

/// Loads category rules from `rule_file_path`, else `category_rules.txt` in
/// the working directory, else the embedded defaults.
pub fn load_rules(rule_file_path: Option<&Path>) -> Result<RuleSet> {
    let start_time = Instant::now();
    info!(
        action = "start",
        component = "rule_loading",
        "Starting category rule loading"
    );

    let rules = if let Some(path) = rule_file_path {
        info!(action = "load", component = "rule_file", file_path = ?path, "Loading rules from specified file");
        if !path.exists() {
            anyhow::bail!("Rule file not found: {:?}", path);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read rule file {:?}", path))?;
        parse_rules(&content, true)?
    } else {
        let default_file = Path::new(RULES_FILE_NAME);
        let from_file = if default_file.exists() {
            info!(action = "load", component = "default_rule_file", file_path = ?default_file, "Loading rules from default file");
            let content = fs::read_to_string(default_file)?;
            Some(parse_rules(&content, false)?)
        } else {
            None
        };

        match from_file {
            Some(rules) if !rules.is_empty() => rules,
            _ => {
                info!(
                    action = "load",
                    component = "embedded_rules",
                    "Using embedded default rules"
                );
                RuleSet::embedded()?
            }
        }
    };

    let rule_time = start_time.elapsed();
    info!(
        action = "complete",
        component = "rule_loading",
        url_rule_count = rules.url_rules.len(),
        keyword_rule_count = rules.keyword_rules.len(),
        duration_ms = rule_time.as_millis(),
        "Successfully loaded category rules"
    );
    Ok(rules)
}

pub fn init_default_rules() -> Result<()> {
    write_default_rules(Path::new(RULES_FILE_NAME))?;
    println!("Created {} with default rules", RULES_FILE_NAME);
    Ok(())
}

pub fn write_default_rules(path: &Path) -> Result<()> {
    if path.exists() {
        anyhow::bail!(
            "{} already exists. Remove it first if you want to reinitialize.",
            path.display()
        );
    }

    let default_content = std::str::from_utf8(DEFAULT_RULES_BYTES)
        .context("Failed to decode embedded default rules")?;

    fs::write(path, default_content)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_rules_have_both_tables() {
        let rules = RuleSet::embedded().unwrap();
        let url_labels: Vec<&str> = rules.url_labels().collect();
        assert_eq!(
            url_labels,
            vec![
                "search",
                "social",
                "entertainment",
                "news",
                "shopping",
                "work",
                "education",
                "other"
            ]
        );
        assert_eq!(rules.keyword_labels().count(), 8);
        assert_eq!(rules.keyword_fallback, "🌐 Other");
    }

    #[test]
    fn url_rules_are_case_insensitive_and_ordered() {
        let rules = RuleSet::embedded().unwrap();
        assert_eq!(rules.classify_url("https://WWW.YOUTUBE.COM/watch?v=1"), "entertainment");
        // "search" precedes "work" in table order
        assert_eq!(rules.classify_url("https://github.com/search?q=rust"), "search");
        assert_eq!(rules.classify_url("https://example.org/"), "other");
        assert_eq!(rules.classify_url("not a url at all"), "other");
    }

    #[test]
    fn keyword_rules_match_hostname_only() {
        let rules = RuleSet::embedded().unwrap();
        assert_eq!(rules.classify_host(Some("www.GitHub.com")), "💼 Work");
        assert_eq!(rules.classify_host(Some("example.org")), "🌐 Other");
        assert_eq!(rules.classify_host(None), "🌐 Other");
    }

    #[test]
    fn lenient_parse_skips_bad_lines() {
        let content = "stray = line\n[url]\nbroken = (unclosed\nok = fine\nno equals sign\n[keyword]\nA = x\nA = y\n";
        let rules = parse_rules(content, false).unwrap();
        assert_eq!(rules.url_rules.len(), 1);
        assert_eq!(rules.url_rules[0].label, "ok");
        assert_eq!(rules.keyword_rules.len(), 1);
        assert_eq!(rules.keyword_rules[0].keywords, vec!["x".to_string()]);
    }

    #[test]
    fn strict_parse_reports_line_number() {
        let err = parse_rules("[url]\nok = fine\nbroken = (unclosed\n", true).unwrap_err();
        assert!(err.to_string().contains("line 3"), "{}", err);
    }

    #[test]
    fn empty_rule_names_the_catch_all() {
        let rules = parse_rules("[url]\nmisc =\nvideo = tube\n[keyword]\nRest =\nDev = Git, , Lab\n", true).unwrap();
        assert_eq!(rules.url_fallback, "misc");
        assert_eq!(rules.keyword_fallback, "Rest");
        assert_eq!(rules.keyword_rules[0].keywords, vec!["git", "lab"]);
        assert_eq!(rules.url_labels().collect::<Vec<_>>(), vec!["video", "misc"]);
    }

    #[test]
    fn missing_catch_all_uses_default_label() {
        let rules = parse_rules("[url]\nvideo = tube\n", true).unwrap();
        assert_eq!(rules.url_fallback, DEFAULT_URL_FALLBACK);
        assert_eq!(rules.keyword_fallback, DEFAULT_KEYWORD_FALLBACK);
    }

    #[test]
    fn explicit_rule_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.txt");
        assert!(load_rules(Some(&missing)).is_err());
    }

    #[test]
    fn explicit_rule_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.txt");
        fs::write(&path, "[keyword]\nCode = git\n").unwrap();

        let rules = load_rules(Some(&path)).unwrap();
        assert_eq!(rules.classify_host(Some("gitlab.com")), "Code");
        assert!(rules.url_rules.is_empty());
    }

    #[test]
    fn write_default_rules_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(RULES_FILE_NAME);
        write_default_rules(&path).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(parse_rules(&written, true).is_ok());
        assert!(write_default_rules(&path).is_err());
    }
}
