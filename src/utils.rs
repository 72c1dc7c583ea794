use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;

use crate::models::ChecklistItem;

/// Profile mode for the application (dev or prod)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Dev,
    Prod,
}

impl Profile {
    fn app_name(self) -> &'static str {
        match self {
            Profile::Dev => "ingetin-dev",
            Profile::Prod => "ingetin",
        }
    }
}

/// Get the configuration directory path for IngetinAja
/// If profile is Dev, uses "ingetin-dev" instead of "ingetin"
pub fn get_config_dir(profile: Profile) -> Option<PathBuf> {
    // On macOS this resolves under ~/Library/Application Support/
    ProjectDirs::from("com", "ingetin", profile.app_name())
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Expand `~` in a path string to the user's home directory
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Parse a date string in ISO 8601 format (YYYY-MM-DD)
pub fn parse_date(date_str: &str) -> Result<chrono::NaiveDate, chrono::ParseError> {
    chrono::NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
}

/// Parse a clock time, HH:MM or HH:MM:SS
pub fn parse_time(time_str: &str) -> Result<chrono::NaiveTime, chrono::ParseError> {
    chrono::NaiveTime::parse_from_str(time_str, "%H:%M:%S")
        .or_else(|_| chrono::NaiveTime::parse_from_str(time_str, "%H:%M"))
}

/// Format an epoch-millisecond instant in the local zone for display
pub fn format_instant(ms: i64) -> String {
    match chrono::DateTime::from_timestamp_millis(ms) {
        Some(dt) => dt
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => format!("{}ms", ms),
    }
}

/// Human-readable distance from `now_ms` to `ms`, e.g. "in 1h 25m"
pub fn format_relative(ms: i64, now_ms: i64) -> String {
    let delta = ms - now_ms;
    let minutes = delta.abs() / 60_000;
    let span = if minutes >= 60 {
        format!("{}h {}m", minutes / 60, minutes % 60)
    } else if minutes > 0 {
        format!("{}m", minutes)
    } else {
        format!("{}s", delta.abs() / 1000)
    };
    if delta >= 0 {
        format!("in {}", span)
    } else {
        format!("{} ago", span)
    }
}

/// Percentage of completed checklist items, rounded to the nearest integer
pub fn checklist_progress(checklist: &[ChecklistItem]) -> u8 {
    if checklist.is_empty() {
        return 0;
    }
    let completed = checklist.iter().filter(|item| item.completed).count();
    ((completed as f64 / checklist.len() as f64) * 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(completed: bool) -> ChecklistItem {
        ChecklistItem {
            text: "x".to_string(),
            completed,
        }
    }

    #[test]
    fn test_parse_time_accepts_both_precisions() {
        assert!(parse_time("09:30").is_ok());
        assert!(parse_time("09:30:15").is_ok());
        assert!(parse_time("9.30").is_err());
    }

    #[test]
    fn test_checklist_progress() {
        assert_eq!(checklist_progress(&[]), 0);
        assert_eq!(checklist_progress(&[item(true), item(false), item(false)]), 33);
        assert_eq!(checklist_progress(&[item(true), item(true)]), 100);
    }

    #[test]
    fn test_format_relative() {
        assert_eq!(format_relative(90 * 60_000, 0), "in 1h 30m");
        assert_eq!(format_relative(0, 5 * 60_000), "5m ago");
        assert_eq!(format_relative(30_000, 0), "in 30s");
    }
}
