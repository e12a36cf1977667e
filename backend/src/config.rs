//! Application configuration.
//!
//! Defaults are compiled in; every value can be overridden from the
//! environment (a `.env` file is loaded by the binary) and then again from
//! CLI flags.

use std::path::{Path, PathBuf};

/// Directory holding the three CSV exports.
pub const DEFAULT_DATA_DIR: &str = "data";

pub const DEFAULT_STUDENTS_FILE: &str = "students.csv";
pub const DEFAULT_EVENTS_FILE: &str = "events.csv";
pub const DEFAULT_PURCHASES_FILE: &str = "event_purchases.csv";

/// HTTP port for `serve`.
pub const DEFAULT_PORT: u16 = 3000;

/// Rows shown by the raw-data browser before truncating.
pub const DEFAULT_MAX_ROWS: usize = 1000;

/// Default number of nationalities in the top-N chart.
pub const DEFAULT_TOP_N: usize = 10;

/// Bounds of the top-N selector.
pub const MIN_TOP_N: usize = 5;
pub const MAX_TOP_N: usize = 50;

/// Fields pre-selected in the raw-data browser.
pub const DEFAULT_FIELD_COUNT: usize = 10;

/// Locations of the three source tables.
#[derive(Debug, Clone, PartialEq)]
pub struct SourcePaths {
    pub students: PathBuf,
    pub events: PathBuf,
    pub purchases: PathBuf,
}

impl SourcePaths {
    /// Default file names inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            students: dir.join(DEFAULT_STUDENTS_FILE),
            events: dir.join(DEFAULT_EVENTS_FILE),
            purchases: dir.join(DEFAULT_PURCHASES_FILE),
        }
    }
}

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub sources: SourcePaths,
    pub port: u16,
    pub max_rows: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            sources: SourcePaths::in_dir(DEFAULT_DATA_DIR),
            port: DEFAULT_PORT,
            max_rows: DEFAULT_MAX_ROWS,
        }
    }
}

impl DashboardConfig {
    /// Read `ESN_*` variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparseable numbers keep their
    /// defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let data_dir = lookup("ESN_DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());
        let data_dir = PathBuf::from(data_dir);
        let file = |key: &str, default: &str| data_dir.join(lookup(key).unwrap_or_else(|| default.to_string()));

        Self {
            sources: SourcePaths {
                students: file("ESN_STUDENTS_FILE", DEFAULT_STUDENTS_FILE),
                events: file("ESN_EVENTS_FILE", DEFAULT_EVENTS_FILE),
                purchases: file("ESN_PURCHASES_FILE", DEFAULT_PURCHASES_FILE),
            },
            port: lookup("ESN_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            max_rows: lookup("ESN_MAX_ROWS")
                .and_then(|v| v.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(DEFAULT_MAX_ROWS),
        }
    }

    /// Replace the data directory, keeping the configured file names.
    pub fn with_data_dir(mut self, dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        let rebase = |p: &Path| dir.join(p.file_name().unwrap_or(p.as_os_str()));
        self.sources = SourcePaths {
            students: rebase(&self.sources.students),
            events: rebase(&self.sources.events),
            purchases: rebase(&self.sources.purchases),
        };
        self
    }
}

/// Clamp a requested top-N to the selector bounds.
pub fn clamp_top_n(requested: Option<usize>) -> usize {
    requested.unwrap_or(DEFAULT_TOP_N).clamp(MIN_TOP_N, MAX_TOP_N)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = DashboardConfig::from_lookup(|_| None);
        assert_eq!(config, DashboardConfig::default());
        assert_eq!(config.sources.purchases, PathBuf::from("data/event_purchases.csv"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("ESN_DATA_DIR", "/srv/esn"),
            ("ESN_EVENTS_FILE", "events_2024.csv"),
            ("ESN_PORT", "8080"),
            ("ESN_MAX_ROWS", "not-a-number"),
        ]
        .into_iter()
        .collect();
        let config = DashboardConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.sources.events, PathBuf::from("/srv/esn/events_2024.csv"));
        assert_eq!(config.sources.students, PathBuf::from("/srv/esn/students.csv"));
        assert_eq!(config.port, 8080);
        assert_eq!(config.max_rows, DEFAULT_MAX_ROWS);
    }

    #[test]
    fn test_with_data_dir_keeps_file_names() {
        let config = DashboardConfig::default().with_data_dir("/tmp/export");
        assert_eq!(config.sources.students, PathBuf::from("/tmp/export/students.csv"));
    }

    #[test]
    fn test_top_n_clamped() {
        assert_eq!(clamp_top_n(None), 10);
        assert_eq!(clamp_top_n(Some(2)), 5);
        assert_eq!(clamp_top_n(Some(500)), 50);
        assert_eq!(clamp_top_n(Some(25)), 25);
    }
}
