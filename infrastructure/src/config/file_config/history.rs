//! Execution history configuration from TOML (`[history]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where execution records are persisted as JSONL.
///
/// ```toml
/// [history]
/// enabled = true
/// path = "~/.local/share/conductor/history.jsonl"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileHistoryConfig {
    pub enabled: bool,
    /// Defaults to `<data dir>/conductor/history.jsonl`
    pub path: Option<String>,
}

impl FileHistoryConfig {
    /// Path to write to, when history is enabled
    pub fn resolved_path(&self) -> Option<PathBuf> {
        if !self.enabled {
            return None;
        }
        match &self.path {
            Some(path) => Some(expand_home(path)),
            None => dirs::data_local_dir().map(|d| d.join("conductor").join("history.jsonl")),
        }
    }
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_by_default() {
        assert_eq!(FileHistoryConfig::default().resolved_path(), None);
    }

    #[test]
    fn test_explicit_path() {
        let config = FileHistoryConfig {
            enabled: true,
            path: Some("/tmp/conductor/history.jsonl".into()),
        };
        assert_eq!(
            config.resolved_path(),
            Some(PathBuf::from("/tmp/conductor/history.jsonl"))
        );
    }

    #[test]
    fn test_home_expansion() {
        let config = FileHistoryConfig {
            enabled: true,
            path: Some("~/history.jsonl".into()),
        };
        let path = config.resolved_path().unwrap();
        assert!(path.ends_with("history.jsonl"));
        if dirs::home_dir().is_some() {
            assert!(!path.starts_with("~"));
        }
    }
}
