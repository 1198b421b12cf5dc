//! Truncation configuration from TOML (`[truncation]` section)

use super::ConfigValidationError;
use conductor_application::config::TruncationConfig;
use serde::{Deserialize, Serialize};

/// ```toml
/// [truncation]
/// max_items = 100
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileTruncationConfig {
    /// Longest list handed back to the planner
    pub max_items: usize,
}

impl Default for FileTruncationConfig {
    fn default() -> Self {
        Self {
            max_items: TruncationConfig::default().max_items,
        }
    }
}

impl FileTruncationConfig {
    pub(super) fn validate(&self, issues: &mut Vec<ConfigValidationError>) {
        if self.max_items == 0 {
            issues.push(ConfigValidationError::MustBePositive("truncation.max_items"));
        }
    }

    pub fn to_truncation_config(&self) -> TruncationConfig {
        TruncationConfig::default().with_max_items(self.max_items)
    }
}
