//! Truncation parameters.

use conductor_domain::Truncator;
use conductor_domain::truncation::DEFAULT_MAX_ITEMS;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TruncationConfig {
    /// Longest list returned to the planner
    pub max_items: usize,
}

impl Default for TruncationConfig {
    fn default() -> Self {
        Self {
            max_items: DEFAULT_MAX_ITEMS,
        }
    }
}

impl TruncationConfig {
    pub fn with_max_items(mut self, max: usize) -> Self {
        self.max_items = max;
        self
    }

    pub fn truncator(&self) -> Truncator {
        Truncator::new(self.max_items)
    }
}
