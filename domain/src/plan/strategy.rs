//! Execution strategies

use serde::{Deserialize, Serialize};

/// How calls inside one execution group are scheduled.
///
/// Groups always run in order; the strategy only decides concurrency
/// *within* a group:
///
/// | Strategy | Window | After a failure |
/// |----------|--------|-----------------|
/// | `Sequential` | 1 | unchanged |
/// | `Parallel` | `max_parallelism` | unchanged |
/// | `Adaptive` | `max_parallelism` | remaining calls of the group run one at a time |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStrategy {
    Sequential,
    #[default]
    Parallel,
    Adaptive,
}

impl ExecutionStrategy {
    pub fn as_str(&self) -> &str {
        match self {
            ExecutionStrategy::Sequential => "sequential",
            ExecutionStrategy::Parallel => "parallel",
            ExecutionStrategy::Adaptive => "adaptive",
        }
    }

    /// Number of calls allowed in flight at once
    pub fn window(&self, max_parallelism: usize, failure_seen: bool) -> usize {
        match self {
            ExecutionStrategy::Sequential => 1,
            ExecutionStrategy::Parallel => max_parallelism.max(1),
            ExecutionStrategy::Adaptive if failure_seen => 1,
            ExecutionStrategy::Adaptive => max_parallelism.max(1),
        }
    }

    pub fn all() -> &'static [ExecutionStrategy] {
        &[
            ExecutionStrategy::Sequential,
            ExecutionStrategy::Parallel,
            ExecutionStrategy::Adaptive,
        ]
    }
}

impl std::fmt::Display for ExecutionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ExecutionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sequential" | "seq" => Ok(ExecutionStrategy::Sequential),
            "parallel" | "par" => Ok(ExecutionStrategy::Parallel),
            "adaptive" | "auto" => Ok(ExecutionStrategy::Adaptive),
            _ => Err(format!(
                "Unknown strategy: {}. Valid: sequential, parallel, adaptive",
                s
            )),
        }
    }
}
