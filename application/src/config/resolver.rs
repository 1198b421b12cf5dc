//! Dependency resolver parameters.

use conductor_domain::{HeuristicScoring, RelationshipOverride};
use serde::{Deserialize, Serialize};

/// Scoring for name heuristics plus relationships declared by configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    pub scoring: HeuristicScoring,
    pub overrides: Vec<RelationshipOverride>,
}

impl ResolverConfig {
    pub fn with_scoring(mut self, scoring: HeuristicScoring) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn with_override(mut self, relationship: RelationshipOverride) -> Self {
        self.overrides.push(relationship);
        self
    }
}
