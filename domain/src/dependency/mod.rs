//! Dependency domain module
//!
//! Figures out which tool can fill which missing parameter.
//!
//! ```text
//!  ToolCatalog ──derive──▶ DependencyIndex ──┐
//!  (descriptors)           (edges, ranked)   │
//!                                            ▼
//!  [ToolCall] ─────────────────────▶ DependencyResolver ──▶ Resolution
//!  (possibly incomplete)                                    (bindings, failures,
//!                                                            synthesized providers)
//! ```
//!
//! Matching is a pure function ([`match_rule::evaluate`]) over names, so the
//! tie-break logic can be tested without a registry.

pub mod edge;
pub mod match_rule;
pub mod resolver;

pub use edge::{DependencyEdge, DependencyIndex, RelationshipOverride, rank_edges};
pub use match_rule::{
    HeuristicScoring, MAX_HEURISTIC_SCORE, MIN_HEURISTIC_SCORE, MatchRule, OutputMatch, evaluate,
};
pub use resolver::{Binding, DependencyResolver, Resolution, ResolvedCall, SYNTHESIZED_PREFIX};
