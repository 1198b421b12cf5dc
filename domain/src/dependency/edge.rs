//! Derived dependency edges
//!
//! A [`DependencyEdge`] says "parameter P of tool C can probably be filled
//! from output F of tool T". Edges are derived from the catalog, never
//! authoritative, and rebuilt whenever the catalog changes.

use super::match_rule::{HeuristicScoring, MatchRule, evaluate};
use crate::tool::entities::ToolCatalog;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// `(consumer, parameter) → (provider, output, confidence)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub consumer_tool: String,
    pub consumer_parameter: String,
    pub provider_tool: String,
    pub provider_output: String,
    pub rule: MatchRule,
}

impl DependencyEdge {
    pub fn confidence(&self) -> f64 {
        self.rule.confidence()
    }
}

impl std::fmt::Display for DependencyEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{} <- {}.{} [{}]",
            self.consumer_tool,
            self.consumer_parameter,
            self.provider_tool,
            self.provider_output,
            self.rule
        )
    }
}

/// Relationship declared in configuration.
///
/// Wins over anything derived from names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipOverride {
    pub consumer_tool: String,
    pub parameter: String,
    pub provider_tool: String,
    pub output_field: String,
}

impl RelationshipOverride {
    pub fn new(
        consumer_tool: impl Into<String>,
        parameter: impl Into<String>,
        provider_tool: impl Into<String>,
        output_field: impl Into<String>,
    ) -> Self {
        Self {
            consumer_tool: consumer_tool.into(),
            parameter: parameter.into(),
            provider_tool: provider_tool.into(),
            output_field: output_field.into(),
        }
    }
}

/// Order candidate edges: confidence, then rule precedence, then fewest
/// unresolved provider parameters, then provider name.
pub fn rank_edges(
    a: &DependencyEdge,
    b: &DependencyEdge,
    unresolved: impl Fn(&str) -> usize,
) -> Ordering {
    a.rule
        .strength_cmp(&b.rule)
        .then_with(|| unresolved(&a.provider_tool).cmp(&unresolved(&b.provider_tool)))
        .then_with(|| a.provider_tool.cmp(&b.provider_tool))
}

/// Every derived edge of a catalog, indexed by `(consumer, parameter)`.
///
/// Candidates per key are pre-sorted by [`rank_edges`] using each provider's
/// count of required parameters.
#[derive(Debug, Clone, Default)]
pub struct DependencyIndex {
    by_parameter: HashMap<(String, String), Vec<DependencyEdge>>,
    edge_count: usize,
}

impl DependencyIndex {
    pub fn build(
        catalog: &ToolCatalog,
        scoring: &HeuristicScoring,
        overrides: &[RelationshipOverride],
    ) -> Self {
        let mut by_parameter: HashMap<(String, String), Vec<DependencyEdge>> = HashMap::new();

        for consumer in catalog.all() {
            for param in &consumer.parameters {
                let mut edges: Vec<DependencyEdge> = catalog
                    .all()
                    .filter(|provider| provider.name != consumer.name)
                    .filter_map(|provider| {
                        evaluate(&param.name, provider, scoring).map(|m| DependencyEdge {
                            consumer_tool: consumer.name.clone(),
                            consumer_parameter: param.name.clone(),
                            provider_tool: provider.name.clone(),
                            provider_output: m.output_field,
                            rule: m.rule,
                        })
                    })
                    .collect();

                for ov in overrides
                    .iter()
                    .filter(|ov| ov.consumer_tool == consumer.name && ov.parameter == param.name)
                {
                    if ov.provider_tool == consumer.name || !catalog.contains(&ov.provider_tool) {
                        continue;
                    }
                    // An override replaces any derived edge to the same provider
                    edges.retain(|e| e.provider_tool != ov.provider_tool);
                    edges.push(DependencyEdge {
                        consumer_tool: consumer.name.clone(),
                        consumer_parameter: param.name.clone(),
                        provider_tool: ov.provider_tool.clone(),
                        provider_output: ov.output_field.clone(),
                        rule: MatchRule::ConfigOverride,
                    });
                }

                if !edges.is_empty() {
                    edges.sort_by(|a, b| {
                        rank_edges(a, b, |tool| {
                            catalog
                                .get(tool)
                                .map(|d| d.required_parameters().count())
                                .unwrap_or(0)
                        })
                    });
                    by_parameter.insert((consumer.name.clone(), param.name.clone()), edges);
                }
            }
        }

        let edge_count = by_parameter.values().map(Vec::len).sum();
        Self {
            by_parameter,
            edge_count,
        }
    }

    /// Candidate providers for one parameter, strongest first
    pub fn candidates(&self, consumer_tool: &str, parameter: &str) -> &[DependencyEdge] {
        self.by_parameter
            .get(&(consumer_tool.to_string(), parameter.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All edges, sorted by consumer, parameter, then rank
    pub fn edges(&self) -> Vec<&DependencyEdge> {
        let mut keys: Vec<&(String, String)> = self.by_parameter.keys().collect();
        keys.sort();
        keys.into_iter()
            .flat_map(|k| self.by_parameter[k].iter())
            .collect()
    }

    /// Edges whose consumer is `tool`
    pub fn edges_for(&self, tool: &str) -> Vec<&DependencyEdge> {
        self.edges()
            .into_iter()
            .filter(|e| e.consumer_tool == tool)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.edge_count
    }

    pub fn is_empty(&self) -> bool {
        self.edge_count == 0
    }
}
