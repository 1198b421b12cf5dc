//! Dependency resolver configuration from TOML (`[resolver]` section)

use super::ConfigValidationError;
use conductor_application::config::ResolverConfig;
use conductor_domain::{HeuristicScoring, RelationshipOverride};
use serde::{Deserialize, Serialize};

/// Resolver configuration from TOML.
///
/// Heuristic scores must lie between 0.5 and 0.8 inclusive, so an exact
/// name match (1.0) always outranks them. Overrides declare relationships the naming
/// conventions cannot find.
///
/// # Example
///
/// ```toml
/// [resolver]
/// token_match = 0.8
/// substring_match = 0.6
///
/// [[resolver.overrides]]
/// consumer = "getInvoice"
/// parameter = "customerRef"
/// provider = "getCustomers"
/// output = "customerId"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileResolverConfig {
    pub token_match: f64,
    pub substring_match: f64,
    pub overrides: Vec<FileRelationshipOverride>,
}

impl Default for FileResolverConfig {
    fn default() -> Self {
        let scoring = HeuristicScoring::default();
        Self {
            token_match: scoring.token_match,
            substring_match: scoring.substring_match,
            overrides: Vec::new(),
        }
    }
}

/// One `[[resolver.overrides]]` entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRelationshipOverride {
    /// Tool whose parameter is being supplied
    pub consumer: String,
    pub parameter: String,
    /// Tool producing the value
    pub provider: String,
    /// Field of the provider's result
    pub output: String,
}

impl FileRelationshipOverride {
    fn empty_field(&self) -> Option<&'static str> {
        [
            ("consumer", &self.consumer),
            ("parameter", &self.parameter),
            ("provider", &self.provider),
            ("output", &self.output),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
    }
}

impl FileResolverConfig {
    pub(super) fn validate(&self, issues: &mut Vec<ConfigValidationError>) {
        for (field, value) in [
            ("resolver.token_match", self.token_match),
            ("resolver.substring_match", self.substring_match),
        ] {
            if !HeuristicScoring::is_valid_score(value) {
                issues.push(ConfigValidationError::OutOfRange {
                    field: field.to_string(),
                    value,
                    expected: "between 0.5 and 0.8",
                });
            }
        }

        for (index, relationship) in self.overrides.iter().enumerate() {
            if let Some(field) = relationship.empty_field() {
                issues.push(ConfigValidationError::EmptyOverrideField { index, field });
            }
        }
    }

    /// Out-of-range scores fall back to the defaults; invalid overrides are dropped.
    pub fn to_resolver_config(&self) -> ResolverConfig {
        let defaults = HeuristicScoring::default();
        let score = |value: f64, fallback: f64| {
            if HeuristicScoring::is_valid_score(value) {
                value
            } else {
                fallback
            }
        };
        let scoring = HeuristicScoring::default()
            .with_token_match(score(self.token_match, defaults.token_match))
            .with_substring_match(score(self.substring_match, defaults.substring_match));

        self.overrides
            .iter()
            .filter(|r| r.empty_field().is_none())
            .fold(ResolverConfig::default().with_scoring(scoring), |config, r| {
                config.with_override(RelationshipOverride::new(
                    r.consumer.trim(),
                    r.parameter.trim(),
                    r.provider.trim(),
                    r.output.trim(),
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_from_toml() {
        let config: FileResolverConfig = toml::from_str(
            r#"
token_match = 0.75

[[overrides]]
consumer = "getInvoice"
parameter = "customerRef"
provider = "getCustomers"
output = "customerId"
"#,
        )
        .unwrap();

        let mut issues = Vec::new();
        config.validate(&mut issues);
        assert!(issues.is_empty());

        let converted = config.to_resolver_config();
        assert_eq!(converted.scoring.token_match, 0.75);
        assert_eq!(converted.scoring.substring_match, 0.6);
        assert_eq!(
            converted.overrides,
            vec![RelationshipOverride::new(
                "getInvoice",
                "customerRef",
                "getCustomers",
                "customerId"
            )]
        );
    }

    #[test]
    fn test_scores_must_stay_below_exact_match() {
        let config = FileResolverConfig {
            token_match: 1.0,
            substring_match: 0.0,
            ..Default::default()
        };
        let mut issues = Vec::new();
        config.validate(&mut issues);
        assert_eq!(issues.len(), 2);

        let converted = config.to_resolver_config();
        assert_eq!(converted.scoring, HeuristicScoring::default());
    }

    #[test]
    fn test_scores_outside_heuristic_band_rejected() {
        let config = FileResolverConfig {
            token_match: 0.9,
            substring_match: 0.4,
            ..Default::default()
        };
        let mut issues = Vec::new();
        config.validate(&mut issues);
        assert_eq!(
            issues,
            vec![
                ConfigValidationError::OutOfRange {
                    field: "resolver.token_match".into(),
                    value: 0.9,
                    expected: "between 0.5 and 0.8",
                },
                ConfigValidationError::OutOfRange {
                    field: "resolver.substring_match".into(),
                    value: 0.4,
                    expected: "between 0.5 and 0.8",
                },
            ]
        );
    }

    #[test]
    fn test_empty_override_field_reported_and_dropped() {
        let config = FileResolverConfig {
            overrides: vec![FileRelationshipOverride {
                consumer: "getInvoice".into(),
                parameter: "customerRef".into(),
                provider: " ".into(),
                output: "customerId".into(),
            }],
            ..Default::default()
        };
        let mut issues = Vec::new();
        config.validate(&mut issues);
        assert_eq!(
            issues,
            vec![ConfigValidationError::EmptyOverrideField {
                index: 0,
                field: "provider"
            }]
        );
        assert!(config.to_resolver_config().overrides.is_empty());
    }
}
