//! Match rules for parameter → output pairing
//!
//! Pairing a missing parameter with another tool's output is a pure function
//! of two names and a scoring table. [`evaluate`] decides whether a provider
//! can fill a parameter at all, and [`MatchRule`] orders competing candidates.

use crate::core::string::{normalize_identifier, singular, split_identifier};
use crate::tool::entities::ToolDescriptor;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// How a dependency edge was derived
///
/// - `ConfigOverride`: declared by configuration, always wins ties
/// - `Exact`: parameter name equals a declared output field
/// - `Heuristic(score)`: parameter `<stem><Field>` vs. a provider whose name
///   contains the stem and which declares `field`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", content = "score", rename_all = "snake_case")]
pub enum MatchRule {
    Exact,
    Heuristic(f64),
    ConfigOverride,
}

impl MatchRule {
    /// Confidence in 0..=1
    pub fn confidence(&self) -> f64 {
        match self {
            MatchRule::Exact | MatchRule::ConfigOverride => 1.0,
            MatchRule::Heuristic(score) => *score,
        }
    }

    /// Tie-break rank among equal confidences (higher wins)
    pub fn precedence(&self) -> u8 {
        match self {
            MatchRule::ConfigOverride => 2,
            MatchRule::Exact => 1,
            MatchRule::Heuristic(_) => 0,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            MatchRule::Exact => "exact",
            MatchRule::Heuristic(_) => "heuristic",
            MatchRule::ConfigOverride => "override",
        }
    }

    /// Order two rules from strongest to weakest.
    ///
    /// `Ordering::Less` means `self` is the stronger rule.
    pub fn strength_cmp(&self, other: &MatchRule) -> Ordering {
        other
            .confidence()
            .total_cmp(&self.confidence())
            .then_with(|| other.precedence().cmp(&self.precedence()))
    }
}

impl std::fmt::Display for MatchRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchRule::Heuristic(score) => write!(f, "heuristic({:.2})", score),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

/// Lowest score a heuristic match may carry
pub const MIN_HEURISTIC_SCORE: f64 = 0.5;
/// Highest score a heuristic match may carry; exact matches score 1.0
pub const MAX_HEURISTIC_SCORE: f64 = 0.8;

/// Scores assigned to heuristic matches.
///
/// Both must lie in `MIN_HEURISTIC_SCORE..=MAX_HEURISTIC_SCORE`, so a
/// heuristic never outranks an exact match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicScoring {
    /// Stem equals a whole word of the provider name (`account` in `getAccounts`)
    pub token_match: f64,
    /// Stem only appears inside the provider name (`account` in `listSubaccounts`)
    pub substring_match: f64,
}

impl Default for HeuristicScoring {
    fn default() -> Self {
        Self {
            token_match: 0.8,
            substring_match: 0.6,
        }
    }
}

impl HeuristicScoring {
    pub fn with_token_match(mut self, score: f64) -> Self {
        self.token_match = score;
        self
    }

    pub fn with_substring_match(mut self, score: f64) -> Self {
        self.substring_match = score;
        self
    }

    pub fn is_valid_score(score: f64) -> bool {
        (MIN_HEURISTIC_SCORE..=MAX_HEURISTIC_SCORE).contains(&score)
    }

    /// Names of scores outside the heuristic band
    pub fn invalid_scores(&self) -> Vec<&'static str> {
        let mut invalid = Vec::new();
        if !Self::is_valid_score(self.token_match) {
            invalid.push("token_match");
        }
        if !Self::is_valid_score(self.substring_match) {
            invalid.push("substring_match");
        }
        invalid
    }
}

/// A provider output that can fill a parameter, and why
#[derive(Debug, Clone, PartialEq)]
pub struct OutputMatch {
    /// Declared output field, spelled as the provider declares it
    pub output_field: String,
    pub rule: MatchRule,
}

/// Decide whether `provider` can supply `parameter`.
///
/// Exact matches compare normalized names (`account_id` == `accountId`).
/// Heuristic matches split the parameter into a stem and a trailing field
/// word: `accountId` → stem `account`, field `id`. The provider must declare
/// an output whose normalized name equals the field, and its own name must
/// contain the stem, either as a word (singularized) or as a substring.
pub fn evaluate(
    parameter: &str,
    provider: &ToolDescriptor,
    scoring: &HeuristicScoring,
) -> Option<OutputMatch> {
    let wanted = normalize_identifier(parameter);
    if wanted.is_empty() {
        return None;
    }

    if let Some(field) = provider
        .declared_outputs
        .iter()
        .find(|f| normalize_identifier(f) == wanted)
    {
        return Some(OutputMatch {
            output_field: field.clone(),
            rule: MatchRule::Exact,
        });
    }

    let tokens = split_identifier(parameter);
    let (field_token, stem_tokens) = tokens.split_last()?;
    if stem_tokens.is_empty() {
        return None;
    }

    let field = provider
        .declared_outputs
        .iter()
        .find(|f| normalize_identifier(f) == *field_token)?;

    let stem: String = stem_tokens.iter().map(|t| singular(t)).collect();
    let score = stem_score(&stem, stem_tokens.len(), &provider.name, scoring)?;

    Some(OutputMatch {
        output_field: field.clone(),
        rule: MatchRule::Heuristic(score),
    })
}

fn stem_score(
    stem: &str,
    stem_len: usize,
    provider_name: &str,
    scoring: &HeuristicScoring,
) -> Option<f64> {
    let name_tokens: Vec<String> = split_identifier(provider_name)
        .iter()
        .map(|t| singular(t).to_string())
        .collect();

    // Whole-word match: some run of `stem_len` provider words spells the stem
    let word_match = name_tokens
        .windows(stem_len)
        .any(|window| window.concat() == stem);
    if word_match {
        return Some(scoring.token_match);
    }

    if normalize_identifier(provider_name).contains(stem) {
        return Some(scoring.substring_match);
    }
    None
}
