use regex::{Regex, RegexBuilder};
use tracing::warn;

use super::catalog::Polarity;

/// A compiled, case-insensitive text matcher for one metric.
#[derive(Debug, Clone)]
pub struct DetectionRule {
    pattern: String,
    regex: Regex,
}

impl DetectionRule {
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Ordered rules for a metric. Malformed patterns never make it in.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<DetectionRule>,
}

impl RuleSet {
    pub fn compile(metric: &str, patterns: &[String]) -> Self {
        let mut rules = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            if pattern.trim().is_empty() {
                warn!(metric, "skipping empty detection rule");
                continue;
            }

            match RegexBuilder::new(pattern).case_insensitive(true).build() {
                Ok(regex) => rules.push(DetectionRule {
                    pattern: pattern.clone(),
                    regex,
                }),
                Err(err) => {
                    warn!(metric, pattern = %pattern, error = %err, "skipping malformed detection rule");
                }
            }
        }
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// First rule, in declaration order, that matches the text.
    pub fn first_match(&self, text: &str) -> Option<&DetectionRule> {
        self.rules.iter().find(|rule| rule.is_match(text))
    }
}

/// Opinion of the rule layer for one segment.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PatternVote {
    pub value: Option<f64>,
    pub matched: Option<String>,
}

/// Inverse metrics describe the undesirable phenomenon, so a hit votes 0.
pub(crate) fn pattern_vote(rules: &RuleSet, polarity: Polarity, text: &str) -> PatternVote {
    if rules.is_empty() {
        return PatternVote {
            value: None,
            matched: None,
        };
    }

    let matched = rules.first_match(text).map(|rule| rule.pattern().to_string());
    let value = match (polarity, matched.is_some()) {
        (Polarity::Normal, true) | (Polarity::Inverse, false) => 1.0,
        (Polarity::Normal, false) | (Polarity::Inverse, true) => 0.0,
    };

    PatternVote {
        value: Some(value),
        matched,
    }
}
