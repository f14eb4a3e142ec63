//! Ordered pattern rules with confidence tiers.
//!
//! A [`RuleSet`] captures a value; a [`Classifier`] maps a match onto a fixed
//! outcome. Both try their rules in declaration order and stop at the first
//! hit. Patterns are compiled once when the set is built; a pattern that fails
//! to compile is logged and left out instead of aborting construction.

use regex::{Captures, Regex};

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::error!(pattern, error = %e, "dropping rule with invalid pattern");
            None
        }
    }
}

// ── Capture Rules ───────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Rule {
    pattern: Regex,
    tier: f64,
}

impl Rule {
    pub fn tier(&self) -> f64 {
        self.tier
    }
}

/// One successful rule application.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleMatch {
    /// Position of the rule inside its set.
    pub index: usize,
    pub tier: f64,
    groups: Vec<Option<String>>,
}

impl RuleMatch {
    fn from_captures(index: usize, tier: f64, caps: &Captures<'_>) -> Self {
        Self {
            index,
            tier,
            groups: caps
                .iter()
                .map(|g| g.map(|m| m.as_str().to_string()))
                .collect(),
        }
    }

    /// First capture group, trimmed, or the whole match when the rule has no group.
    pub fn value(&self) -> &str {
        self.group(1)
            .or_else(|| self.group(0))
            .unwrap_or_default()
            .trim()
    }

    /// Capture group `i` if it participated in the match.
    pub fn group(&self, i: usize) -> Option<&str> {
        self.groups.get(i).and_then(|g| g.as_deref())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(specs: &[(&str, f64)]) -> Self {
        let rules = specs
            .iter()
            .filter_map(|(pattern, tier)| {
                compile(pattern).map(|pattern| Rule {
                    pattern,
                    tier: *tier,
                })
            })
            .collect();
        Self { rules }
    }

    /// The first rule, in priority order, that matches `text`.
    pub fn first_match(&self, text: &str) -> Option<RuleMatch> {
        self.rules.iter().enumerate().find_map(|(i, rule)| {
            rule.pattern
                .captures(text)
                .map(|caps| RuleMatch::from_captures(i, rule.tier, &caps))
        })
    }

    /// Every occurrence of every rule, rule by rule.
    pub fn all_matches(&self, text: &str) -> Vec<RuleMatch> {
        self.rules
            .iter()
            .enumerate()
            .flat_map(|(i, rule)| {
                rule.pattern
                    .captures_iter(text)
                    .map(move |caps| RuleMatch::from_captures(i, rule.tier, &caps))
            })
            .collect()
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.rules.iter().any(|r| r.pattern.is_match(text))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

// ── Classifiers ─────────────────────────────────────────────────────

/// Rules that map a match onto a fixed outcome, e.g. `+CPIN: READY` → ready.
#[derive(Debug, Clone)]
pub struct Classifier<T> {
    rules: Vec<(Regex, T, f64)>,
}

impl<T: Clone> Classifier<T> {
    pub fn new(specs: &[(&str, T, f64)]) -> Self {
        let rules = specs
            .iter()
            .filter_map(|(pattern, outcome, tier)| {
                compile(pattern).map(|re| (re, outcome.clone(), *tier))
            })
            .collect();
        Self { rules }
    }

    pub fn classify(&self, text: &str) -> Option<(T, f64)> {
        self.rules
            .iter()
            .find(|(re, _, _)| re.is_match(text))
            .map(|(_, outcome, tier)| (outcome.clone(), *tier))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
