//! Label-anchored value location.
//!
//! Scans a text region top to bottom for a label and the first amount that
//! follows it. The first accepted occurrence wins: in a statement read in
//! order, later occurrences are usually sub-items or totals repeated in notes.

use crate::error::Result;
use crate::labels::{FieldRule, LabelTier};
use crate::normalizer::{is_plausible_year, parse_amount};
use log::debug;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// A date or month reference (skipped) or an amount with an optional debit/credit marker.
static AMOUNT_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<date>\d{1,2}/\d{1,4}(?:/\d{2,4})?)|(?P<amount>\d(?:[\d.,]*\d)?)(?:\s*[DC]\b)?")
        .unwrap()
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// How many line breaks past the label an amount may sit.
    pub max_lookahead_lines: usize,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            max_lookahead_lines: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocatedValue {
    pub value: f64,
    /// The label synonym that matched
    pub label: String,
    /// Text from the label up to and including the amount
    pub original_text: String,
}

/// A tier with its label patterns compiled once.
#[derive(Debug, Clone)]
pub struct CompiledTier {
    patterns: Vec<(String, Regex)>,
    avoid: Vec<String>,
}

impl CompiledTier {
    pub fn compile(tier: &LabelTier) -> Result<Self> {
        let patterns = tier
            .labels
            .iter()
            .map(|label| Ok((label.clone(), label_pattern(label)?)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            patterns,
            avoid: tier.avoid.iter().map(|a| a.to_uppercase()).collect(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub tiers: Vec<CompiledTier>,
}

impl CompiledRule {
    pub fn compile(rule: &FieldRule) -> Result<Self> {
        let tiers = rule
            .tiers
            .iter()
            .map(CompiledTier::compile)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { tiers })
    }
}

/// Builds a case-insensitive pattern that tolerates irregular spacing inside the label.
fn label_pattern(label: &str) -> Result<Regex> {
    let words: Vec<String> = label.split_whitespace().map(regex::escape).collect();
    let mut pattern = words.join(r"\s+");

    let starts_with_word = label
        .trim_start()
        .chars()
        .next()
        .map_or(false, char::is_alphanumeric);
    let ends_with_word = label
        .trim_end()
        .chars()
        .last()
        .map_or(false, char::is_alphanumeric);
    if starts_with_word {
        pattern = format!(r"\b{}", pattern);
    }
    if ends_with_word {
        pattern = format!(r"{}\b", pattern);
    }

    Ok(RegexBuilder::new(&pattern).case_insensitive(true).build()?)
}

#[derive(Debug, Clone, Default)]
pub struct ValueLocator {
    config: LocatorConfig,
}

impl ValueLocator {
    pub fn new(config: LocatorConfig) -> Self {
        Self { config }
    }

    /// Locates the first accepted amount for any of `labels` in `region`.
    pub fn locate(
        &self,
        labels: &[&str],
        region: &str,
        avoid: &[&str],
    ) -> Result<Option<LocatedValue>> {
        let tier = LabelTier::new(labels, avoid);
        Ok(self.locate_tier(&CompiledTier::compile(&tier)?, region))
    }

    /// Same as [`ValueLocator::locate`], with `0.0` standing for "not found".
    pub fn locate_or_zero(&self, labels: &[&str], region: &str, avoid: &[&str]) -> Result<f64> {
        Ok(self
            .locate(labels, region, avoid)?
            .map(|found| found.value)
            .unwrap_or(0.0))
    }

    /// Tries each tier in order; later tiers act as fallbacks.
    pub fn locate_rule(&self, rule: &CompiledRule, region: &str) -> Option<LocatedValue> {
        rule.tiers
            .iter()
            .find_map(|tier| self.locate_tier(tier, region))
    }

    pub fn locate_tier(&self, tier: &CompiledTier, region: &str) -> Option<LocatedValue> {
        for (label, pattern) in &tier.patterns {
            for label_match in pattern.find_iter(region) {
                let found = self.accept_after(
                    label,
                    label_match.start(),
                    label_match.end(),
                    region,
                    &tier.avoid,
                );
                if let Some(found) = found {
                    debug!(
                        "Located '{}' = {} ({:?})",
                        label, found.value, found.original_text
                    );
                    return Some(found);
                }
            }
        }
        None
    }

    fn accept_after(
        &self,
        label: &str,
        label_start: usize,
        label_end: usize,
        region: &str,
        avoid: &[String],
    ) -> Option<LocatedValue> {
        let tail = &region[label_end..];
        let scope = &tail[..lookahead_limit(tail, self.config.max_lookahead_lines)];

        for caps in AMOUNT_TOKEN.captures_iter(scope) {
            let Some(amount) = caps.name("amount") else {
                continue;
            };
            if is_plausible_year(amount.as_str()) {
                continue;
            }

            let window = &region[label_start..label_end + amount.end()];
            let upper = window.to_uppercase();
            if avoid.iter().any(|term| upper.contains(term.as_str())) {
                return None;
            }

            let value = parse_amount(amount.as_str());
            if value > 0.0 {
                return Some(LocatedValue {
                    value,
                    label: label.to_string(),
                    original_text: collapse_whitespace(window),
                });
            }
            return None;
        }

        None
    }

    /// The last acceptable amount on a single line.
    pub fn trailing_amount(&self, line: &str) -> Option<f64> {
        AMOUNT_TOKEN
            .captures_iter(line)
            .filter_map(|caps| caps.name("amount"))
            .filter(|m| !is_plausible_year(m.as_str()))
            .last()
            .map(|m| parse_amount(m.as_str()))
            .filter(|value| *value > 0.0)
    }
}

/// Byte offset just before the (n+1)-th line break of `text`.
fn lookahead_limit(text: &str, max_lines: usize) -> usize {
    text.match_indices('\n')
        .nth(max_lines)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
