//! Credit score as a versioned table of threshold bands over the ratio set.

use crate::error::{Result, StatementAnalysisError};
use crate::ratios::{RatioKind, RatioSet};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Threshold {
    AtLeast(f64),
    Above(f64),
    Below(f64),
    AtMost(f64),
}

impl Threshold {
    pub fn matches(&self, value: f64) -> bool {
        match *self {
            Threshold::AtLeast(limit) => value >= limit,
            Threshold::Above(limit) => value > limit,
            Threshold::Below(limit) => value < limit,
            Threshold::AtMost(limit) => value <= limit,
        }
    }

    fn limit(&self) -> f64 {
        match *self {
            Threshold::AtLeast(l)
            | Threshold::Above(l)
            | Threshold::Below(l)
            | Threshold::AtMost(l) => l,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScoreBand {
    pub threshold: Threshold,
    #[schemars(description = "Points added (negative to subtract) when the threshold matches")]
    pub points: i32,
}

/// Bands are tried in order; the first one that matches is the only one applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScoreRule {
    pub ratio: RatioKind,
    pub bands: Vec<ScoreBand>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ScorePolicy {
    pub version: String,
    pub baseline: i32,
    pub min: i32,
    pub max: i32,
    pub rules: Vec<ScoreRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScoreAdjustment {
    pub ratio: RatioKind,
    pub value: f64,
    pub threshold: Threshold,
    pub points: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScoreCard {
    pub policy_version: String,
    pub score: u8,
    #[schemars(description = "Baseline plus all adjustments, before clamping")]
    pub raw: i32,
    pub adjustments: Vec<ScoreAdjustment>,
}

impl ScorePolicy {
    /// Liquidity, leverage and margin bands used by the current dashboard.
    pub fn v7() -> Self {
        Self {
            version: "v7".to_string(),
            baseline: 50,
            min: 0,
            max: 100,
            rules: vec![
                rule(
                    RatioKind::CurrentRatio,
                    &[(Threshold::AtLeast(1.0), 20), (Threshold::Below(0.8), -15)],
                ),
                rule(RatioKind::QuickRatio, &[(Threshold::Above(0.5), 10)]),
                rule(
                    RatioKind::Leverage,
                    &[(Threshold::Below(60.0), 15), (Threshold::Above(100.0), -25)],
                ),
                rule(
                    RatioKind::NetMargin,
                    &[(Threshold::Above(5.0), 20), (Threshold::Below(0.0), -20)],
                ),
            ],
        }
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |details: String| StatementAnalysisError::InvalidScorePolicy {
            version: self.version.clone(),
            details,
        };

        if self.min > self.max {
            return Err(invalid(format!(
                "min {} is greater than max {}",
                self.min, self.max
            )));
        }
        if self.min < 0 || self.max > 100 {
            return Err(invalid("score bounds must lie within 0..=100".to_string()));
        }
        for rule in &self.rules {
            if rule.bands.is_empty() {
                return Err(invalid(format!("rule for {} has no bands", rule.ratio)));
            }
            if let Some(band) = rule.bands.iter().find(|b| !b.threshold.limit().is_finite()) {
                return Err(invalid(format!(
                    "rule for {} has a non-finite threshold {:?}",
                    rule.ratio, band.threshold
                )));
            }
        }
        Ok(())
    }

    pub fn evaluate(&self, ratios: &RatioSet) -> ScoreCard {
        let mut adjustments = Vec::new();

        for rule in &self.rules {
            let value = ratios.get(rule.ratio);
            if let Some(band) = rule.bands.iter().find(|b| b.threshold.matches(value)) {
                adjustments.push(ScoreAdjustment {
                    ratio: rule.ratio,
                    value,
                    threshold: band.threshold,
                    points: band.points,
                });
            }
        }

        // Policies come from configuration; out-of-range points saturate.
        let raw = adjustments
            .iter()
            .fold(self.baseline, |acc, a| acc.saturating_add(a.points));
        let score = raw.max(self.min).min(self.max).clamp(0, 100) as u8;

        ScoreCard {
            policy_version: self.version.clone(),
            score,
            raw,
            adjustments,
        }
    }

    pub fn score(&self, ratios: &RatioSet) -> u8 {
        self.evaluate(ratios).score
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let policy: ScorePolicy = serde_json::from_str(json)?;
        policy.validate()?;
        Ok(policy)
    }
}

impl Default for ScorePolicy {
    fn default() -> Self {
        Self::v7()
    }
}

fn rule(ratio: RatioKind, bands: &[(Threshold, i32)]) -> ScoreRule {
    ScoreRule {
        ratio,
        bands: bands
            .iter()
            .map(|&(threshold, points)| ScoreBand { threshold, points })
            .collect(),
    }
}
