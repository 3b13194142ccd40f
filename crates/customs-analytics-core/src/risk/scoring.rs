//! Weighted risk score over undervaluation and reclassification rates.
//!
//! `risk_score = under_rate × w_under + reclass_rate × w_reclass`, with both
//! rates on a 0-100 scale. With the default weights (3, 2) the score ranges
//! from 0 to 500. All arithmetic uses `rust_decimal::Decimal`. No `f64`.

use std::fmt;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::aggregation::GroupKey;
use crate::error::CustomsAnalyticsError;
use crate::types::{percent_of, Money, Percent};
use crate::CustomsResult;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskWeights {
    pub undervaluation: Decimal,
    pub reclassification: Decimal,
}

impl Default for RiskWeights {
    fn default() -> Self {
        RiskWeights {
            undervaluation: dec!(3),
            reclassification: dec!(2),
        }
    }
}

impl RiskWeights {
    pub fn validate(&self) -> CustomsResult<()> {
        for (name, w) in [
            ("risk_weights.undervaluation", self.undervaluation),
            ("risk_weights.reclassification", self.reclassification),
        ] {
            if w < Decimal::ZERO {
                return Err(CustomsAnalyticsError::ThresholdOutOfRange {
                    name: name.into(),
                    value: w,
                    expected: ">= 0".into(),
                });
            }
        }
        Ok(())
    }
}

/// Lower bounds (inclusive) of each tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskTierThresholds {
    pub high: Decimal,
    pub medium: Decimal,
    pub low: Decimal,
}

impl Default for RiskTierThresholds {
    fn default() -> Self {
        RiskTierThresholds {
            high: dec!(80),
            medium: dec!(50),
            low: dec!(30),
        }
    }
}

impl RiskTierThresholds {
    pub fn validate(&self) -> CustomsResult<()> {
        if !(Decimal::ZERO <= self.low && self.low <= self.medium && self.medium <= self.high) {
            return Err(CustomsAnalyticsError::InvalidConfig {
                field: "risk_tiers".into(),
                reason: format!(
                    "expected 0 <= low <= medium <= high, got {} / {} / {}",
                    self.low, self.medium, self.high
                ),
            });
        }
        Ok(())
    }

    pub fn tier(&self, score: Decimal) -> RiskTier {
        if score >= self.high {
            RiskTier::High
        } else if score >= self.medium {
            RiskTier::Medium
        } else if score >= self.low {
            RiskTier::Low
        } else {
            RiskTier::Normal
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskTier {
    Normal,
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskTier::Normal => "NORMAL",
            RiskTier::Low => "LOW",
            RiskTier::Medium => "MEDIUM",
            RiskTier::High => "HIGH",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Counts and profiles
// ---------------------------------------------------------------------------

/// Raw flag counts for one group, before scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskCounts {
    pub group_key: GroupKey,
    /// Display name, e.g. the importer name.
    pub label: Option<String>,
    pub total_count: u64,
    pub under_count: u64,
    pub reclass_count: u64,
    pub total_value_usd: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskProfile {
    pub group_key: GroupKey,
    pub label: Option<String>,
    pub total_count: u64,
    pub under_count: u64,
    pub reclass_count: u64,
    pub under_rate: Percent,
    pub reclass_rate: Percent,
    pub risk_score: Decimal,
    pub risk_tier: RiskTier,
    pub total_value_usd: Money,
}

/// Score one group. A group with no lines scores zero and is `NORMAL`.
pub fn score_risk(
    counts: &RiskCounts,
    weights: &RiskWeights,
    tiers: &RiskTierThresholds,
) -> RiskProfile {
    let under_rate = percent_of(counts.under_count, counts.total_count);
    let reclass_rate = percent_of(counts.reclass_count, counts.total_count);
    let risk_score = under_rate * weights.undervaluation + reclass_rate * weights.reclassification;
    RiskProfile {
        group_key: counts.group_key.clone(),
        label: counts.label.clone(),
        total_count: counts.total_count,
        under_count: counts.under_count,
        reclass_count: counts.reclass_count,
        under_rate,
        reclass_rate,
        risk_score,
        risk_tier: tiers.tier(risk_score),
        total_value_usd: counts.total_value_usd,
    }
}
