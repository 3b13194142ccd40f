//! Risk counts per group and ranked risk profiles.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::scoring::{score_risk, RiskCounts, RiskProfile, RiskTier, RiskTierThresholds, RiskWeights};
use crate::aggregation::{group_lines, GroupKey, KeySelector};
use crate::anomaly::is_undervalued;
use crate::anomaly::valuation::validate_ratio_threshold;
use crate::declarations::DeclarationLine;
use crate::error::CustomsAnalyticsError;
use crate::CustomsResult;

// ---------------------------------------------------------------------------
// Minimum support
// ---------------------------------------------------------------------------

/// A group enters rankings with at least `min_total_count` lines and at
/// least `min_flag_count` undervalued OR reclassified lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupportPolicy {
    pub min_flag_count: u64,
    pub min_total_count: u64,
}

impl SupportPolicy {
    /// Default for (classification, origin) groups.
    pub fn group_default() -> Self {
        SupportPolicy {
            min_flag_count: 10,
            min_total_count: 0,
        }
    }

    /// Default for importers.
    pub fn importer_default() -> Self {
        SupportPolicy {
            min_flag_count: 5,
            min_total_count: 20,
        }
    }

    pub fn admits(&self, counts: &RiskCounts) -> bool {
        counts.total_count >= self.min_total_count
            && (counts.under_count >= self.min_flag_count
                || counts.reclass_count >= self.min_flag_count)
    }
}

impl Default for SupportPolicy {
    fn default() -> Self {
        SupportPolicy::group_default()
    }
}

// ---------------------------------------------------------------------------
// Counting
// ---------------------------------------------------------------------------

fn count_groups<S, L>(
    lines: &[DeclarationLine],
    selector: &S,
    threshold: Decimal,
    label: L,
) -> CustomsResult<Vec<RiskCounts>>
where
    S: KeySelector + ?Sized,
    L: Fn(&[&DeclarationLine]) -> Option<String>,
{
    validate_ratio_threshold("under_threshold", threshold)?;
    Ok(group_lines(lines, selector)
        .into_iter()
        .map(|(group_key, members)| RiskCounts {
            label: label(&members),
            total_count: members.len() as u64,
            under_count: members.iter().filter(|l| is_undervalued(l, threshold)).count() as u64,
            reclass_count: members.iter().filter(|l| l.is_reclassified()).count() as u64,
            total_value_usd: members.iter().map(|l| l.assessed_invoice_value_usd).sum(),
            group_key,
        })
        .collect())
}

/// Undervaluation and reclassification counts for every group `selector` produces.
pub fn risk_counts_by<S>(
    lines: &[DeclarationLine],
    selector: &S,
    threshold: Decimal,
) -> CustomsResult<Vec<RiskCounts>>
where
    S: KeySelector + ?Sized,
{
    count_groups(lines, selector, threshold, |_| None)
}

/// Counts per (classification prefix, origin country).
pub fn classification_origin_counts(
    lines: &[DeclarationLine],
    prefix_len: usize,
    threshold: Decimal,
) -> CustomsResult<Vec<RiskCounts>> {
    risk_counts_by(
        lines,
        &|l: &DeclarationLine| {
            GroupKey::pair(l.classification_prefix(prefix_len), l.origin().map(String::from))
        },
        threshold,
    )
}

/// Counts per importer id, labelled with the importer name.
///
/// When one id carries several names the lexicographically greatest
/// non-blank one is used.
pub fn importer_counts(
    lines: &[DeclarationLine],
    threshold: Decimal,
) -> CustomsResult<Vec<RiskCounts>> {
    count_groups(
        lines,
        &|l: &DeclarationLine| GroupKey::single(l.importer().map(String::from)),
        threshold,
        |members| {
            members
                .iter()
                .filter_map(|l| l.importer_display_name())
                .max()
                .map(String::from)
        },
    )
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub normal: usize,
}

impl TierCounts {
    fn record(&mut self, tier: RiskTier) {
        match tier {
            RiskTier::High => self.high += 1,
            RiskTier::Medium => self.medium += 1,
            RiskTier::Low => self.low += 1,
            RiskTier::Normal => self.normal += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskRanking {
    /// Top profiles, highest score first.
    pub ranked: Vec<RiskProfile>,
    /// Groups that passed minimum support.
    pub evaluated_groups: usize,
    pub excluded_groups: usize,
    /// Tier distribution over every evaluated group, not only the top ones.
    pub tier_counts: TierCounts,
}

/// Score supported groups and keep the `top_n` highest.
///
/// Ties on score are broken by group key ascending.
pub fn rank_risk(
    counts: &[RiskCounts],
    weights: &RiskWeights,
    tiers: &RiskTierThresholds,
    policy: &SupportPolicy,
    top_n: usize,
) -> CustomsResult<RiskRanking> {
    if top_n == 0 {
        return Err(CustomsAnalyticsError::InvalidConfig {
            field: "top_n".into(),
            reason: "must be at least 1".into(),
        });
    }
    weights.validate()?;
    tiers.validate()?;

    let mut profiles: Vec<RiskProfile> = counts
        .iter()
        .filter(|c| policy.admits(c))
        .map(|c| score_risk(c, weights, tiers))
        .collect();
    let evaluated_groups = profiles.len();
    let excluded_groups = counts.len() - evaluated_groups;

    let mut tier_counts = TierCounts::default();
    for p in &profiles {
        tier_counts.record(p.risk_tier);
    }

    profiles.sort_by(|a, b| {
        b.risk_score
            .cmp(&a.risk_score)
            .then_with(|| a.group_key.cmp(&b.group_key))
    });
    profiles.truncate(top_n);

    log::debug!(
        "risk ranking: {evaluated_groups} evaluated, {excluded_groups} below support, {} high",
        tier_counts.high
    );

    Ok(RiskRanking {
        ranked: profiles,
        evaluated_groups,
        excluded_groups,
        tier_counts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Period;
    use rust_decimal_macros::dec;

    fn line(id: usize, hs: &str, origin: &str, under: bool) -> DeclarationLine {
        DeclarationLine {
            line_id: id.to_string(),
            period: Period::year(2024),
            declared_hs_code: Some(hs.into()),
            assessed_hs_code: Some(hs.into()),
            origin_country: Some(origin.into()),
            customs_office: None,
            importer_id: Some(format!("IMP{}", id % 2)),
            importer_name: Some(format!("Importer {}", id % 4)),
            declared_unit_value_usd: dec!(10),
            assessed_unit_value_usd: if under { dec!(20) } else { dec!(10) },
            declared_invoice_value_usd: dec!(100),
            assessed_invoice_value_usd: if under { dec!(200) } else { dec!(100) },
            tax_amount: dec!(5),
            is_deleted: false,
        }
    }

    #[test]
    fn test_counts_by_heading_and_origin() {
        let mut lines: Vec<_> = (0..10).map(|i| line(i, "85181000", "CN", i < 6)).collect();
        lines.extend((10..15).map(|i| line(i, "85189000", "CN", false)));
        let counts = classification_origin_counts(&lines, 4, dec!(1.3)).unwrap();
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].group_key.to_string(), "8518 / CN");
        assert_eq!(counts[0].total_count, 15);
        assert_eq!(counts[0].under_count, 6);
        assert_eq!(counts[0].total_value_usd, dec!(2100));
    }

    #[test]
    fn test_low_support_group_excluded() {
        let lines: Vec<_> = (0..10).map(|i| line(i, "85181000", "CN", i < 3)).collect();
        let counts = classification_origin_counts(&lines, 4, dec!(1.3)).unwrap();
        let r = rank_risk(
            &counts,
            &RiskWeights::default(),
            &RiskTierThresholds::default(),
            &SupportPolicy::group_default(),
            20,
        )
        .unwrap();
        assert!(r.ranked.is_empty());
        assert_eq!(r.evaluated_groups, 0);
        assert_eq!(r.excluded_groups, 1);
    }

    #[test]
    fn test_fully_undervalued_group_still_needs_support() {
        let lines: Vec<_> = (0..3).map(|i| line(i, "85181000", "CN", true)).collect();
        let counts = classification_origin_counts(&lines, 4, dec!(1.3)).unwrap();
        let profile = score_risk(
            &counts[0],
            &RiskWeights::default(),
            &RiskTierThresholds::default(),
        );
        assert_eq!(profile.under_rate, dec!(100));
        assert_eq!(profile.risk_score, dec!(300));
        assert_eq!(profile.risk_tier, RiskTier::High);

        let r = rank_risk(
            &counts,
            &RiskWeights::default(),
            &RiskTierThresholds::default(),
            &SupportPolicy::group_default(),
            20,
        )
        .unwrap();
        assert!(r.ranked.is_empty());
        assert_eq!(r.excluded_groups, 1);
        assert_eq!(r.tier_counts.high, 0);
    }

    #[test]
    fn test_ranking_order_and_truncation() {
        let mut lines: Vec<_> = (0..20).map(|i| line(i, "85181000", "CN", i < 12)).collect();
        lines.extend((100..120).map(|i| line(i, "39269099", "VN", i < 118)));
        lines.extend((200..220).map(|i| line(i, "94036000", "JP", i < 210)));
        let counts = classification_origin_counts(&lines, 4, dec!(1.3)).unwrap();
        let r = rank_risk(
            &counts,
            &RiskWeights::default(),
            &RiskTierThresholds::default(),
            &SupportPolicy::group_default(),
            2,
        )
        .unwrap();
        assert_eq!(r.evaluated_groups, 3);
        assert_eq!(r.ranked.len(), 2);
        assert_eq!(r.ranked[0].group_key.to_string(), "3926 / VN");
        assert_eq!(r.ranked[0].risk_score, dec!(270));
        assert_eq!(r.ranked[1].group_key.to_string(), "8518 / CN");
        assert_eq!(r.tier_counts.high, 3);
    }

    #[test]
    fn test_importer_counts_use_greatest_name() {
        let lines: Vec<_> = (0..8).map(|i| line(i, "85181000", "CN", true)).collect();
        let counts = importer_counts(&lines, dec!(1.3)).unwrap();
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].group_key.to_string(), "IMP0");
        assert_eq!(counts[0].label.as_deref(), Some("Importer 2"));
        assert_eq!(counts[1].label.as_deref(), Some("Importer 3"));
    }

    #[test]
    fn test_importer_total_floor() {
        let lines: Vec<_> = (0..30).map(|i| line(i, "85181000", "CN", i < 12)).collect();
        let counts = importer_counts(&lines, dec!(1.3)).unwrap();
        let r = rank_risk(
            &counts,
            &RiskWeights::default(),
            &RiskTierThresholds::default(),
            &SupportPolicy::importer_default(),
            20,
        )
        .unwrap();
        assert_eq!(r.excluded_groups, 2);

        let lines: Vec<_> = (0..50).map(|i| line(i, "85181000", "CN", i < 12)).collect();
        let counts = importer_counts(&lines, dec!(1.3)).unwrap();
        let r = rank_risk(
            &counts,
            &RiskWeights::default(),
            &RiskTierThresholds::default(),
            &SupportPolicy::importer_default(),
            20,
        )
        .unwrap();
        assert_eq!(r.evaluated_groups, 2);
    }

    #[test]
    fn test_zero_top_n_rejected() {
        let r = rank_risk(
            &[],
            &RiskWeights::default(),
            &RiskTierThresholds::default(),
            &SupportPolicy::default(),
            0,
        );
        assert!(r.is_err());
    }
}
