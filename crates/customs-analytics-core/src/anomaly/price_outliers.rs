//! Unit-price dispersion per HS classification.
//!
//! A classification is a price outlier when the sample standard deviation of
//! its assessed unit values exceeds their mean (coefficient of variation
//! above 1), given enough observations to trust the statistic.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::findings::{AnomalyFinding, AnomalyKind};
use crate::aggregation::trends::sample_stats;
use crate::aggregation::{group_lines, GroupKey};
use crate::declarations::DeclarationLine;
use crate::types::{checked_ratio, Money, Percent};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceVarianceGroup {
    pub group_key: GroupKey,
    pub count: u64,
    pub mean_unit_value: Money,
    pub std_dev_unit_value: Option<Money>,
    pub min_unit_value: Money,
    pub max_unit_value: Money,
    pub coefficient_of_variation_pct: Option<Percent>,
    pub total_assessed_value_usd: Money,
    pub flagged: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceVarianceReport {
    /// Supported groups, widest dispersion first.
    pub groups: Vec<PriceVarianceGroup>,
    pub flagged_groups: usize,
    pub excluded_groups: usize,
}

fn is_price_observation(line: &DeclarationLine) -> bool {
    line.has_valid_unit_values() && line.assessed_unit_value_usd > Decimal::ZERO
}

/// Assessed unit-value statistics for every classification with at least
/// `min_group_size` positive observations.
pub fn price_variance_report(lines: &[DeclarationLine], min_group_size: u64) -> PriceVarianceReport {
    let observations: Vec<DeclarationLine> = lines
        .iter()
        .filter(|l| l.is_active() && is_price_observation(l))
        .cloned()
        .collect();
    let groups = group_lines(&observations, &|l: &DeclarationLine| {
        GroupKey::single(l.classification().map(String::from))
    });

    let mut excluded_groups = 0usize;
    let mut out: Vec<PriceVarianceGroup> = Vec::new();
    for (group_key, members) in groups {
        let count = members.len() as u64;
        if count < min_group_size {
            excluded_groups += 1;
            continue;
        }
        let values: Vec<Decimal> = members.iter().map(|l| l.assessed_unit_value_usd).collect();
        let (mean, std_dev) = sample_stats(&values);
        let mean = mean.unwrap_or(Decimal::ZERO);
        let cv = std_dev.and_then(|s| checked_ratio(s, mean));
        out.push(PriceVarianceGroup {
            group_key,
            count,
            mean_unit_value: mean,
            std_dev_unit_value: std_dev,
            min_unit_value: values.iter().copied().min().unwrap_or(Decimal::ZERO),
            max_unit_value: values.iter().copied().max().unwrap_or(Decimal::ZERO),
            coefficient_of_variation_pct: cv.map(|c| c * dec!(100)),
            total_assessed_value_usd: members.iter().map(|l| l.assessed_invoice_value_usd).sum(),
            flagged: std_dev.map_or(false, |s| s > mean),
        });
    }

    out.sort_by(|a, b| {
        let a_std = a.std_dev_unit_value.unwrap_or(Decimal::ZERO);
        let b_std = b.std_dev_unit_value.unwrap_or(Decimal::ZERO);
        b_std.cmp(&a_std).then_with(|| a.group_key.cmp(&b.group_key))
    });

    let flagged_groups = out.iter().filter(|g| g.flagged).count();
    log::debug!(
        "price variance: {} group(s), {flagged_groups} flagged, {excluded_groups} below support",
        out.len()
    );

    PriceVarianceReport {
        groups: out,
        flagged_groups,
        excluded_groups,
    }
}

/// One finding per flagged classification; magnitude is the CV as a ratio.
pub fn detect_price_outliers(lines: &[DeclarationLine], min_group_size: u64) -> Vec<AnomalyFinding> {
    price_variance_report(lines, min_group_size)
        .groups
        .into_iter()
        .filter(|g| g.flagged)
        .map(|g| AnomalyFinding {
            kind: AnomalyKind::PriceOutlier,
            scope_key: g.group_key.to_string(),
            magnitude: g
                .coefficient_of_variation_pct
                .map(|c| c / dec!(100))
                .unwrap_or(Decimal::ZERO),
            value_at_risk_usd: g.total_assessed_value_usd,
        })
        .collect()
}
