//! Declared-vs-assessed valuation anomalies.
//!
//! A line is **undervalued** when customs assessed its unit value at
//! `threshold` times the declared one or more (default 1.3, i.e. 30% above),
//! and **overvalued** in the mirror case. Lines with a zero or negative
//! denominator never enter the ratio.
//!
//! All arithmetic uses `rust_decimal::Decimal`. No `f64`.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::findings::{AnomalyFinding, AnomalyKind};
use crate::aggregation::{GroupKey, Supported};
use crate::declarations::DeclarationLine;
use crate::error::CustomsAnalyticsError;
use crate::types::{percent_of, Money, Percent};
use crate::CustomsResult;

// ---------------------------------------------------------------------------
// Conditions
// ---------------------------------------------------------------------------

pub fn validate_ratio_threshold(name: &str, threshold: Decimal) -> CustomsResult<()> {
    if threshold <= Decimal::ZERO {
        return Err(CustomsAnalyticsError::ThresholdOutOfRange {
            name: name.into(),
            value: threshold,
            expected: "> 0".into(),
        });
    }
    Ok(())
}

pub fn is_undervalued(line: &DeclarationLine, threshold: Decimal) -> bool {
    line.declared_ratio_eligible()
        && line.assessed_unit_value_usd >= line.declared_unit_value_usd * threshold
}

pub fn is_overvalued(line: &DeclarationLine, threshold: Decimal) -> bool {
    line.assessed_ratio_eligible()
        && line.declared_unit_value_usd >= line.assessed_unit_value_usd * threshold
}

fn undervaluation_finding(line: &DeclarationLine) -> AnomalyFinding {
    let declared = line.declared_unit_value_usd;
    AnomalyFinding {
        kind: AnomalyKind::Undervaluation,
        scope_key: line.line_id.clone(),
        magnitude: (line.assessed_unit_value_usd - declared) / declared,
        value_at_risk_usd: line.invoice_gap_usd(),
    }
}

fn overvaluation_finding(line: &DeclarationLine) -> AnomalyFinding {
    let assessed = line.assessed_unit_value_usd;
    AnomalyFinding {
        kind: AnomalyKind::Overvaluation,
        scope_key: line.line_id.clone(),
        magnitude: (line.declared_unit_value_usd - assessed) / assessed,
        value_at_risk_usd: -line.invoice_gap_usd(),
    }
}

// ---------------------------------------------------------------------------
// Per-line detection
// ---------------------------------------------------------------------------

/// Flag lines whose assessed unit value is at least `threshold` × declared.
pub fn detect_undervaluation(
    lines: &[DeclarationLine],
    threshold: Decimal,
) -> CustomsResult<Vec<AnomalyFinding>> {
    validate_ratio_threshold("under_threshold", threshold)?;
    Ok(lines
        .iter()
        .filter(|l| is_undervalued(l, threshold))
        .map(undervaluation_finding)
        .collect())
}

/// Flag lines whose declared unit value is at least `threshold` × assessed.
pub fn detect_overvaluation(
    lines: &[DeclarationLine],
    threshold: Decimal,
) -> CustomsResult<Vec<AnomalyFinding>> {
    validate_ratio_threshold("over_threshold", threshold)?;
    Ok(lines
        .iter()
        .filter(|l| is_overvalued(l, threshold))
        .map(overvaluation_finding)
        .collect())
}

// ---------------------------------------------------------------------------
// Grouped undervaluation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndervaluationGroup {
    /// (assessed HS code, origin country)
    pub group_key: GroupKey,
    pub flagged_count: u64,
    /// Mean of (assessed - declared) / declared across flagged lines, in %.
    pub average_gap_pct: Percent,
    pub total_value_at_risk_usd: Money,
    pub total_assessed_value_usd: Money,
}

/// Undervalued lines grouped by (assessed HS code, origin), ranked by value at risk.
///
/// Groups with fewer than `min_group_size` flagged lines are counted in
/// `excluded_groups` and left out.
pub fn undervaluation_by_group(
    lines: &[DeclarationLine],
    threshold: Decimal,
    min_group_size: u64,
) -> CustomsResult<Supported<UndervaluationGroup>> {
    validate_ratio_threshold("under_threshold", threshold)?;

    let mut groups: BTreeMap<GroupKey, Vec<&DeclarationLine>> = BTreeMap::new();
    for line in lines.iter().filter(|l| is_undervalued(l, threshold)) {
        let key = GroupKey::pair(
            line.classification().map(String::from),
            line.origin().map(String::from),
        );
        groups.entry(key).or_default().push(line);
    }

    let mut excluded_groups = 0usize;
    let mut retained: Vec<UndervaluationGroup> = Vec::new();
    for (group_key, members) in groups {
        let n = members.len() as u64;
        if n < min_group_size {
            excluded_groups += 1;
            continue;
        }
        let gap_sum: Decimal = members
            .iter()
            .map(|l| undervaluation_finding(l).magnitude)
            .sum();
        retained.push(UndervaluationGroup {
            group_key,
            flagged_count: n,
            average_gap_pct: gap_sum / Decimal::from(n) * dec!(100),
            total_value_at_risk_usd: members.iter().map(|l| l.invoice_gap_usd()).sum(),
            total_assessed_value_usd: members.iter().map(|l| l.assessed_invoice_value_usd).sum(),
        });
    }

    retained.sort_by(|a, b| {
        b.total_value_at_risk_usd
            .cmp(&a.total_value_at_risk_usd)
            .then_with(|| a.group_key.cmp(&b.group_key))
    });

    Ok(Supported {
        retained,
        excluded_groups,
    })
}

// ---------------------------------------------------------------------------
// Per-period statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodValuationStats {
    pub year: i32,
    pub total_count: u64,
    pub undervaluation_count: u64,
    pub undervaluation_rate_pct: Percent,
    /// Sum of invoice gaps over undervalued lines.
    pub estimated_loss_usd: Money,
    pub reclassification_count: u64,
    pub reclassification_rate_pct: Percent,
}

/// Undervaluation and reclassification rates per year, oldest first.
pub fn valuation_stats_by_period(
    lines: &[DeclarationLine],
    threshold: Decimal,
) -> CustomsResult<Vec<PeriodValuationStats>> {
    validate_ratio_threshold("under_threshold", threshold)?;

    let mut by_year: BTreeMap<i32, PeriodValuationStats> = BTreeMap::new();
    for line in lines.iter().filter(|l| l.is_active()) {
        let year = line.period.year;
        let stats = by_year.entry(year).or_insert_with(|| PeriodValuationStats {
            year,
            total_count: 0,
            undervaluation_count: 0,
            undervaluation_rate_pct: Decimal::ZERO,
            estimated_loss_usd: Decimal::ZERO,
            reclassification_count: 0,
            reclassification_rate_pct: Decimal::ZERO,
        });
        stats.total_count += 1;
        if is_undervalued(line, threshold) {
            stats.undervaluation_count += 1;
            stats.estimated_loss_usd += line.invoice_gap_usd();
        }
        if line.is_reclassified() {
            stats.reclassification_count += 1;
        }
    }

    Ok(by_year
        .into_values()
        .map(|mut s| {
            s.undervaluation_rate_pct = percent_of(s.undervaluation_count, s.total_count);
            s.reclassification_rate_pct = percent_of(s.reclassification_count, s.total_count);
            s
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Period;

    fn line(id: &str, declared: Decimal, assessed: Decimal) -> DeclarationLine {
        DeclarationLine {
            line_id: id.into(),
            period: Period::year(2024),
            declared_hs_code: Some("85181000".into()),
            assessed_hs_code: Some("85181000".into()),
            origin_country: Some("CN".into()),
            customs_office: None,
            importer_id: None,
            importer_name: None,
            declared_unit_value_usd: declared,
            assessed_unit_value_usd: assessed,
            declared_invoice_value_usd: declared * dec!(10),
            assessed_invoice_value_usd: assessed * dec!(10),
            tax_amount: dec!(1),
            is_deleted: false,
        }
    }

    fn swap(l: &DeclarationLine) -> DeclarationLine {
        let mut s = l.clone();
        std::mem::swap(&mut s.declared_unit_value_usd, &mut s.assessed_unit_value_usd);
        std::mem::swap(
            &mut s.declared_invoice_value_usd,
            &mut s.assessed_invoice_value_usd,
        );
        s
    }

    #[test]
    fn test_equal_values_not_flagged() {
        let lines: Vec<_> = (0..10).map(|i| line(&i.to_string(), dec!(100), dec!(100))).collect();
        assert!(detect_undervaluation(&lines, dec!(1.3)).unwrap().is_empty());
        assert!(detect_overvaluation(&lines, dec!(1.3)).unwrap().is_empty());
    }

    #[test]
    fn test_undervaluation_magnitude_and_value_at_risk() {
        let f = detect_undervaluation(&[line("x", dec!(100), dec!(200))], dec!(1.3)).unwrap();
        assert_eq!(f.len(), 1);
        assert_eq!(f[0].kind, AnomalyKind::Undervaluation);
        assert_eq!(f[0].magnitude, dec!(1));
        assert_eq!(f[0].value_at_risk_usd, dec!(1000));
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let f = detect_undervaluation(&[line("x", dec!(100), dec!(130))], dec!(1.3)).unwrap();
        assert_eq!(f.len(), 1);
        let f = detect_undervaluation(&[line("x", dec!(100), dec!(129.99))], dec!(1.3)).unwrap();
        assert!(f.is_empty());
    }

    #[test]
    fn test_zero_declared_never_flagged() {
        let f = detect_undervaluation(&[line("x", Decimal::ZERO, dec!(500))], dec!(1.3)).unwrap();
        assert!(f.is_empty());
    }

    #[test]
    fn test_negative_values_never_flagged() {
        let lines = vec![line("a", dec!(-10), dec!(500)), line("b", dec!(100), dec!(-5))];
        assert!(detect_undervaluation(&lines, dec!(1.3)).unwrap().is_empty());
        assert!(detect_overvaluation(&lines, dec!(1.3)).unwrap().is_empty());
    }

    #[test]
    fn test_deleted_line_not_flagged() {
        let mut l = line("x", dec!(100), dec!(300));
        l.is_deleted = true;
        assert!(detect_undervaluation(&[l], dec!(1.3)).unwrap().is_empty());
    }

    #[test]
    fn test_symmetry_under_label_swap() {
        let lines = vec![
            line("a", dec!(100), dec!(200)),
            line("b", dec!(200), dec!(100)),
            line("c", dec!(100), dec!(125)),
            line("d", Decimal::ZERO, dec!(40)),
            line("e", dec!(40), Decimal::ZERO),
            line("f", dec!(3), dec!(7)),
        ];
        let swapped: Vec<_> = lines.iter().map(swap).collect();
        for threshold in [dec!(1.1), dec!(1.3), dec!(2)] {
            let under = detect_undervaluation(&lines, threshold).unwrap();
            let over_swapped = detect_overvaluation(&swapped, threshold).unwrap();
            assert_eq!(under.len(), over_swapped.len());
            for (u, o) in under.iter().zip(over_swapped.iter()) {
                assert_eq!(u.scope_key, o.scope_key);
                assert_eq!(u.magnitude, o.magnitude);
                assert_eq!(u.value_at_risk_usd, o.value_at_risk_usd);
            }
        }
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        assert!(detect_undervaluation(&[], Decimal::ZERO).is_err());
        assert!(detect_overvaluation(&[], dec!(-1)).is_err());
    }

    #[test]
    fn test_grouped_undervaluation_min_size() {
        let mut lines: Vec<_> = (0..12)
            .map(|i| line(&format!("cn{i}"), dec!(10), dec!(20)))
            .collect();
        for i in 0..3 {
            let mut l = line(&format!("jp{i}"), dec!(10), dec!(50));
            l.origin_country = Some("JP".into());
            lines.push(l);
        }
        let g = undervaluation_by_group(&lines, dec!(1.3), 10).unwrap();
        assert_eq!(g.retained.len(), 1);
        assert_eq!(g.excluded_groups, 1);
        let cn = &g.retained[0];
        assert_eq!(cn.group_key.to_string(), "85181000 / CN");
        assert_eq!(cn.flagged_count, 12);
        assert_eq!(cn.average_gap_pct, dec!(100));
        assert_eq!(cn.total_value_at_risk_usd, dec!(1200));
        assert_eq!(cn.total_assessed_value_usd, dec!(2400));
    }

    #[test]
    fn test_period_stats() {
        let mut lines = vec![
            line("a", dec!(100), dec!(200)),
            line("b", dec!(100), dec!(100)),
            line("c", dec!(100), dec!(100)),
            line("d", dec!(100), dec!(100)),
        ];
        lines[1].declared_hs_code = Some("99999999".into());
        lines[3].period = Period::year(2023);
        let stats = valuation_stats_by_period(&lines, dec!(1.3)).unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].year, 2023);
        assert_eq!(stats[0].total_count, 1);
        assert_eq!(stats[0].undervaluation_rate_pct, Decimal::ZERO);
        let s = &stats[1];
        assert_eq!(s.total_count, 3);
        assert_eq!(s.undervaluation_count, 1);
        assert!((s.undervaluation_rate_pct - dec!(33.33)).abs() < dec!(0.01));
        assert_eq!(s.estimated_loss_usd, dec!(1000));
        assert_eq!(s.reclassification_count, 1);
    }
}
