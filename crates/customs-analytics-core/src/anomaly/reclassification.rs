//! HS reclassification by customs review.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::findings::{AnomalyFinding, AnomalyKind};
use crate::declarations::DeclarationLine;
use crate::types::{checked_ratio, percent_of, Money, Percent};

/// Prefix lengths that make up the HS heading and chapter of a code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HsLevels {
    pub heading_len: usize,
    pub chapter_len: usize,
}

impl Default for HsLevels {
    fn default() -> Self {
        HsLevels {
            heading_len: 4,
            chapter_len: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReclassificationPair {
    pub declared_hs: String,
    pub assessed_hs: String,
    pub declared_heading: String,
    pub assessed_heading: String,
    /// The two codes sit in different HS chapters.
    pub chapter_changed: bool,
    pub count: u64,
    /// Share of all reclassified lines.
    pub share_pct: Percent,
    pub total_assessed_value_usd: Money,
}

impl ReclassificationPair {
    pub fn scope_key(&self) -> String {
        format!("{} -> {}", self.declared_hs, self.assessed_hs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReclassificationReport {
    /// Most frequent pairs first.
    pub pairs: Vec<ReclassificationPair>,
    pub total_reclassified_lines: u64,
    pub excluded_pairs: usize,
}

fn head(code: &str, len: usize) -> String {
    code.chars().take(len).collect()
}

/// Declared→assessed pairs occurring at least `min_group_size` times.
pub fn reclassification_report(
    lines: &[DeclarationLine],
    min_group_size: u64,
    levels: HsLevels,
) -> ReclassificationReport {
    let mut pairs: BTreeMap<(String, String), (u64, Decimal)> = BTreeMap::new();
    let mut total: u64 = 0;
    for line in lines.iter().filter(|l| l.is_active() && l.is_reclassified()) {
        if let (Some(d), Some(a)) = (line.declared_hs(), line.assessed_hs()) {
            let entry = pairs
                .entry((d.to_string(), a.to_string()))
                .or_insert((0, Decimal::ZERO));
            entry.0 += 1;
            entry.1 += line.assessed_invoice_value_usd;
            total += 1;
        }
    }

    let mut excluded_pairs = 0usize;
    let mut out: Vec<ReclassificationPair> = Vec::new();
    for ((declared_hs, assessed_hs), (count, value)) in pairs {
        if count < min_group_size {
            excluded_pairs += 1;
            continue;
        }
        out.push(ReclassificationPair {
            declared_heading: head(&declared_hs, levels.heading_len),
            assessed_heading: head(&assessed_hs, levels.heading_len),
            chapter_changed: head(&declared_hs, levels.chapter_len)
                != head(&assessed_hs, levels.chapter_len),
            declared_hs,
            assessed_hs,
            count,
            share_pct: percent_of(count, total),
            total_assessed_value_usd: value,
        });
    }
    // BTreeMap order already sorts equal counts by (declared, assessed)
    out.sort_by(|a, b| b.count.cmp(&a.count));

    ReclassificationReport {
        pairs: out,
        total_reclassified_lines: total,
        excluded_pairs,
    }
}

/// One finding per frequent reclassification pair.
pub fn detect_reclassification(
    lines: &[DeclarationLine],
    min_group_size: u64,
    levels: HsLevels,
) -> Vec<AnomalyFinding> {
    reclassification_report(lines, min_group_size, levels)
        .pairs
        .iter()
        .map(|p| AnomalyFinding {
            kind: AnomalyKind::ReclassificationChange,
            scope_key: p.scope_key(),
            magnitude: p.share_pct,
            value_at_risk_usd: p.total_assessed_value_usd,
        })
        .collect()
}

/// One finding per reclassified line.
///
/// Magnitude is the relative unit-value change that came with the new code
/// (zero when the declared unit value is zero).
pub fn detect_line_reclassifications(lines: &[DeclarationLine]) -> Vec<AnomalyFinding> {
    lines
        .iter()
        .filter(|l| l.is_active() && l.is_reclassified())
        .map(|l| AnomalyFinding {
            kind: AnomalyKind::ReclassificationChange,
            scope_key: l.line_id.clone(),
            magnitude: if l.declared_ratio_eligible() {
                checked_ratio(
                    l.assessed_unit_value_usd - l.declared_unit_value_usd,
                    l.declared_unit_value_usd,
                )
                .unwrap_or(Decimal::ZERO)
            } else {
                Decimal::ZERO
            },
            value_at_risk_usd: l.invoice_gap_usd(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Period;
    use rust_decimal_macros::dec;

    fn line(id: usize, declared: Option<&str>, assessed: Option<&str>) -> DeclarationLine {
        DeclarationLine {
            line_id: id.to_string(),
            period: Period::year(2024),
            declared_hs_code: declared.map(String::from),
            assessed_hs_code: assessed.map(String::from),
            origin_country: None,
            customs_office: None,
            importer_id: None,
            importer_name: None,
            declared_unit_value_usd: dec!(10),
            assessed_unit_value_usd: dec!(12),
            declared_invoice_value_usd: dec!(100),
            assessed_invoice_value_usd: dec!(120),
            tax_amount: Decimal::ZERO,
            is_deleted: false,
        }
    }

    fn repeat(n: usize, start: usize, declared: Option<&str>, assessed: Option<&str>) -> Vec<DeclarationLine> {
        (0..n).map(|i| line(start + i, declared, assessed)).collect()
    }

    #[test]
    fn test_pairs_ranked_by_count() {
        let mut lines = repeat(12, 0, Some("85181000"), Some("85182200"));
        lines.extend(repeat(15, 100, Some("39269099"), Some("84219900")));
        lines.extend(repeat(4, 200, Some("94030000"), Some("94036000")));
        let r = reclassification_report(&lines, 10, HsLevels::default());
        assert_eq!(r.total_reclassified_lines, 31);
        assert_eq!(r.excluded_pairs, 1);
        assert_eq!(r.pairs.len(), 2);
        assert_eq!(r.pairs[0].declared_hs, "39269099");
        assert_eq!(r.pairs[0].count, 15);
        assert!(r.pairs[0].chapter_changed);
        assert_eq!(r.pairs[0].total_assessed_value_usd, dec!(1800));
        assert_eq!(r.pairs[1].assessed_heading, "8518");
        assert!(!r.pairs[1].chapter_changed);
    }

    #[test]
    fn test_equal_counts_ordered_by_codes() {
        let mut lines = repeat(10, 0, Some("22"), Some("11"));
        lines.extend(repeat(10, 100, Some("11"), Some("22")));
        let f = detect_reclassification(&lines, 10, HsLevels::default());
        assert_eq!(f.len(), 2);
        assert_eq!(f[0].scope_key, "11 -> 22");
        assert_eq!(f[1].scope_key, "22 -> 11");
        assert_eq!(f[0].magnitude, dec!(50));
    }

    #[test]
    fn test_null_or_equal_codes_ignored() {
        let mut lines = repeat(10, 0, None, Some("85182200"));
        lines.extend(repeat(10, 100, Some("85182200"), None));
        lines.extend(repeat(10, 200, Some("85182200"), Some("85182200")));
        let r = reclassification_report(&lines, 1, HsLevels::default());
        assert_eq!(r.total_reclassified_lines, 0);
        assert!(r.pairs.is_empty());
        assert!(detect_line_reclassifications(&lines).is_empty());
    }

    #[test]
    fn test_configured_heading_and_chapter_lengths() {
        let lines = repeat(10, 0, Some("85181000"), Some("85291000"));
        let default = reclassification_report(&lines, 10, HsLevels::default());
        assert_eq!(default.pairs[0].declared_heading, "8518");
        assert!(!default.pairs[0].chapter_changed);

        let levels = HsLevels {
            heading_len: 6,
            chapter_len: 3,
        };
        let r = reclassification_report(&lines, 10, levels);
        assert_eq!(r.pairs[0].declared_heading, "851810");
        assert_eq!(r.pairs[0].assessed_heading, "852910");
        assert!(r.pairs[0].chapter_changed);
    }

    #[test]
    fn test_line_level_findings() {
        let lines = repeat(3, 0, Some("85181000"), Some("85182200"));
        let f = detect_line_reclassifications(&lines);
        assert_eq!(f.len(), 3);
        assert_eq!(f[0].magnitude, dec!(0.2));
        assert_eq!(f[0].value_at_risk_usd, dec!(20));
    }
}
