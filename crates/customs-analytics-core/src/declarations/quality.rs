//! Data-quality screening of declaration lines.
//!
//! Malformed lines are never coerced: they stay in plain totals, drop out of
//! ratio computations, and are counted here so the exclusion is observable.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::line::DeclarationLine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataQualityIssue {
    /// Declared or assessed unit value below zero.
    NegativeUnitValue,
    /// Declared unit value of zero; no valuation ratio can be formed.
    ZeroDeclaredUnitValue,
    /// Negative invoice value or tax amount.
    NegativeAmount,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataQualityReport {
    pub total_lines: u64,
    pub deleted_lines: u64,
    pub active_lines: u64,
    /// Active lines usable in declared-denominator ratios.
    pub ratio_eligible_lines: u64,
    pub negative_unit_value_lines: Vec<String>,
    pub zero_declared_unit_value_lines: Vec<String>,
    pub negative_amount_lines: Vec<String>,
}

impl DataQualityReport {
    /// Active lines carrying at least one issue that makes them malformed.
    pub fn malformed_count(&self) -> u64 {
        (self.negative_unit_value_lines.len() + self.negative_amount_lines.len()) as u64
    }

    /// Human-readable warnings for the output envelope.
    pub fn warnings(&self) -> Vec<String> {
        let mut out = Vec::new();
        if !self.negative_unit_value_lines.is_empty() {
            out.push(format!(
                "{} line(s) with negative unit values excluded from ratio computations",
                self.negative_unit_value_lines.len()
            ));
        }
        if !self.zero_declared_unit_value_lines.is_empty() {
            out.push(format!(
                "{} line(s) with zero declared unit value excluded from valuation ratios",
                self.zero_declared_unit_value_lines.len()
            ));
        }
        if !self.negative_amount_lines.is_empty() {
            out.push(format!(
                "{} line(s) with negative invoice or tax amounts",
                self.negative_amount_lines.len()
            ));
        }
        out
    }
}

/// Issues found on a single line. Deleted lines are not inspected.
pub fn line_issues(line: &DeclarationLine) -> Vec<DataQualityIssue> {
    let mut issues = Vec::new();
    if !line.is_active() {
        return issues;
    }
    if !line.has_valid_unit_values() {
        issues.push(DataQualityIssue::NegativeUnitValue);
    } else if line.declared_unit_value_usd.is_zero() {
        issues.push(DataQualityIssue::ZeroDeclaredUnitValue);
    }
    if line.declared_invoice_value_usd < Decimal::ZERO
        || line.assessed_invoice_value_usd < Decimal::ZERO
        || line.tax_amount < Decimal::ZERO
    {
        issues.push(DataQualityIssue::NegativeAmount);
    }
    issues
}

/// Screen every line and tally the issues.
pub fn assess_data_quality(lines: &[DeclarationLine]) -> DataQualityReport {
    let mut report = DataQualityReport {
        total_lines: lines.len() as u64,
        ..Default::default()
    };

    for line in lines {
        if !line.is_active() {
            report.deleted_lines += 1;
            continue;
        }
        report.active_lines += 1;
        if line.declared_ratio_eligible() {
            report.ratio_eligible_lines += 1;
        }
        for issue in line_issues(line) {
            let bucket = match issue {
                DataQualityIssue::NegativeUnitValue => &mut report.negative_unit_value_lines,
                DataQualityIssue::ZeroDeclaredUnitValue => {
                    &mut report.zero_declared_unit_value_lines
                }
                DataQualityIssue::NegativeAmount => &mut report.negative_amount_lines,
            };
            bucket.push(line.line_id.clone());
        }
    }

    if report.malformed_count() > 0 {
        log::warn!(
            "{} malformed declaration line(s) excluded from ratio computations",
            report.malformed_count()
        );
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Period;
    use rust_decimal_macros::dec;

    fn line(id: &str, declared: Decimal, assessed: Decimal) -> DeclarationLine {
        DeclarationLine {
            line_id: id.into(),
            period: Period::year(2024),
            declared_hs_code: None,
            assessed_hs_code: None,
            origin_country: None,
            customs_office: None,
            importer_id: None,
            importer_name: None,
            declared_unit_value_usd: declared,
            assessed_unit_value_usd: assessed,
            declared_invoice_value_usd: dec!(100),
            assessed_invoice_value_usd: dec!(100),
            tax_amount: dec!(10),
            is_deleted: false,
        }
    }

    #[test]
    fn test_clean_lines_have_no_issues() {
        let lines = vec![line("a", dec!(1), dec!(1)), line("b", dec!(2), dec!(3))];
        let r = assess_data_quality(&lines);
        assert_eq!(r.total_lines, 2);
        assert_eq!(r.active_lines, 2);
        assert_eq!(r.ratio_eligible_lines, 2);
        assert_eq!(r.malformed_count(), 0);
        assert!(r.warnings().is_empty());
    }

    #[test]
    fn test_issue_tallies() {
        let mut deleted = line("d", dec!(-5), dec!(1));
        deleted.is_deleted = true;
        let mut negative_tax = line("t", dec!(1), dec!(1));
        negative_tax.tax_amount = dec!(-3);
        let lines = vec![
            line("neg", dec!(-1), dec!(2)),
            line("zero", Decimal::ZERO, dec!(2)),
            negative_tax,
            deleted,
        ];
        let r = assess_data_quality(&lines);
        assert_eq!(r.total_lines, 4);
        assert_eq!(r.deleted_lines, 1);
        assert_eq!(r.active_lines, 3);
        assert_eq!(r.ratio_eligible_lines, 1);
        assert_eq!(r.negative_unit_value_lines, vec!["neg".to_string()]);
        assert_eq!(r.zero_declared_unit_value_lines, vec!["zero".to_string()]);
        assert_eq!(r.negative_amount_lines, vec!["t".to_string()]);
        assert_eq!(r.malformed_count(), 2);
        assert_eq!(r.warnings().len(), 3);
    }
}
