//! Anomaly findings and per-line screening.

use std::collections::BTreeSet;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::reclassification::detect_line_reclassifications;
use super::valuation::{detect_overvaluation, detect_undervaluation};
use crate::declarations::DeclarationLine;
use crate::types::{Money, Percent};
use crate::CustomsResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AnomalyKind {
    Undervaluation,
    Overvaluation,
    PriceOutlier,
    ReclassificationChange,
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AnomalyKind::Undervaluation => "undervaluation",
            AnomalyKind::Overvaluation => "overvaluation",
            AnomalyKind::PriceOutlier => "price_outlier",
            AnomalyKind::ReclassificationChange => "reclassification_change",
        };
        f.write_str(s)
    }
}

/// One evaluated condition on a line or a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyFinding {
    pub kind: AnomalyKind,
    /// Line id, or the display form of a group key.
    pub scope_key: String,
    /// Ratio or percentage, depending on `kind`.
    pub magnitude: Decimal,
    pub value_at_risk_usd: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineScreening {
    pub findings: Vec<AnomalyFinding>,
    pub screened_lines: u64,
    pub flagged_lines: u64,
    pub flagged_pct: Option<Percent>,
    pub undervaluation_count: u64,
    pub overvaluation_count: u64,
    pub reclassification_count: u64,
    /// Sum of positive invoice gaps on undervalued lines.
    pub estimated_loss_usd: Money,
}

/// Run every per-line detector and count lines carrying at least one finding.
pub fn screen_lines(
    lines: &[DeclarationLine],
    under_threshold: Decimal,
    over_threshold: Decimal,
) -> CustomsResult<LineScreening> {
    let under = detect_undervaluation(lines, under_threshold)?;
    let over = detect_overvaluation(lines, over_threshold)?;
    let reclass = detect_line_reclassifications(lines);

    let estimated_loss_usd: Money = under
        .iter()
        .map(|f| f.value_at_risk_usd.max(Decimal::ZERO))
        .sum();

    let flagged: BTreeSet<&str> = under
        .iter()
        .chain(over.iter())
        .chain(reclass.iter())
        .map(|f| f.scope_key.as_str())
        .collect();
    let flagged_lines = flagged.len() as u64;
    let screened_lines = lines.iter().filter(|l| l.is_active()).count() as u64;

    let (undervaluation_count, overvaluation_count, reclassification_count) =
        (under.len() as u64, over.len() as u64, reclass.len() as u64);

    let mut findings = under;
    findings.extend(over);
    findings.extend(reclass);

    log::debug!(
        "screened {screened_lines} line(s): {flagged_lines} flagged, {} finding(s)",
        findings.len()
    );

    Ok(LineScreening {
        findings,
        screened_lines,
        flagged_lines,
        flagged_pct: if screened_lines == 0 {
            None
        } else {
            Some(crate::types::percent_of(flagged_lines, screened_lines))
        },
        undervaluation_count,
        overvaluation_count,
        reclassification_count,
        estimated_loss_usd,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Period;
    use rust_decimal_macros::dec;

    fn line(id: &str, declared: Decimal, assessed: Decimal, reclass: bool) -> DeclarationLine {
        DeclarationLine {
            line_id: id.into(),
            period: Period::year(2024),
            declared_hs_code: Some(if reclass { "1111" } else { "2222" }.into()),
            assessed_hs_code: Some("2222".into()),
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

    #[test]
    fn test_screen_counts_each_line_once() {
        let lines = vec![
            line("under+reclass", dec!(100), dec!(200), true),
            line("over", dec!(200), dec!(100), false),
            line("clean", dec!(100), dec!(100), false),
            line("reclass", dec!(100), dec!(100), true),
        ];
        let s = screen_lines(&lines, dec!(1.3), dec!(1.3)).unwrap();
        assert_eq!(s.screened_lines, 4);
        assert_eq!(s.flagged_lines, 3);
        assert_eq!(s.flagged_pct, Some(dec!(75)));
        assert_eq!(s.findings.len(), 4);
        assert_eq!(s.undervaluation_count, 1);
        assert_eq!(s.overvaluation_count, 1);
        assert_eq!(s.reclassification_count, 2);
        assert_eq!(s.estimated_loss_usd, dec!(1000));
    }

    #[test]
    fn test_screen_empty_input() {
        let s = screen_lines(&[], dec!(1.3), dec!(1.3)).unwrap();
        assert_eq!(s.flagged_lines, 0);
        assert_eq!(s.flagged_pct, None);
    }
}
