//! Customs declaration line items.
//!
//! One [`DeclarationLine`] is one item of one declaration as held in the
//! unit-price table: the importer's declared HS code and values next to the
//! customs-assessed ones. All arithmetic uses `rust_decimal::Decimal`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Money, Period};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclarationLine {
    pub line_id: String,
    pub period: Period,
    #[serde(default)]
    pub declared_hs_code: Option<String>,
    #[serde(default)]
    pub assessed_hs_code: Option<String>,
    #[serde(default)]
    pub origin_country: Option<String>,
    #[serde(default)]
    pub customs_office: Option<String>,
    #[serde(default)]
    pub importer_id: Option<String>,
    #[serde(default)]
    pub importer_name: Option<String>,
    pub declared_unit_value_usd: Money,
    pub assessed_unit_value_usd: Money,
    pub declared_invoice_value_usd: Money,
    pub assessed_invoice_value_usd: Money,
    pub tax_amount: Money,
    #[serde(default)]
    pub is_deleted: bool,
}

/// Blank strings count as missing.
fn present(field: &Option<String>) -> Option<&str> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn prefix(code: &str, len: usize) -> String {
    code.chars().take(len).collect()
}

impl DeclarationLine {
    /// Lines flagged as deleted never reach any aggregation.
    pub fn is_active(&self) -> bool {
        !self.is_deleted
    }

    pub fn declared_hs(&self) -> Option<&str> {
        present(&self.declared_hs_code)
    }

    pub fn assessed_hs(&self) -> Option<&str> {
        present(&self.assessed_hs_code)
    }

    /// The classification a line is reported under: its assessed HS code.
    pub fn classification(&self) -> Option<&str> {
        self.assessed_hs()
    }

    /// Leading `len` digits of the classification (2 = chapter, 4 = heading).
    pub fn classification_prefix(&self, len: usize) -> Option<String> {
        self.classification().map(|c| prefix(c, len))
    }

    pub fn declared_prefix(&self, len: usize) -> Option<String> {
        self.declared_hs().map(|c| prefix(c, len))
    }

    pub fn origin(&self) -> Option<&str> {
        present(&self.origin_country)
    }

    pub fn office(&self) -> Option<&str> {
        present(&self.customs_office)
    }

    pub fn importer(&self) -> Option<&str> {
        present(&self.importer_id)
    }

    pub fn importer_display_name(&self) -> Option<&str> {
        present(&self.importer_name)
    }

    /// Unit values must be non-negative to take part in any ratio.
    pub fn has_valid_unit_values(&self) -> bool {
        self.declared_unit_value_usd >= Decimal::ZERO
            && self.assessed_unit_value_usd >= Decimal::ZERO
    }

    /// Eligible for assessed/declared ratios: active, well-formed, and a
    /// positive declared unit value to divide by.
    pub fn declared_ratio_eligible(&self) -> bool {
        self.is_active()
            && self.has_valid_unit_values()
            && self.declared_unit_value_usd > Decimal::ZERO
    }

    /// Mirror of [`declared_ratio_eligible`](Self::declared_ratio_eligible)
    /// with the assessed unit value as denominator.
    pub fn assessed_ratio_eligible(&self) -> bool {
        self.is_active()
            && self.has_valid_unit_values()
            && self.assessed_unit_value_usd > Decimal::ZERO
    }

    /// Declared and assessed HS codes both present and different.
    pub fn is_reclassified(&self) -> bool {
        match (self.declared_hs(), self.assessed_hs()) {
            (Some(d), Some(a)) => d != a,
            _ => false,
        }
    }

    /// Assessed minus declared invoice value.
    pub fn invoice_gap_usd(&self) -> Money {
        self.assessed_invoice_value_usd - self.declared_invoice_value_usd
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line() -> DeclarationLine {
        DeclarationLine {
            line_id: "L1".into(),
            period: Period::month(2024, 5),
            declared_hs_code: Some("85181000".into()),
            assessed_hs_code: Some("85182200".into()),
            origin_country: Some("CN".into()),
            customs_office: Some("DAR".into()),
            importer_id: Some("TIN-1".into()),
            importer_name: Some("Acme Traders".into()),
            declared_unit_value_usd: dec!(10),
            assessed_unit_value_usd: dec!(14),
            declared_invoice_value_usd: dec!(1000),
            assessed_invoice_value_usd: dec!(1400),
            tax_amount: dec!(250),
            is_deleted: false,
        }
    }

    #[test]
    fn test_blank_fields_are_missing() {
        let mut l = line();
        l.origin_country = Some("   ".into());
        l.importer_id = None;
        assert_eq!(l.origin(), None);
        assert_eq!(l.importer(), None);
    }

    #[test]
    fn test_classification_prefixes() {
        let l = line();
        assert_eq!(l.classification_prefix(2).as_deref(), Some("85"));
        assert_eq!(l.classification_prefix(4).as_deref(), Some("8518"));
        assert_eq!(l.declared_prefix(6).as_deref(), Some("851810"));
    }

    #[test]
    fn test_reclassified_requires_both_codes() {
        let mut l = line();
        assert!(l.is_reclassified());
        l.declared_hs_code = None;
        assert!(!l.is_reclassified());
        l.declared_hs_code = Some("85182200".into());
        assert!(!l.is_reclassified());
    }

    #[test]
    fn test_zero_declared_value_not_ratio_eligible() {
        let mut l = line();
        l.declared_unit_value_usd = Decimal::ZERO;
        assert!(!l.declared_ratio_eligible());
        assert!(l.assessed_ratio_eligible());
    }

    #[test]
    fn test_negative_unit_value_not_ratio_eligible() {
        let mut l = line();
        l.assessed_unit_value_usd = dec!(-1);
        assert!(!l.declared_ratio_eligible());
        assert!(!l.assessed_ratio_eligible());
    }

    #[test]
    fn test_deleted_not_ratio_eligible() {
        let mut l = line();
        l.is_deleted = true;
        assert!(!l.is_active());
        assert!(!l.declared_ratio_eligible());
    }

    #[test]
    fn test_invoice_gap() {
        assert_eq!(line().invoice_gap_usd(), dec!(400));
    }
}
