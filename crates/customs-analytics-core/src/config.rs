//! Analysis configuration.
//!
//! Every threshold the analyses use lives here with its default, so a JSON
//! (or YAML, through the CLI) document only needs the fields it overrides.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::anomaly::valuation::validate_ratio_threshold;
use crate::anomaly::HsLevels;
use crate::concentration::{AbcThresholds, ConcentrationOptions};
use crate::error::CustomsAnalyticsError;
use crate::kpi::KpiCatalog;
use crate::risk::{RiskTierThresholds, RiskWeights, SupportPolicy};
use crate::types::ValueField;
use crate::CustomsResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Assessed / declared unit value ratio at which a line is undervalued.
    pub under_threshold: Decimal,
    /// Declared / assessed unit value ratio at which a line is overvalued.
    pub over_threshold: Decimal,
    pub price_outlier_min_group_size: u64,
    pub reclass_min_group_size: u64,
    pub undervaluation_min_group_size: u64,
    /// Support for (HS heading, origin) risk groups.
    pub group_support: SupportPolicy,
    pub importer_support: SupportPolicy,
    pub top_n: usize,
    pub risk_weights: RiskWeights,
    pub risk_tiers: RiskTierThresholds,
    pub abc_thresholds: AbcThresholds,
    pub heading_prefix_len: usize,
    pub chapter_prefix_len: usize,
    pub concentration_min_support: u64,
    /// Year the KPIs and summary focus on; latest year in the data when unset.
    pub analysis_year: Option<i32>,
    pub kpi_catalog: KpiCatalog,
    /// Display names by HS code or prefix.
    pub hs_names: BTreeMap<String, String>,
    /// Display names by ISO country code.
    pub country_names: BTreeMap<String, String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            under_threshold: dec!(1.3),
            over_threshold: dec!(1.3),
            price_outlier_min_group_size: 50,
            reclass_min_group_size: 10,
            undervaluation_min_group_size: 10,
            group_support: SupportPolicy::group_default(),
            importer_support: SupportPolicy::importer_default(),
            top_n: 20,
            risk_weights: RiskWeights::default(),
            risk_tiers: RiskTierThresholds::default(),
            abc_thresholds: AbcThresholds::default(),
            heading_prefix_len: 4,
            chapter_prefix_len: 2,
            concentration_min_support: 1,
            analysis_year: None,
            kpi_catalog: KpiCatalog::default(),
            hs_names: BTreeMap::new(),
            country_names: BTreeMap::new(),
        }
    }
}

fn invalid(field: &str, reason: &str) -> CustomsAnalyticsError {
    CustomsAnalyticsError::InvalidConfig {
        field: field.into(),
        reason: reason.into(),
    }
}

impl AnalysisConfig {
    /// Parse from JSON; absent fields take their defaults.
    pub fn from_json_str(json: &str) -> CustomsResult<Self> {
        let config: AnalysisConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CustomsResult<()> {
        validate_ratio_threshold("under_threshold", self.under_threshold)?;
        validate_ratio_threshold("over_threshold", self.over_threshold)?;
        if self.top_n == 0 {
            return Err(invalid("top_n", "must be at least 1"));
        }
        if !(1..=10).contains(&self.heading_prefix_len) {
            return Err(invalid("heading_prefix_len", "must be between 1 and 10"));
        }
        if !(1..=10).contains(&self.chapter_prefix_len) {
            return Err(invalid("chapter_prefix_len", "must be between 1 and 10"));
        }
        self.risk_weights.validate()?;
        self.risk_tiers.validate()?;
        self.abc_thresholds.validate()?;
        self.kpi_catalog.validate()?;
        Ok(())
    }

    /// Concentration options for ranking by `value_field`.
    pub fn concentration_options(&self, value_field: ValueField) -> ConcentrationOptions {
        ConcentrationOptions {
            value_field,
            top_n: self.top_n,
            min_support: self.concentration_min_support,
            abc: self.abc_thresholds.clone(),
        }
    }

    /// Heading and chapter prefix lengths for HS code comparisons.
    pub fn hs_levels(&self) -> HsLevels {
        HsLevels {
            heading_len: self.heading_prefix_len,
            chapter_len: self.chapter_prefix_len,
        }
    }

    /// Display name for an HS code, trying the longest configured prefix first.
    pub fn hs_label(&self, code: &str) -> Option<&str> {
        (1..=code.len())
            .rev()
            .filter(|&n| code.is_char_boundary(n))
            .find_map(|n| self.hs_names.get(&code[..n]))
            .map(String::as_str)
    }

    pub fn country_label(&self, code: &str) -> Option<&str> {
        self.country_names.get(code).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let c = AnalysisConfig::default();
        assert!(c.validate().is_ok());
        assert_eq!(c.under_threshold, dec!(1.3));
        assert_eq!(c.group_support.min_flag_count, 10);
        assert_eq!(c.importer_support.min_total_count, 20);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let c = AnalysisConfig::from_json_str(r#"{"under_threshold": "1.5", "top_n": 5}"#).unwrap();
        assert_eq!(c.under_threshold, dec!(1.5));
        assert_eq!(c.top_n, 5);
        assert_eq!(c.price_outlier_min_group_size, 50);
        assert_eq!(c.kpi_catalog.definitions.len(), 16);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(AnalysisConfig::from_json_str(r#"{"under_threshold": "0"}"#).is_err());
        assert!(AnalysisConfig::from_json_str(r#"{"top_n": 0}"#).is_err());
        assert!(
            AnalysisConfig::from_json_str(r#"{"abc_thresholds": {"a": "0.9", "b": "0.8"}}"#)
                .is_err()
        );
        assert!(AnalysisConfig::from_json_str("{not json").is_err());
    }

    #[test]
    fn test_hs_label_longest_prefix() {
        let mut c = AnalysisConfig::default();
        c.hs_names.insert("85".into(), "Electrical machinery".into());
        c.hs_names.insert("8518".into(), "Loudspeakers".into());
        assert_eq!(c.hs_label("85181000"), Some("Loudspeakers"));
        assert_eq!(c.hs_label("85299000"), Some("Electrical machinery"));
        assert_eq!(c.hs_label("39"), None);
    }
}
