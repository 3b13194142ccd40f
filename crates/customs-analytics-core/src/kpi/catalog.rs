//! KPI catalog based on the WCO Performance Measurement Model (PMM).
//!
//! The catalog is data: each definition names the input metric it consumes,
//! its benchmark and target, and whether higher or lower values are better.
//! The built-in catalog carries the 16 PMM indicators over four dimensions:
//! trade facilitation, revenue collection, risk management and organizational
//! development.

use std::collections::BTreeSet;
use std::fmt;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::CustomsAnalyticsError;
use crate::CustomsResult;

pub const DEFAULT_CATALOG_VERSION: &str = "wco-pmm-1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KpiCategory {
    TradeFacilitation,
    RevenueCollection,
    RiskManagement,
    Organizational,
}

impl fmt::Display for KpiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            KpiCategory::TradeFacilitation => "Trade Facilitation",
            KpiCategory::RevenueCollection => "Revenue Collection",
            KpiCategory::RiskManagement => "Risk Management",
            KpiCategory::Organizational => "Organizational",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    HigherIsBetter,
    LowerIsBetter,
}

impl Direction {
    /// Whether `value` reaches `goal` in this direction.
    pub fn reaches(&self, value: Decimal, goal: Decimal) -> bool {
        match self {
            Direction::HigherIsBetter => value >= goal,
            Direction::LowerIsBetter => value <= goal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpiDefinition {
    pub code: String,
    pub name: String,
    pub category: KpiCategory,
    pub unit: String,
    /// Metric key looked up in [`KpiInputs`](super::KpiInputs).
    pub input: String,
    pub benchmark: Decimal,
    pub target: Decimal,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpiCatalog {
    pub version: String,
    pub definitions: Vec<KpiDefinition>,
}

impl Default for KpiCatalog {
    fn default() -> Self {
        KpiCatalog::wco_pmm()
    }
}

#[allow(clippy::too_many_arguments)]
fn def(
    code: &str,
    name: &str,
    category: KpiCategory,
    unit: &str,
    input: &str,
    benchmark: Decimal,
    target: Decimal,
    direction: Direction,
) -> KpiDefinition {
    KpiDefinition {
        code: code.into(),
        name: name.into(),
        category,
        unit: unit.into(),
        input: input.into(),
        benchmark,
        target,
        direction,
    }
}

impl KpiCatalog {
    /// The 16-indicator PMM table.
    #[rustfmt::skip]
    pub fn wco_pmm() -> Self {
        use Direction::{HigherIsBetter as Higher, LowerIsBetter as Lower};
        use KpiCategory::*;

        let definitions = vec![
            // Trade facilitation
            def("TF001", "Average Clearance Time", TradeFacilitation, "hours",
                "avg_clearance_time_hours", dec!(24), dec!(12), Lower),
            def("TF002", "Pre-arrival Processing Rate", TradeFacilitation, "%",
                "pre_arrival_processing_pct", dec!(30), dec!(50), Higher),
            def("TF003", "Green Lane Rate", TradeFacilitation, "%",
                "green_lane_pct", dec!(70), dec!(85), Higher),
            def("TF004", "Electronic Declaration Rate", TradeFacilitation, "%",
                "electronic_declaration_pct", dec!(95), dec!(99), Higher),
            // Revenue collection
            def("RC001", "Collection Efficiency Ratio", RevenueCollection, "%",
                "collection_efficiency_pct", dec!(95), dec!(99), Higher),
            def("RC002", "Duty Assessment Accuracy", RevenueCollection, "%",
                "duty_assessment_accuracy_pct", dec!(90), dec!(95), Higher),
            def("RC003", "Post-clearance Audit Coverage", RevenueCollection, "%",
                "post_clearance_audit_coverage_pct", dec!(5), dec!(10), Higher),
            def("RC004", "Revenue Growth Rate", RevenueCollection, "%",
                "revenue_growth_pct", dec!(3), dec!(5), Higher),
            // Risk management and enforcement
            def("RM001", "Selectivity Rate", RiskManagement, "%",
                "selectivity_rate_pct", dec!(15), dec!(10), Lower),
            def("RM002", "Hit Rate", RiskManagement, "%",
                "hit_rate_pct", dec!(20), dec!(30), Higher),
            def("RM003", "Compliance Rate", RiskManagement, "%",
                "compliance_rate_pct", dec!(85), dec!(95), Higher),
            // a detection rate, so more is better
            def("RM004", "Undervaluation Detection Rate", RiskManagement, "%",
                "undervaluation_rate_pct", dec!(30), dec!(50), Higher),
            def("RM005", "HS Misclassification Rate", RiskManagement, "%",
                "reclassification_rate_pct", dec!(5), dec!(2), Lower),
            // Organizational development
            def("OD001", "HHI Concentration Index", Organizational, "index",
                "hhi_commodity", dec!(1500), dec!(1000), Lower),
            def("OD002", "MoM Volatility", Organizational, "%",
                "monthly_tax_cv_pct", dec!(15), dec!(10), Lower),
            def("OD003", "YoY Growth Consistency", Organizational, "score",
                "yoy_growth_consistency_score", dec!(3), dec!(4), Higher),
        ];

        KpiCatalog {
            version: DEFAULT_CATALOG_VERSION.into(),
            definitions,
        }
    }

    /// Parse a catalog from JSON and validate it.
    pub fn from_json_str(json: &str) -> CustomsResult<Self> {
        let catalog: KpiCatalog = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn validate(&self) -> CustomsResult<()> {
        let mut seen = BTreeSet::new();
        for d in &self.definitions {
            if d.code.trim().is_empty() {
                return Err(CustomsAnalyticsError::InvalidConfig {
                    field: "kpi_catalog.definitions.code".into(),
                    reason: "KPI code must not be blank".into(),
                });
            }
            if !seen.insert(d.code.as_str()) {
                return Err(CustomsAnalyticsError::InvalidConfig {
                    field: "kpi_catalog.definitions".into(),
                    reason: format!("duplicate KPI code '{}'", d.code),
                });
            }
        }
        Ok(())
    }

    pub fn get(&self, code: &str) -> Option<&KpiDefinition> {
        self.definitions.iter().find(|d| d.code == code)
    }

    pub fn by_category(&self, category: KpiCategory) -> impl Iterator<Item = &KpiDefinition> {
        self.definitions.iter().filter(move |d| d.category == category)
    }
}
