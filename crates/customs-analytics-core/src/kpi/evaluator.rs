//! KPI evaluation against benchmarks and targets.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::catalog::{Direction, KpiCatalog, KpiCategory};
use crate::aggregation::{aggregate, growth_series, volatility, Dimension};
use crate::anomaly::valuation_stats_by_period;
use crate::concentration::analyze_concentration;
use crate::config::AnalysisConfig;
use crate::declarations::DeclarationLine;
use crate::types::ValueField;
use crate::CustomsResult;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

pub const REVENUE_GROWTH_PCT: &str = "revenue_growth_pct";
pub const MONTHLY_TAX_CV_PCT: &str = "monthly_tax_cv_pct";
pub const HHI_COMMODITY: &str = "hhi_commodity";
pub const HHI_COUNTRY: &str = "hhi_country";
pub const UNDERVALUATION_RATE_PCT: &str = "undervaluation_rate_pct";
pub const RECLASSIFICATION_RATE_PCT: &str = "reclassification_rate_pct";

/// Metric values by key. Missing keys are undefined metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KpiInputs {
    metrics: BTreeMap<String, Decimal>,
}

impl KpiInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Decimal) {
        self.metrics.insert(key.into(), value);
    }

    /// Insert only when the value is defined.
    pub fn insert_opt(&mut self, key: impl Into<String>, value: Option<Decimal>) {
        if let Some(v) = value {
            self.insert(key, v);
        }
    }

    pub fn get(&self, key: &str) -> Option<Decimal> {
        self.metrics.get(key).copied()
    }

    /// Caller-supplied metrics win over derived ones.
    pub fn extend(&mut self, other: &KpiInputs) {
        for (k, v) in &other.metrics {
            self.metrics.insert(k.clone(), *v);
        }
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Metrics the declaration data itself supplies, for `config.analysis_year`
    /// or the latest year present.
    ///
    /// Growth compares the year with the previous one; volatility, HHI and
    /// anomaly rates only look at active lines of that year. HHI honours the
    /// configured minimum support, so it matches the report's concentration.
    pub fn from_analysis(lines: &[DeclarationLine], config: &AnalysisConfig) -> CustomsResult<Self> {
        let mut inputs = KpiInputs::new();
        let Some(year) = config.analysis_year.or_else(|| latest_year(lines)) else {
            return Ok(inputs);
        };
        let year_key = format!("{year:04}");

        let yearly = aggregate(lines, &[Dimension::Year]);
        let growth = growth_series(&yearly, ValueField::Tax)
            .into_iter()
            .find(|p| p.period == year_key)
            .and_then(|p| p.growth_pct());
        inputs.insert_opt(REVENUE_GROWTH_PCT, growth);

        let in_year: Vec<DeclarationLine> = lines
            .iter()
            .filter(|l| l.is_active() && l.period.year == year)
            .cloned()
            .collect();

        let monthly = aggregate(&in_year, &[Dimension::Month]);
        inputs.insert_opt(
            MONTHLY_TAX_CV_PCT,
            volatility(&monthly, ValueField::Tax).coefficient_of_variation_pct,
        );

        // HHI over a year with no supported value is undefined, not zero
        let options = config.concentration_options(ValueField::Tax);
        let chapter = Dimension::Classification {
            prefix_len: config.chapter_prefix_len,
        };
        for (key, dim) in [(HHI_COMMODITY, chapter), (HHI_COUNTRY, Dimension::OriginCountry)] {
            let result = analyze_concentration(&aggregate(&in_year, &[dim]), &options)?;
            if result.total_value > Decimal::ZERO {
                inputs.insert(key, result.hhi);
            }
        }

        if let Some(stats) = valuation_stats_by_period(lines, config.under_threshold)?
            .into_iter()
            .find(|s| s.year == year)
        {
            inputs.insert(UNDERVALUATION_RATE_PCT, stats.undervaluation_rate_pct);
            inputs.insert(RECLASSIFICATION_RATE_PCT, stats.reclassification_rate_pct);
        }

        log::debug!("derived {} KPI input(s) for {year}", inputs.len());
        Ok(inputs)
    }
}

pub fn latest_year(lines: &[DeclarationLine]) -> Option<i32> {
    lines
        .iter()
        .filter(|l| l.is_active())
        .map(|l| l.period.year)
        .max()
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KpiStatus {
    Excellent,
    Good,
    NeedsImprovement,
    NoData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpiResult {
    pub code: String,
    pub name: String,
    pub category: KpiCategory,
    pub unit: String,
    pub direction: Direction,
    pub value: Option<Decimal>,
    pub benchmark: Decimal,
    pub target: Decimal,
    pub meets_target: bool,
    pub status: KpiStatus,
}

pub fn kpi_status(value: Option<Decimal>, benchmark: Decimal, target: Decimal, direction: Direction) -> KpiStatus {
    match value {
        None => KpiStatus::NoData,
        Some(v) if direction.reaches(v, target) => KpiStatus::Excellent,
        Some(v) if direction.reaches(v, benchmark) => KpiStatus::Good,
        Some(_) => KpiStatus::NeedsImprovement,
    }
}

/// Evaluate every catalog definition, in catalog order.
pub fn evaluate(catalog: &KpiCatalog, inputs: &KpiInputs) -> CustomsResult<Vec<KpiResult>> {
    catalog.validate()?;
    Ok(catalog
        .definitions
        .iter()
        .map(|d| {
            let value = inputs.get(&d.input);
            KpiResult {
                code: d.code.clone(),
                name: d.name.clone(),
                category: d.category,
                unit: d.unit.clone(),
                direction: d.direction,
                value,
                benchmark: d.benchmark,
                target: d.target,
                meets_target: value.map_or(false, |v| d.direction.reaches(v, d.target)),
                status: kpi_status(value, d.benchmark, d.target, d.direction),
            }
        })
        .collect())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpiTally {
    pub met: usize,
    pub total: usize,
    pub no_data: usize,
}

pub fn tally(results: &[KpiResult]) -> KpiTally {
    KpiTally {
        met: results.iter().filter(|r| r.meets_target).count(),
        total: results.len(),
        no_data: results.iter().filter(|r| r.status == KpiStatus::NoData).count(),
    }
}
