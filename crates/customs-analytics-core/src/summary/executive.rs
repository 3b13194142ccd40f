//! Executive summary: a projection of already-computed analyses.
//!
//! Nothing here recomputes an aggregate; it only picks headline figures and
//! top rankings and attaches display labels from the configured name tables.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::aggregation::{AggregateBucket, GroupKey};
use crate::anomaly::LineScreening;
use crate::concentration::ConcentrationResult;
use crate::config::AnalysisConfig;
use crate::kpi::evaluator::{
    HHI_COMMODITY, HHI_COUNTRY, MONTHLY_TAX_CV_PCT, REVENUE_GROWTH_PCT, UNDERVALUATION_RATE_PCT,
};
use crate::kpi::{tally, KpiInputs, KpiResult, KpiTally};
use crate::risk::{RiskProfile, RiskRanking, RiskTier, TierCounts};
use crate::types::{Money, Percent};

/// Borrowed views of the analyses a summary is projected from.
#[derive(Debug, Clone, Copy)]
pub struct SummaryInputs<'a> {
    pub config: &'a AnalysisConfig,
    pub analysis_year: Option<i32>,
    pub totals: &'a AggregateBucket,
    pub kpi_inputs: &'a KpiInputs,
    pub commodity_concentration: &'a ConcentrationResult,
    pub country_concentration: &'a ConcentrationResult,
    pub screening: &'a LineScreening,
    pub group_risk: &'a RiskRanking,
    pub importer_risk: &'a RiskRanking,
    pub kpis: &'a [KpiResult],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryEntry {
    pub rank: usize,
    pub key: String,
    pub label: Option<String>,
    pub value: Decimal,
    pub risk_tier: Option<RiskTier>,
}

/// Headline figures of one analysis.
///
/// Totals, counts, rankings and screening cover every year in the input.
/// Growth, volatility, HHI and the undervaluation rate are the KPI inputs
/// and cover `analysis_year` only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutiveSummary {
    pub analysis_year: Option<i32>,
    pub total_lines: u64,
    pub total_tax: Money,
    pub total_declared_value_usd: Money,
    pub total_assessed_value_usd: Money,
    /// Distinct HS chapters across all years.
    pub hs_chapters: usize,
    /// Distinct origin countries across all years.
    pub countries: usize,
    /// Tax growth of `analysis_year` over the previous year present.
    pub yoy_growth_pct: Option<Percent>,
    /// Month-to-month tax CV within `analysis_year`.
    pub monthly_tax_cv_pct: Option<Percent>,
    /// Chapter HHI within `analysis_year`.
    pub hhi_commodity: Option<Decimal>,
    /// Origin HHI within `analysis_year`.
    pub hhi_country: Option<Decimal>,
    pub undervaluation_rate_pct: Option<Percent>,
    pub flagged_lines: u64,
    pub flagged_pct: Option<Percent>,
    pub estimated_loss_usd: Money,
    /// Highest risk scores by importer.
    pub top_importers: Vec<SummaryEntry>,
    /// Highest risk scores by (HS heading, origin).
    pub top_risk_groups: Vec<SummaryEntry>,
    /// Largest HS chapters by tax across all years.
    pub top_classifications: Vec<SummaryEntry>,
    pub risk_tier_counts: TierCounts,
    pub kpis: KpiTally,
}

fn risk_label(config: &AnalysisConfig, key: &GroupKey) -> Option<String> {
    let hs = key.part(0).and_then(|c| config.hs_label(c));
    let country = key.part(1).and_then(|c| config.country_label(c));
    match (hs, country) {
        (None, None) => None,
        (hs, country) => Some(format!(
            "{} / {}",
            hs.or(key.part(0)).unwrap_or("(none)"),
            country.or(key.part(1)).unwrap_or("(none)")
        )),
    }
}

fn risk_entries<F>(profiles: &[RiskProfile], top_n: usize, label: F) -> Vec<SummaryEntry>
where
    F: Fn(&RiskProfile) -> Option<String>,
{
    profiles
        .iter()
        .take(top_n)
        .enumerate()
        .map(|(i, p)| SummaryEntry {
            rank: i + 1,
            key: p.group_key.to_string(),
            label: label(p),
            value: p.risk_score,
            risk_tier: Some(p.risk_tier),
        })
        .collect()
}

/// Build the headline view. The result is a pure function of `inputs`.
pub fn summarize(inputs: &SummaryInputs<'_>) -> ExecutiveSummary {
    let config = inputs.config;
    let top_n = config.top_n;

    let top_classifications = inputs
        .commodity_concentration
        .ranked
        .iter()
        .take(top_n)
        .map(|r| SummaryEntry {
            rank: r.rank,
            key: r.group_key.to_string(),
            label: r.group_key.part(0).and_then(|c| config.hs_label(c)).map(String::from),
            value: r.value,
            risk_tier: None,
        })
        .collect();

    let mut risk_tier_counts = inputs.group_risk.tier_counts;
    let importer_tiers = inputs.importer_risk.tier_counts;
    risk_tier_counts.high += importer_tiers.high;
    risk_tier_counts.medium += importer_tiers.medium;
    risk_tier_counts.low += importer_tiers.low;
    risk_tier_counts.normal += importer_tiers.normal;

    ExecutiveSummary {
        analysis_year: inputs.analysis_year,
        total_lines: inputs.totals.count,
        total_tax: inputs.totals.total_tax,
        total_declared_value_usd: inputs.totals.total_declared_value,
        total_assessed_value_usd: inputs.totals.total_assessed_value,
        hs_chapters: inputs.commodity_concentration.total_groups
            + inputs.commodity_concentration.excluded_groups,
        countries: inputs.country_concentration.total_groups
            + inputs.country_concentration.excluded_groups,
        yoy_growth_pct: inputs.kpi_inputs.get(REVENUE_GROWTH_PCT),
        monthly_tax_cv_pct: inputs.kpi_inputs.get(MONTHLY_TAX_CV_PCT),
        hhi_commodity: inputs.kpi_inputs.get(HHI_COMMODITY),
        hhi_country: inputs.kpi_inputs.get(HHI_COUNTRY),
        undervaluation_rate_pct: inputs.kpi_inputs.get(UNDERVALUATION_RATE_PCT),
        flagged_lines: inputs.screening.flagged_lines,
        flagged_pct: inputs.screening.flagged_pct,
        estimated_loss_usd: inputs.screening.estimated_loss_usd,
        top_importers: risk_entries(&inputs.importer_risk.ranked, top_n, |p| p.label.clone()),
        top_risk_groups: risk_entries(&inputs.group_risk.ranked, top_n, |p| {
            risk_label(config, &p.group_key)
        }),
        top_classifications,
        risk_tier_counts,
        kpis: tally(inputs.kpis),
    }
}
