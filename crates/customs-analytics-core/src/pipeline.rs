//! Full analysis over one snapshot of declaration lines.
//!
//! Every stage reads the same immutable input; the report is a pure function
//! of `(lines, config, supplied KPI metrics)`.

use serde::{Deserialize, Serialize};

use crate::aggregation::{
    aggregate, grand_total, growth_series, AggregateBucket, Dimension, GrowthPoint, Supported,
};
use crate::anomaly::{
    detect_price_outliers, detect_reclassification, price_variance_report,
    reclassification_report, screen_lines, undervaluation_by_group, valuation_stats_by_period,
    AnomalyFinding, LineScreening, PeriodValuationStats, PriceVarianceReport,
    ReclassificationReport, UndervaluationGroup,
};
use crate::concentration::{analyze_concentration, ConcentrationResult};
use crate::config::AnalysisConfig;
use crate::declarations::{assess_data_quality, DataQualityReport, DeclarationLine};
use crate::kpi::evaluator::latest_year;
use crate::kpi::{evaluate, KpiInputs, KpiResult};
use crate::risk::{classification_origin_counts, importer_counts, rank_risk, RiskRanking};
use crate::summary::{summarize, ExecutiveSummary, SummaryInputs};
use crate::types::ValueField;
use crate::CustomsResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub analysis_year: Option<i32>,
    pub data_quality: DataQualityReport,
    pub totals: AggregateBucket,
    pub by_year: Vec<AggregateBucket>,
    pub by_month: Vec<AggregateBucket>,
    pub yearly_growth: Vec<GrowthPoint>,
    /// Tax concentration by HS chapter.
    pub commodity_concentration: ConcentrationResult,
    pub country_concentration: ConcentrationResult,
    pub importer_concentration: ConcentrationResult,
    pub valuation_by_year: Vec<PeriodValuationStats>,
    pub screening: LineScreening,
    pub undervaluation_groups: Supported<UndervaluationGroup>,
    pub price_variance: PriceVarianceReport,
    pub reclassification: ReclassificationReport,
    /// Price-outlier and reclassification-pair findings.
    pub group_findings: Vec<AnomalyFinding>,
    pub group_risk: RiskRanking,
    pub importer_risk: RiskRanking,
    pub kpi_inputs: KpiInputs,
    pub kpis: Vec<KpiResult>,
    pub summary: ExecutiveSummary,
}

/// Run every analysis with the metrics derivable from the lines alone.
pub fn run_analysis(lines: &[DeclarationLine], config: &AnalysisConfig) -> CustomsResult<AnalysisReport> {
    run_analysis_with_inputs(lines, config, &KpiInputs::new())
}

/// Run every analysis; `supplied` KPI metrics override derived ones of the
/// same key and fill the ones the data cannot provide.
pub fn run_analysis_with_inputs(
    lines: &[DeclarationLine],
    config: &AnalysisConfig,
    supplied: &KpiInputs,
) -> CustomsResult<AnalysisReport> {
    config.validate()?;
    log::debug!("analysis started over {} line(s)", lines.len());

    let data_quality = assess_data_quality(lines);
    let analysis_year = config.analysis_year.or_else(|| latest_year(lines));

    // Aggregation
    let totals = grand_total(lines);
    let by_year = aggregate(lines, &[Dimension::Year]);
    let by_month = aggregate(lines, &[Dimension::Month]);
    let yearly_growth = growth_series(&by_year, ValueField::Tax);

    // Concentration
    let options = config.concentration_options(ValueField::Tax);
    let chapter = Dimension::Classification {
        prefix_len: config.chapter_prefix_len,
    };
    let commodity_concentration = analyze_concentration(&aggregate(lines, &[chapter]), &options)?;
    let country_concentration =
        analyze_concentration(&aggregate(lines, &[Dimension::OriginCountry]), &options)?;
    let importer_concentration =
        analyze_concentration(&aggregate(lines, &[Dimension::Importer]), &options)?;
    log::debug!("aggregation and concentration done");

    // Anomalies
    let valuation_by_year = valuation_stats_by_period(lines, config.under_threshold)?;
    let screening = screen_lines(lines, config.under_threshold, config.over_threshold)?;
    let undervaluation_groups = undervaluation_by_group(
        lines,
        config.under_threshold,
        config.undervaluation_min_group_size,
    )?;
    let price_variance = price_variance_report(lines, config.price_outlier_min_group_size);
    let levels = config.hs_levels();
    let reclassification =
        reclassification_report(lines, config.reclass_min_group_size, levels);
    let mut group_findings = detect_price_outliers(lines, config.price_outlier_min_group_size);
    group_findings.extend(detect_reclassification(
        lines,
        config.reclass_min_group_size,
        levels,
    ));
    log::debug!(
        "anomaly screening done: {} line finding(s), {} group finding(s)",
        screening.findings.len(),
        group_findings.len()
    );

    // Risk
    let group_risk = rank_risk(
        &classification_origin_counts(lines, config.heading_prefix_len, config.under_threshold)?,
        &config.risk_weights,
        &config.risk_tiers,
        &config.group_support,
        config.top_n,
    )?;
    let importer_risk = rank_risk(
        &importer_counts(lines, config.under_threshold)?,
        &config.risk_weights,
        &config.risk_tiers,
        &config.importer_support,
        config.top_n,
    )?;

    // KPIs
    let mut kpi_inputs = KpiInputs::from_analysis(lines, config)?;
    kpi_inputs.extend(supplied);
    let kpis = evaluate(&config.kpi_catalog, &kpi_inputs)?;

    let summary = summarize(&SummaryInputs {
        config,
        analysis_year,
        totals: &totals,
        kpi_inputs: &kpi_inputs,
        commodity_concentration: &commodity_concentration,
        country_concentration: &country_concentration,
        screening: &screening,
        group_risk: &group_risk,
        importer_risk: &importer_risk,
        kpis: &kpis,
    });
    log::debug!(
        "analysis finished: {} high-risk group(s), {}/{} KPI(s) met",
        summary.risk_tier_counts.high,
        summary.kpis.met,
        summary.kpis.total
    );

    Ok(AnalysisReport {
        analysis_year,
        data_quality,
        totals,
        by_year,
        by_month,
        yearly_growth,
        commodity_concentration,
        country_concentration,
        importer_concentration,
        valuation_by_year,
        screening,
        undervaluation_groups,
        price_variance,
        reclassification,
        group_findings,
        group_risk,
        importer_risk,
        kpi_inputs,
        kpis,
        summary,
    })
}
