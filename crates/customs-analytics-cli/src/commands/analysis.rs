use clap::Args;
use serde_json::{json, Value};
use std::time::Instant;

use customs_analytics_core::declarations::assess_data_quality;
use customs_analytics_core::{run_analysis_with_inputs, AnalysisConfig};

use super::envelope;
use super::kpi::read_metrics;
use crate::input;

/// Arguments for the full pipeline and the executive summary
#[derive(Args)]
pub struct AnalyzeArgs {
    /// Path to JSON or CSV declaration lines (stdin JSON when omitted)
    #[arg(long)]
    pub input: Option<String>,

    /// Path to a JSON file of extra KPI metric values
    #[arg(long)]
    pub metrics: Option<String>,

    /// Year the KPIs and summary focus on (overrides config)
    #[arg(long)]
    pub year: Option<i32>,
}

/// Arguments for the data-quality report
#[derive(Args)]
pub struct QualityArgs {
    /// Path to JSON or CSV declaration lines (stdin JSON when omitted)
    #[arg(long)]
    pub input: Option<String>,
}

fn analysis_config(config: &AnalysisConfig, year: Option<i32>) -> AnalysisConfig {
    let mut config = config.clone();
    if year.is_some() {
        config.analysis_year = year;
    }
    config
}

pub fn run_analyze(args: AnalyzeArgs, config: &AnalysisConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let lines = input::lines::read_lines(args.input.as_deref())?;
    let supplied = read_metrics(args.metrics.as_deref())?;
    let config = analysis_config(config, args.year);

    let report = run_analysis_with_inputs(&lines, &config, &supplied)?;
    envelope(
        "Aggregation, concentration, valuation anomalies, risk scoring and KPI scorecard",
        &config,
        &lines,
        start,
        report,
    )
}

pub fn run_summary(args: AnalyzeArgs, config: &AnalysisConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let lines = input::lines::read_lines(args.input.as_deref())?;
    let supplied = read_metrics(args.metrics.as_deref())?;
    let config = analysis_config(config, args.year);

    let report = run_analysis_with_inputs(&lines, &config, &supplied)?;
    envelope(
        "Executive summary projected from the full analysis",
        &json!({
            "analysis_year": report.analysis_year,
            "top_n": config.top_n,
            "under_threshold": config.under_threshold,
        }),
        &lines,
        start,
        report.summary,
    )
}

pub fn run_quality(args: QualityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let lines = input::lines::read_lines(args.input.as_deref())?;
    let report = assess_data_quality(&lines);
    envelope(
        "Malformed lines are counted and excluded from ratios, never coerced",
        &json!({}),
        &lines,
        start,
        report,
    )
}
