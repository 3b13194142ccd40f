use clap::Args;
use serde_json::{json, Value};
use std::time::Instant;

use customs_analytics_core::kpi::{evaluate, tally, KpiCatalog, KpiInputs};
use customs_analytics_core::AnalysisConfig;

use super::envelope;
use crate::input;

/// Arguments for the KPI scorecard
#[derive(Args)]
pub struct KpiArgs {
    /// Path to JSON or CSV declaration lines (stdin JSON when omitted)
    #[arg(long)]
    pub input: Option<String>,

    /// Path to a JSON file of extra metric values, e.g. {"avg_clearance_time_hours": "9.5"}
    #[arg(long)]
    pub metrics: Option<String>,

    /// Year to evaluate (overrides config; latest year in the data by default)
    #[arg(long)]
    pub year: Option<i32>,
}

/// Arguments for printing the catalog
#[derive(Args)]
pub struct CatalogArgs {
    /// Validate and print this catalog file instead of the configured one
    #[arg(long)]
    pub file: Option<String>,
}

/// Caller-supplied KPI metrics, empty when no file is given.
pub fn read_metrics(path: Option<&str>) -> Result<KpiInputs, Box<dyn std::error::Error>> {
    match path {
        Some(p) => input::file::read_json(p),
        None => Ok(KpiInputs::new()),
    }
}

pub fn run_kpis(args: KpiArgs, config: &AnalysisConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let lines = input::lines::read_lines(args.input.as_deref())?;
    let supplied = read_metrics(args.metrics.as_deref())?;

    let mut config = config.clone();
    if args.year.is_some() {
        config.analysis_year = args.year;
    }
    let mut inputs = KpiInputs::from_analysis(&lines, &config)?;
    inputs.extend(&supplied);
    let results = evaluate(&config.kpi_catalog, &inputs)?;

    envelope(
        "WCO PMM scorecard: Excellent at target, Good at benchmark, direction-aware",
        &json!({
            "catalog_version": config.kpi_catalog.version,
            "analysis_year": config.analysis_year,
        }),
        &lines,
        start,
        json!({
            "kpis": results,
            "tally": tally(&results),
            "inputs": inputs,
        }),
    )
}

pub fn run_catalog(args: CatalogArgs, config: &AnalysisConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let catalog = match args.file {
        Some(ref path) => KpiCatalog::from_json_str(&input::file::read_text(path)?)?,
        None => config.kpi_catalog.clone(),
    };
    Ok(json!({
        "version": catalog.version,
        "definitions": catalog.definitions,
    }))
}
