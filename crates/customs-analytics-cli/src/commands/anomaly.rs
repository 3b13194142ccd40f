use clap::Args;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::time::Instant;

use customs_analytics_core::anomaly::{
    detect_overvaluation, detect_price_outliers, detect_reclassification,
    detect_undervaluation, price_variance_report, reclassification_report, screen_lines,
    undervaluation_by_group, valuation_stats_by_period,
};
use customs_analytics_core::AnalysisConfig;

use super::envelope;
use crate::input;

/// Arguments for under/overvaluation detection
#[derive(Args)]
pub struct ValuationArgs {
    /// Path to JSON or CSV declaration lines (stdin JSON when omitted)
    #[arg(long)]
    pub input: Option<String>,

    /// Unit value ratio threshold (overrides config)
    #[arg(long)]
    pub threshold: Option<Decimal>,

    /// Group flagged lines by (HS code, origin) instead of listing them
    #[arg(long)]
    pub grouped: bool,
}

/// Arguments for price outlier detection
#[derive(Args)]
pub struct PriceOutlierArgs {
    /// Path to JSON or CSV declaration lines (stdin JSON when omitted)
    #[arg(long)]
    pub input: Option<String>,

    /// Minimum observations per HS code (overrides config)
    #[arg(long)]
    pub min_group_size: Option<u64>,
}

/// Arguments for reclassification analysis
#[derive(Args)]
pub struct ReclassificationArgs {
    /// Path to JSON or CSV declaration lines (stdin JSON when omitted)
    #[arg(long)]
    pub input: Option<String>,

    /// Minimum occurrences per code pair (overrides config)
    #[arg(long)]
    pub min_group_size: Option<u64>,
}

/// Arguments for per-line screening
#[derive(Args)]
pub struct ScreenArgs {
    /// Path to JSON or CSV declaration lines (stdin JSON when omitted)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_undervaluation(args: ValuationArgs, config: &AnalysisConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let lines = input::lines::read_lines(args.input.as_deref())?;
    let threshold = args.threshold.unwrap_or(config.under_threshold);

    let result = if args.grouped {
        let groups =
            undervaluation_by_group(&lines, threshold, config.undervaluation_min_group_size)?;
        json!({
            "groups": groups.retained,
            "excluded_groups": groups.excluded_groups,
            "by_year": valuation_stats_by_period(&lines, threshold)?,
        })
    } else {
        json!({ "findings": detect_undervaluation(&lines, threshold)? })
    };

    envelope(
        "Undervalued when assessed unit value >= declared x threshold (declared > 0)",
        &json!({
            "threshold": threshold,
            "min_group_size": config.undervaluation_min_group_size,
        }),
        &lines,
        start,
        result,
    )
}

pub fn run_overvaluation(args: ValuationArgs, config: &AnalysisConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let lines = input::lines::read_lines(args.input.as_deref())?;
    let threshold = args.threshold.unwrap_or(config.over_threshold);
    if args.grouped {
        return Err("--grouped is only available for undervaluation".into());
    }

    envelope(
        "Overvalued when declared unit value >= assessed x threshold (assessed > 0)",
        &json!({ "threshold": threshold }),
        &lines,
        start,
        json!({ "findings": detect_overvaluation(&lines, threshold)? }),
    )
}

pub fn run_price_outliers(args: PriceOutlierArgs, config: &AnalysisConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let lines = input::lines::read_lines(args.input.as_deref())?;
    let min = args.min_group_size.unwrap_or(config.price_outlier_min_group_size);

    let report = price_variance_report(&lines, min);
    envelope(
        "Flag HS codes whose assessed unit-value standard deviation exceeds the mean",
        &json!({ "min_group_size": min }),
        &lines,
        start,
        json!({
            "groups": report.groups,
            "flagged_groups": report.flagged_groups,
            "excluded_groups": report.excluded_groups,
            "findings": detect_price_outliers(&lines, min),
        }),
    )
}

pub fn run_reclassification(args: ReclassificationArgs, config: &AnalysisConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let lines = input::lines::read_lines(args.input.as_deref())?;
    let min = args.min_group_size.unwrap_or(config.reclass_min_group_size);

    let report = reclassification_report(&lines, min, config.hs_levels());
    envelope(
        "Declared vs assessed HS code pairs, most frequent first",
        &json!({ "min_group_size": min, "levels": config.hs_levels() }),
        &lines,
        start,
        json!({
            "pairs": report.pairs,
            "total_reclassified_lines": report.total_reclassified_lines,
            "excluded_pairs": report.excluded_pairs,
            "findings": detect_reclassification(&lines, min, config.hs_levels()),
        }),
    )
}

pub fn run_screen(args: ScreenArgs, config: &AnalysisConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let lines = input::lines::read_lines(args.input.as_deref())?;
    let screening = screen_lines(&lines, config.under_threshold, config.over_threshold)?;

    envelope(
        "Per-line undervaluation, overvaluation and reclassification findings",
        &json!({
            "under_threshold": config.under_threshold,
            "over_threshold": config.over_threshold,
        }),
        &lines,
        start,
        screening,
    )
}
