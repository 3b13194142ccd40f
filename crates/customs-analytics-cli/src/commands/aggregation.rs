use clap::Args;
use serde_json::{json, Value};
use std::time::Instant;

use customs_analytics_core::aggregation::{
    aggregate, apply_min_support, growth_series, trend_direction, volatility, Dimension,
};
use customs_analytics_core::concentration::analyze_concentration;
use customs_analytics_core::{AnalysisConfig, ValueField};

use super::{envelope, parse_dimensions, ValueFieldArg};
use crate::input;

/// Arguments for aggregation
#[derive(Args)]
pub struct AggregateArgs {
    /// Path to JSON or CSV declaration lines (stdin JSON when omitted)
    #[arg(long)]
    pub input: Option<String>,

    /// Comma-separated dimensions: year, month, hs<N>, declared_hs<N>, country, office, importer
    #[arg(long, default_value = "year")]
    pub by: String,

    /// Drop groups with fewer lines than this
    #[arg(long)]
    pub min_support: Option<u64>,
}

/// Arguments for growth and volatility
#[derive(Args)]
pub struct TrendArgs {
    /// Path to JSON or CSV declaration lines (stdin JSON when omitted)
    #[arg(long)]
    pub input: Option<String>,

    /// Period dimension: year or month
    #[arg(long, default_value = "year")]
    pub by: String,

    /// Value metric
    #[arg(long, value_enum, default_value = "tax")]
    pub value_field: ValueFieldArg,
}

/// Arguments for concentration analysis
#[derive(Args)]
pub struct ConcentrationArgs {
    /// Path to JSON or CSV declaration lines (stdin JSON when omitted)
    #[arg(long)]
    pub input: Option<String>,

    /// Dimension(s) to concentrate over
    #[arg(long, default_value = "hs2")]
    pub by: String,

    /// Value metric
    #[arg(long, value_enum, default_value = "tax")]
    pub value_field: ValueFieldArg,

    /// Number of ranked groups to return (overrides config)
    #[arg(long)]
    pub top_n: Option<usize>,
}

pub fn run_aggregate(args: AggregateArgs, _config: &AnalysisConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let lines = input::lines::read_lines(args.input.as_deref())?;
    let dims = parse_dimensions(&args.by)?;

    let buckets = aggregate(&lines, &dims);
    let result = match args.min_support {
        Some(min) => {
            let supported = apply_min_support(&buckets, min);
            json!({ "buckets": supported.retained, "excluded_groups": supported.excluded_groups })
        }
        None => json!({ "buckets": buckets, "excluded_groups": 0 }),
    };

    envelope(
        "Group-by aggregation of active declaration lines",
        &json!({ "by": args.by, "min_support": args.min_support }),
        &lines,
        start,
        result,
    )
}

pub fn run_trend(args: TrendArgs, _config: &AnalysisConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let lines = input::lines::read_lines(args.input.as_deref())?;
    let dim: Dimension = args.by.parse()?;
    if !matches!(dim, Dimension::Year | Dimension::Month) {
        return Err("--by must be 'year' or 'month' for trends".into());
    }
    let field: ValueField = args.value_field.into();

    let buckets = aggregate(&lines, &[dim]);
    let series = growth_series(&buckets, field);
    let trend = match series.as_slice() {
        [.., prev, last] => Some(trend_direction(last.value, prev.value)),
        _ => None,
    };

    envelope(
        "Period-over-period growth, sample-deviation volatility and +/-5% trend",
        &json!({ "by": args.by, "value_field": field }),
        &lines,
        start,
        json!({
            "series": series,
            "volatility": volatility(&buckets, field),
            "trend": trend,
        }),
    )
}

pub fn run_concentration(args: ConcentrationArgs, config: &AnalysisConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let lines = input::lines::read_lines(args.input.as_deref())?;
    let dims = parse_dimensions(&args.by)?;

    let mut options = config.concentration_options(args.value_field.into());
    if let Some(n) = args.top_n {
        options.top_n = n;
    }
    let result = analyze_concentration(&aggregate(&lines, &dims), &options)?;

    envelope(
        "Herfindahl-Hirschman index over all groups with ABC classes on cumulative share",
        &options,
        &lines,
        start,
        result,
    )
}
