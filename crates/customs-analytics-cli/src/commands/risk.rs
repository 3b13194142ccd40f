use clap::Args;
use serde_json::{json, Value};
use std::time::Instant;

use customs_analytics_core::risk::{
    classification_origin_counts, importer_counts, rank_risk, SupportPolicy,
};
use customs_analytics_core::AnalysisConfig;

use super::envelope;
use crate::input;

/// Arguments for risk ranking
#[derive(Args)]
pub struct RiskArgs {
    /// Path to JSON or CSV declaration lines (stdin JSON when omitted)
    #[arg(long)]
    pub input: Option<String>,

    /// Number of ranked groups to return (overrides config)
    #[arg(long)]
    pub top_n: Option<usize>,

    /// Minimum undervalued or reclassified lines per group (overrides config)
    #[arg(long)]
    pub min_flag_count: Option<u64>,
}

fn policy(base: SupportPolicy, args: &RiskArgs) -> SupportPolicy {
    SupportPolicy {
        min_flag_count: args.min_flag_count.unwrap_or(base.min_flag_count),
        ..base
    }
}

const METHODOLOGY: &str =
    "risk_score = undervaluation rate x w_under + reclassification rate x w_reclass";

pub fn run_group_risk(args: RiskArgs, config: &AnalysisConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let lines = input::lines::read_lines(args.input.as_deref())?;
    let support = policy(config.group_support, &args);
    let top_n = args.top_n.unwrap_or(config.top_n);

    let counts =
        classification_origin_counts(&lines, config.heading_prefix_len, config.under_threshold)?;
    let ranking = rank_risk(&counts, &config.risk_weights, &config.risk_tiers, &support, top_n)?;

    envelope(
        METHODOLOGY,
        &json!({
            "group_by": format!("hs{} x origin", config.heading_prefix_len),
            "weights": config.risk_weights,
            "tiers": config.risk_tiers,
            "support": support,
            "under_threshold": config.under_threshold,
        }),
        &lines,
        start,
        ranking,
    )
}

pub fn run_importer_risk(args: RiskArgs, config: &AnalysisConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let lines = input::lines::read_lines(args.input.as_deref())?;
    let support = policy(config.importer_support, &args);
    let top_n = args.top_n.unwrap_or(config.top_n);

    let counts = importer_counts(&lines, config.under_threshold)?;
    let ranking = rank_risk(&counts, &config.risk_weights, &config.risk_tiers, &support, top_n)?;

    envelope(
        METHODOLOGY,
        &json!({
            "group_by": "importer",
            "weights": config.risk_weights,
            "tiers": config.risk_tiers,
            "support": support,
            "under_threshold": config.under_threshold,
        }),
        &lines,
        start,
        ranking,
    )
}
