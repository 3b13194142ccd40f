pub mod aggregation;
pub mod analysis;
pub mod anomaly;
pub mod kpi;
pub mod risk;

use clap::ValueEnum;
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;

use customs_analytics_core::aggregation::Dimension;
use customs_analytics_core::declarations::assess_data_quality;
use customs_analytics_core::{with_metadata, DeclarationLine, ValueField};

/// Value metric selectable on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ValueFieldArg {
    Tax,
    DeclaredValue,
    AssessedValue,
    Count,
}

impl From<ValueFieldArg> for ValueField {
    fn from(arg: ValueFieldArg) -> Self {
        match arg {
            ValueFieldArg::Tax => ValueField::Tax,
            ValueFieldArg::DeclaredValue => ValueField::DeclaredValue,
            ValueFieldArg::AssessedValue => ValueField::AssessedValue,
            ValueFieldArg::Count => ValueField::Count,
        }
    }
}

/// Parse a comma-separated dimension list such as `year,hs4,country`.
pub fn parse_dimensions(list: &str) -> Result<Vec<Dimension>, Box<dyn std::error::Error>> {
    let dims = list
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<Dimension>())
        .collect::<Result<Vec<_>, _>>()?;
    if dims.is_empty() {
        return Err("--by needs at least one dimension".into());
    }
    Ok(dims)
}

/// Wrap a result in the output envelope, with data-quality warnings.
pub fn envelope<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    lines: &[DeclarationLine],
    start: Instant,
    result: T,
) -> Result<Value, Box<dyn std::error::Error>> {
    let warnings = assess_data_quality(lines).warnings();
    let elapsed_us = start.elapsed().as_micros() as u64;
    let output = with_metadata(methodology, assumptions, warnings, elapsed_us, result);
    Ok(serde_json::to_value(output)?)
}
