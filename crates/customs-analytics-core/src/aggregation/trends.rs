//! Period-over-period growth and revenue volatility.
//!
//! Works on buckets keyed by a single period dimension (year or month).
//! Buckets whose period is missing are skipped: they cannot be placed on
//! the timeline.

use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::grouping::AggregateBucket;
use crate::types::{checked_ratio, Money, Percent, Rate, ValueField};

// ---------------------------------------------------------------------------
// Growth
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrowthPoint {
    pub period: String,
    pub value: Money,
    pub previous_value: Option<Money>,
    /// `(current - previous) / previous`; undefined without a positive base.
    pub growth_rate: Option<Rate>,
}

impl GrowthPoint {
    pub fn growth_pct(&self) -> Option<Percent> {
        self.growth_rate.map(|g| g * dec!(100))
    }
}

/// Growth between consecutive periods.
pub fn growth_rate(current: Decimal, previous: Decimal) -> Option<Rate> {
    checked_ratio(current - previous, previous)
}

fn timeline(buckets: &[AggregateBucket]) -> Vec<&AggregateBucket> {
    let mut dated: Vec<&AggregateBucket> = buckets
        .iter()
        .filter(|b| b.group_key.is_complete())
        .collect();
    dated.sort_by(|a, b| a.group_key.cmp(&b.group_key));
    dated
}

/// Growth series over period buckets, oldest first.
pub fn growth_series(buckets: &[AggregateBucket], field: ValueField) -> Vec<GrowthPoint> {
    let mut out: Vec<GrowthPoint> = Vec::new();
    let mut previous: Option<Decimal> = None;
    for bucket in timeline(buckets) {
        let value = bucket.value(field);
        out.push(GrowthPoint {
            period: bucket.group_key.to_string(),
            value,
            previous_value: previous,
            growth_rate: previous.and_then(|p| growth_rate(value, p)),
        });
        previous = Some(value);
    }
    out
}

/// Growth of the most recent period, if defined.
pub fn latest_growth(series: &[GrowthPoint]) -> Option<Rate> {
    series.last().and_then(|p| p.growth_rate)
}

// ---------------------------------------------------------------------------
// Volatility
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolatilityRating {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volatility {
    pub periods: usize,
    pub mean: Option<Money>,
    /// Sample standard deviation (n - 1).
    pub std_dev: Option<Money>,
    pub coefficient_of_variation_pct: Option<Percent>,
    pub rating: Option<VolatilityRating>,
}

/// Sample mean and standard deviation; the deviation needs two observations.
pub fn sample_stats(values: &[Decimal]) -> (Option<Decimal>, Option<Decimal>) {
    let n = values.len();
    if n == 0 {
        return (None, None);
    }
    let mean = values.iter().copied().sum::<Decimal>() / Decimal::from(n as u64);
    if n < 2 {
        return (Some(mean), None);
    }
    let variance = values
        .iter()
        .map(|&v| (v - mean) * (v - mean))
        .sum::<Decimal>()
        / Decimal::from((n - 1) as u64);
    (Some(mean), variance.sqrt())
}

pub fn volatility_rating(cv_pct: Percent) -> VolatilityRating {
    if cv_pct < dec!(10) {
        VolatilityRating::Low
    } else if cv_pct < dec!(20) {
        VolatilityRating::Medium
    } else {
        VolatilityRating::High
    }
}

/// Coefficient of variation of a value across period buckets.
pub fn volatility(buckets: &[AggregateBucket], field: ValueField) -> Volatility {
    let values: Vec<Decimal> = timeline(buckets).iter().map(|b| b.value(field)).collect();
    let (mean, std_dev) = sample_stats(&values);
    let cv = match (mean, std_dev) {
        (Some(m), Some(s)) => checked_ratio(s, m).map(|r| r * dec!(100)),
        _ => None,
    };
    Volatility {
        periods: values.len(),
        mean,
        std_dev,
        coefficient_of_variation_pct: cv,
        rating: cv.map(volatility_rating),
    }
}

// ---------------------------------------------------------------------------
// Trend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendDirection {
    Up,
    Down,
    Flat,
}

/// Up or down when the change exceeds 5% of the previous value.
pub fn trend_direction(current: Decimal, previous: Decimal) -> TrendDirection {
    if previous.is_zero() {
        return TrendDirection::Flat;
    }
    let change = (current - previous) / previous * dec!(100);
    if change > dec!(5) {
        TrendDirection::Up
    } else if change < dec!(-5) {
        TrendDirection::Down
    } else {
        TrendDirection::Flat
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
