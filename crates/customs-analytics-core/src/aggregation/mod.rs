pub mod grouping;
pub mod trends;

pub use grouping::{
    aggregate, aggregate_by, apply_min_support, grand_total, group_lines, merge_partials,
    AggregateBucket, Dimension, GroupKey, KeySelector, Supported,
};
pub use trends::{
    growth_rate, growth_series, latest_growth, trend_direction, volatility, GrowthPoint,
    TrendDirection, Volatility, VolatilityRating,
};
