pub mod pareto;

pub use pareto::{
    analyze_concentration, concentration_level, hhi, shares, AbcClass, AbcCounts, AbcThresholds,
    ConcentrationLevel, ConcentrationOptions, ConcentrationResult, RankedBucket,
};
