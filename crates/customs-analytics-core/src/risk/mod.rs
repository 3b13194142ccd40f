pub mod profiles;
pub mod scoring;

pub use profiles::{
    classification_origin_counts, importer_counts, rank_risk, risk_counts_by, RiskRanking,
    SupportPolicy, TierCounts,
};
pub use scoring::{score_risk, RiskCounts, RiskProfile, RiskTier, RiskTierThresholds, RiskWeights};
