pub mod findings;
pub mod price_outliers;
pub mod reclassification;
pub mod valuation;

pub use findings::{screen_lines, AnomalyFinding, AnomalyKind, LineScreening};
pub use price_outliers::{
    detect_price_outliers, price_variance_report, PriceVarianceGroup, PriceVarianceReport,
};
pub use reclassification::{
    detect_line_reclassifications, detect_reclassification, reclassification_report,
    HsLevels, ReclassificationPair, ReclassificationReport,
};
pub use valuation::{
    detect_overvaluation, detect_undervaluation, is_overvalued, is_undervalued,
    undervaluation_by_group, valuation_stats_by_period, PeriodValuationStats,
    UndervaluationGroup,
};
