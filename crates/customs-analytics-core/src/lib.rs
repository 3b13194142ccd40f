pub mod error;
pub mod types;

pub mod aggregation;
pub mod anomaly;
pub mod concentration;
pub mod config;
pub mod declarations;
pub mod kpi;
pub mod pipeline;
pub mod risk;
pub mod summary;

pub use config::AnalysisConfig;
pub use declarations::DeclarationLine;
pub use error::CustomsAnalyticsError;
pub use pipeline::{run_analysis, run_analysis_with_inputs, AnalysisReport};
pub use types::*;

/// Standard result type for all customs-analytics operations
pub type CustomsResult<T> = Result<T, CustomsAnalyticsError>;
