pub mod line;
pub mod quality;

pub use line::DeclarationLine;
pub use quality::{assess_data_quality, DataQualityIssue, DataQualityReport};
