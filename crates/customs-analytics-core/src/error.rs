use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CustomsAnalyticsError {
    #[error("Invalid configuration: {field} — {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Threshold out of range: {name} = {value} (must be {expected})")]
    ThresholdOutOfRange {
        name: String,
        value: Decimal,
        expected: String,
    },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for CustomsAnalyticsError {
    fn from(e: serde_json::Error) -> Self {
        CustomsAnalyticsError::SerializationError(e.to_string())
    }
}
