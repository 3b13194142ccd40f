use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::CustomsAnalyticsError;

/// Monetary amounts (USD for values, local currency for tax).
pub type Money = Decimal;

/// Fractions expressed as decimals (0.05 = 5%). Shares and growth rates.
pub type Rate = Decimal;

/// Percentages on a 0-100 scale. Anomaly rates and KPI values.
pub type Percent = Decimal;

/// Reporting period of a declaration line: a year, optionally narrowed to a month.
///
/// Serialized as `"2024"` or `"2024-03"`. Ordering is chronological, with a
/// bare year sorting before its months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Period {
    pub year: i32,
    pub month: Option<u32>,
}

impl Period {
    pub fn year(year: i32) -> Self {
        Period { year, month: None }
    }

    pub fn month(year: i32, month: u32) -> Self {
        Period {
            year,
            month: Some(month),
        }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Period::month(date.year(), date.month())
    }

    /// Year-only key, e.g. `"2024"`.
    pub fn year_key(&self) -> String {
        format!("{:04}", self.year)
    }

    /// Month key `"2024-03"`; `None` when the line carries no month.
    pub fn month_key(&self) -> Option<String> {
        self.month.map(|m| format!("{:04}-{:02}", self.year, m))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.month {
            Some(m) => write!(f, "{:04}-{:02}", self.year, m),
            None => write!(f, "{:04}", self.year),
        }
    }
}

impl FromStr for Period {
    type Err = CustomsAnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| CustomsAnalyticsError::InvalidInput {
            field: "period".into(),
            reason: format!("'{s}': {reason}"),
        };
        let trimmed = s.trim();
        let (year_part, month_part) = match trimmed.split_once('-') {
            Some((y, m)) => (y, Some(m)),
            None => (trimmed, None),
        };
        let year: i32 = year_part
            .parse()
            .map_err(|_| invalid("year must be numeric"))?;
        match month_part {
            None => Ok(Period::year(year)),
            Some(m) => {
                let month: u32 = m.parse().map_err(|_| invalid("month must be numeric"))?;
                if !(1..=12).contains(&month) {
                    return Err(invalid("month must be between 1 and 12"));
                }
                Ok(Period::month(year, month))
            }
        }
    }
}

impl TryFrom<String> for Period {
    type Error = CustomsAnalyticsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Period> for String {
    fn from(p: Period) -> Self {
        p.to_string()
    }
}

/// Value metric of an [`AggregateBucket`](crate::aggregation::AggregateBucket)
/// used for ranking, shares and growth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueField {
    #[default]
    Tax,
    DeclaredValue,
    AssessedValue,
    Count,
}

impl fmt::Display for ValueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValueField::Tax => "tax",
            ValueField::DeclaredValue => "declared_value",
            ValueField::AssessedValue => "assessed_value",
            ValueField::Count => "count",
        };
        f.write_str(s)
    }
}

/// `numerator / denominator`, undefined when the denominator is not positive.
pub fn checked_ratio(numerator: Decimal, denominator: Decimal) -> Option<Decimal> {
    if denominator > Decimal::ZERO {
        Some(numerator / denominator)
    } else {
        None
    }
}

/// `part / whole × 100`, zero when `whole` is zero.
pub fn percent_of(part: u64, whole: u64) -> Percent {
    if whole == 0 {
        Decimal::ZERO
    } else {
        Decimal::from(part) / Decimal::from(whole) * dec!(100)
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_parse_year_and_month() {
        assert_eq!("2024".parse::<Period>().unwrap(), Period::year(2024));
        assert_eq!("2024-03".parse::<Period>().unwrap(), Period::month(2024, 3));
        assert!("2024-13".parse::<Period>().is_err());
        assert!("twenty".parse::<Period>().is_err());
    }

    #[test]
    fn test_period_ordering_is_chronological() {
        let mut periods = vec![
            Period::month(2024, 2),
            Period::year(2023),
            Period::month(2023, 12),
            Period::month(2024, 1),
        ];
        periods.sort();
        let keys: Vec<String> = periods.iter().map(|p| p.to_string()).collect();
        assert_eq!(keys, vec!["2023", "2023-12", "2024-01", "2024-02"]);
    }

    #[test]
    fn test_period_serde_as_string() {
        let json = serde_json::to_string(&Period::month(2025, 7)).unwrap();
        assert_eq!(json, "\"2025-07\"");
        let back: Period = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Period::month(2025, 7));
    }

    #[test]
    fn test_checked_ratio_undefined_on_zero() {
        assert_eq!(checked_ratio(dec!(5), Decimal::ZERO), None);
        assert_eq!(checked_ratio(dec!(5), dec!(-1)), None);
        assert_eq!(checked_ratio(dec!(5), dec!(2)), Some(dec!(2.5)));
    }

    #[test]
    fn test_percent_of() {
        assert_eq!(percent_of(6, 10), dec!(60));
        assert_eq!(percent_of(3, 0), Decimal::ZERO);
    }
}
