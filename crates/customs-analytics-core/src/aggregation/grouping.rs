//! Grouping primitive and aggregate buckets.
//!
//! Every per-dimension breakdown (year, month, HS prefix, origin, office,
//! importer, or any tuple of them) goes through [`aggregate_by`] with a
//! [`KeySelector`]. Missing dimension values form their own group so bucket
//! counts always add back up to the number of active lines.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::declarations::DeclarationLine;
use crate::error::CustomsAnalyticsError;
use crate::types::{Money, ValueField};

// ---------------------------------------------------------------------------
// Group keys and selectors
// ---------------------------------------------------------------------------

/// Tuple of dimension values identifying a group. `None` marks a missing value.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey(pub Vec<Option<String>>);

impl GroupKey {
    pub fn single(part: Option<String>) -> Self {
        GroupKey(vec![part])
    }

    pub fn pair(first: Option<String>, second: Option<String>) -> Self {
        GroupKey(vec![first, second])
    }

    pub fn part(&self, idx: usize) -> Option<&str> {
        self.0.get(idx).and_then(|p| p.as_deref())
    }

    /// True when every dimension value is present.
    pub fn is_complete(&self) -> bool {
        self.0.iter().all(Option::is_some)
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = self
            .0
            .iter()
            .map(|p| p.as_deref().unwrap_or("(none)"))
            .collect();
        f.write_str(&parts.join(" / "))
    }
}

/// Strategy for deriving a group key from a line.
pub trait KeySelector {
    fn key(&self, line: &DeclarationLine) -> GroupKey;
}

impl<F> KeySelector for F
where
    F: Fn(&DeclarationLine) -> GroupKey,
{
    fn key(&self, line: &DeclarationLine) -> GroupKey {
        self(line)
    }
}

/// Built-in grouping dimensions.
///
/// Written as `year`, `month`, `hs<N>` (assessed classification prefix),
/// `declared_hs<N>`, `country`, `office` and `importer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Dimension {
    Year,
    Month,
    Classification { prefix_len: usize },
    DeclaredClassification { prefix_len: usize },
    OriginCountry,
    CustomsOffice,
    Importer,
}

impl Dimension {
    pub fn part(&self, line: &DeclarationLine) -> Option<String> {
        match self {
            Dimension::Year => Some(line.period.year_key()),
            Dimension::Month => line.period.month_key(),
            Dimension::Classification { prefix_len } => line.classification_prefix(*prefix_len),
            Dimension::DeclaredClassification { prefix_len } => line.declared_prefix(*prefix_len),
            Dimension::OriginCountry => line.origin().map(str::to_string),
            Dimension::CustomsOffice => line.office().map(str::to_string),
            Dimension::Importer => line.importer().map(str::to_string),
        }
    }
}

impl KeySelector for Dimension {
    fn key(&self, line: &DeclarationLine) -> GroupKey {
        GroupKey::single(self.part(line))
    }
}

impl KeySelector for [Dimension] {
    fn key(&self, line: &DeclarationLine) -> GroupKey {
        GroupKey(self.iter().map(|d| d.part(line)).collect())
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Year => f.write_str("year"),
            Dimension::Month => f.write_str("month"),
            Dimension::Classification { prefix_len } => write!(f, "hs{prefix_len}"),
            Dimension::DeclaredClassification { prefix_len } => {
                write!(f, "declared_hs{prefix_len}")
            }
            Dimension::OriginCountry => f.write_str("country"),
            Dimension::CustomsOffice => f.write_str("office"),
            Dimension::Importer => f.write_str("importer"),
        }
    }
}

impl FromStr for Dimension {
    type Err = CustomsAnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        let prefix_len = |digits: &str| -> Result<usize, CustomsAnalyticsError> {
            match digits.parse::<usize>() {
                Ok(n) if (1..=10).contains(&n) => Ok(n),
                _ => Err(CustomsAnalyticsError::InvalidInput {
                    field: "dimension".into(),
                    reason: format!("'{s}': HS prefix length must be 1-10"),
                }),
            }
        };
        match s.as_str() {
            "year" => Ok(Dimension::Year),
            "month" => Ok(Dimension::Month),
            "country" | "origin" => Ok(Dimension::OriginCountry),
            "office" => Ok(Dimension::CustomsOffice),
            "importer" => Ok(Dimension::Importer),
            other => {
                if let Some(d) = other.strip_prefix("declared_hs") {
                    Ok(Dimension::DeclaredClassification {
                        prefix_len: prefix_len(d)?,
                    })
                } else if let Some(d) = other.strip_prefix("hs") {
                    Ok(Dimension::Classification {
                        prefix_len: prefix_len(d)?,
                    })
                } else {
                    Err(CustomsAnalyticsError::InvalidInput {
                        field: "dimension".into(),
                        reason: format!(
                            "'{other}': expected year, month, hs<N>, declared_hs<N>, country, office or importer"
                        ),
                    })
                }
            }
        }
    }
}

impl TryFrom<String> for Dimension {
    type Error = CustomsAnalyticsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Dimension> for String {
    fn from(d: Dimension) -> Self {
        d.to_string()
    }
}

// ---------------------------------------------------------------------------
// Buckets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateBucket {
    pub group_key: GroupKey,
    pub count: u64,
    pub total_tax: Money,
    pub total_declared_value: Money,
    pub total_assessed_value: Money,
    /// Undefined for an empty bucket.
    pub average_tax: Option<Money>,
}

impl AggregateBucket {
    pub fn empty(group_key: GroupKey) -> Self {
        AggregateBucket {
            group_key,
            count: 0,
            total_tax: Decimal::ZERO,
            total_declared_value: Decimal::ZERO,
            total_assessed_value: Decimal::ZERO,
            average_tax: None,
        }
    }

    fn add_line(&mut self, line: &DeclarationLine) {
        self.count += 1;
        self.total_tax += line.tax_amount;
        self.total_declared_value += line.declared_invoice_value_usd;
        self.total_assessed_value += line.assessed_invoice_value_usd;
    }

    fn finalize(&mut self) {
        self.average_tax = if self.count > 0 {
            Some(self.total_tax / Decimal::from(self.count))
        } else {
            None
        };
    }

    /// Fold another partial bucket for the same key into this one.
    pub fn merge(&mut self, other: &AggregateBucket) {
        self.count += other.count;
        self.total_tax += other.total_tax;
        self.total_declared_value += other.total_declared_value;
        self.total_assessed_value += other.total_assessed_value;
        self.finalize();
    }

    pub fn value(&self, field: ValueField) -> Decimal {
        match field {
            ValueField::Tax => self.total_tax,
            ValueField::DeclaredValue => self.total_declared_value,
            ValueField::AssessedValue => self.total_assessed_value,
            ValueField::Count => Decimal::from(self.count),
        }
    }
}

/// Active lines grouped by key, in key order.
pub fn group_lines<'a, S>(
    lines: &'a [DeclarationLine],
    selector: &S,
) -> BTreeMap<GroupKey, Vec<&'a DeclarationLine>>
where
    S: KeySelector + ?Sized,
{
    let mut groups: BTreeMap<GroupKey, Vec<&DeclarationLine>> = BTreeMap::new();
    for line in lines.iter().filter(|l| l.is_active()) {
        groups.entry(selector.key(line)).or_default().push(line);
    }
    groups
}

/// Aggregate active lines by the key produced by `selector`.
///
/// Output is ordered by group key ascending.
pub fn aggregate_by<S>(lines: &[DeclarationLine], selector: &S) -> Vec<AggregateBucket>
where
    S: KeySelector + ?Sized,
{
    let mut buckets: BTreeMap<GroupKey, AggregateBucket> = BTreeMap::new();
    for line in lines.iter().filter(|l| l.is_active()) {
        let key = selector.key(line);
        buckets
            .entry(key.clone())
            .or_insert_with(|| AggregateBucket::empty(key))
            .add_line(line);
    }
    buckets
        .into_values()
        .map(|mut b| {
            b.finalize();
            b
        })
        .collect()
}

/// Aggregate by a tuple of built-in dimensions.
pub fn aggregate(lines: &[DeclarationLine], dimensions: &[Dimension]) -> Vec<AggregateBucket> {
    log::debug!(
        "aggregating {} line(s) by [{}]",
        lines.len(),
        dimensions
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    aggregate_by(lines, dimensions)
}

/// Single bucket over every active line.
pub fn grand_total(lines: &[DeclarationLine]) -> AggregateBucket {
    let mut buckets = aggregate_by(lines, &|_: &DeclarationLine| GroupKey::default());
    buckets
        .pop()
        .unwrap_or_else(|| AggregateBucket::empty(GroupKey::default()))
}

/// Re-aggregate partial buckets computed over independent partitions.
pub fn merge_partials<I>(partitions: I) -> Vec<AggregateBucket>
where
    I: IntoIterator<Item = Vec<AggregateBucket>>,
{
    let mut merged: BTreeMap<GroupKey, AggregateBucket> = BTreeMap::new();
    for partition in partitions {
        for bucket in partition {
            merged
                .entry(bucket.group_key.clone())
                .or_insert_with(|| AggregateBucket::empty(bucket.group_key.clone()))
                .merge(&bucket);
        }
    }
    merged.into_values().collect()
}

// ---------------------------------------------------------------------------
// Minimum support
// ---------------------------------------------------------------------------

/// Items that passed a minimum-support filter, with the number dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supported<T> {
    pub retained: Vec<T>,
    pub excluded_groups: usize,
}

/// Keep buckets with at least `min_count` lines.
pub fn apply_min_support(buckets: &[AggregateBucket], min_count: u64) -> Supported<AggregateBucket> {
    let (retained, excluded): (Vec<_>, Vec<_>) =
        buckets.iter().cloned().partition(|b| b.count >= min_count);
    Supported {
        retained,
        excluded_groups: excluded.len(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Period;
    use rust_decimal_macros::dec;

    fn line(id: &str, year: i32, hs: Option<&str>, country: Option<&str>, tax: Decimal) -> DeclarationLine {
        DeclarationLine {
            line_id: id.into(),
            period: Period::month(year, 1),
            declared_hs_code: hs.map(String::from),
            assessed_hs_code: hs.map(String::from),
            origin_country: country.map(String::from),
            customs_office: Some("DAR".into()),
            importer_id: Some("TIN-1".into()),
            importer_name: None,
            declared_unit_value_usd: dec!(1),
            assessed_unit_value_usd: dec!(1),
            declared_invoice_value_usd: dec!(100),
            assessed_invoice_value_usd: dec!(120),
            tax_amount: tax,
            is_deleted: false,
        }
    }

    fn sample() -> Vec<DeclarationLine> {
        vec![
            line("1", 2023, Some("85181000"), Some("CN"), dec!(10)),
            line("2", 2023, Some("85182200"), Some("CN"), dec!(30)),
            line("3", 2024, Some("27101900"), Some("AE"), dec!(50)),
            line("4", 2024, None, None, dec!(5)),
            line("5", 2024, Some("27101900"), Some(""), dec!(5)),
        ]
    }

    #[test]
    fn test_aggregate_by_year() {
        let buckets = aggregate(&sample(), &[Dimension::Year]);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].group_key, GroupKey::single(Some("2023".into())));
        assert_eq!(buckets[0].count, 2);
        assert_eq!(buckets[0].total_tax, dec!(40));
        assert_eq!(buckets[0].average_tax, Some(dec!(20)));
        assert_eq!(buckets[1].count, 3);
        assert_eq!(buckets[1].total_assessed_value, dec!(360));
    }

    #[test]
    fn test_missing_values_form_own_group() {
        let lines = sample();
        let buckets = aggregate(&lines, &[Dimension::OriginCountry]);
        let none = buckets
            .iter()
            .find(|b| b.group_key == GroupKey::single(None))
            .unwrap();
        assert_eq!(none.count, 2);
        let total: u64 = buckets.iter().map(|b| b.count).sum();
        assert_eq!(total, lines.len() as u64);
    }

    #[test]
    fn test_counts_add_up_for_every_dimension() {
        let lines = sample();
        for dim in ["year", "month", "hs2", "hs4", "declared_hs6", "country", "office", "importer"] {
            let d: Dimension = dim.parse().unwrap();
            let total: u64 = aggregate(&lines, &[d]).iter().map(|b| b.count).sum();
            assert_eq!(total, 5, "dimension {dim}");
        }
    }

    #[test]
    fn test_deleted_lines_excluded() {
        let mut lines = sample();
        lines[0].is_deleted = true;
        let total = grand_total(&lines);
        assert_eq!(total.count, 4);
        assert_eq!(total.total_tax, dec!(90));
    }

    #[test]
    fn test_multi_dimension_key() {
        let buckets = aggregate(
            &sample(),
            &[Dimension::Classification { prefix_len: 4 }, Dimension::OriginCountry],
        );
        let key = GroupKey::pair(Some("8518".into()), Some("CN".into()));
        let b = buckets.iter().find(|b| b.group_key == key).unwrap();
        assert_eq!(b.count, 2);
        assert_eq!(key.to_string(), "8518 / CN");
    }

    #[test]
    fn test_closure_selector() {
        let buckets = aggregate_by(&sample(), &|l: &DeclarationLine| {
            GroupKey::single(Some(if l.tax_amount > dec!(20) { "big" } else { "small" }.into()))
        });
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].count, 2);
        assert_eq!(buckets[1].count, 3);
    }

    #[test]
    fn test_merge_partials_matches_whole() {
        let lines = sample();
        let whole = aggregate(&lines, &[Dimension::Year]);
        let (left, right) = lines.split_at(3);
        let merged = merge_partials(vec![
            aggregate(left, &[Dimension::Year]),
            aggregate(right, &[Dimension::Year]),
        ]);
        assert_eq!(merged, whole);
    }

    #[test]
    fn test_grand_total_empty() {
        let total = grand_total(&[]);
        assert_eq!(total.count, 0);
        assert_eq!(total.average_tax, None);
    }

    #[test]
    fn test_apply_min_support() {
        let buckets = aggregate(&sample(), &[Dimension::Classification { prefix_len: 2 }]);
        let s = apply_min_support(&buckets, 2);
        assert_eq!(s.retained.len(), 2);
        assert_eq!(s.excluded_groups, 1);
    }

    #[test]
    fn test_dimension_parse_and_display() {
        assert_eq!(
            "HS4".parse::<Dimension>().unwrap(),
            Dimension::Classification { prefix_len: 4 }
        );
        assert_eq!(Dimension::DeclaredClassification { prefix_len: 6 }.to_string(), "declared_hs6");
        assert!("hs0".parse::<Dimension>().is_err());
        assert!("port".parse::<Dimension>().is_err());
    }
}
