//! Concentration of revenue or trade value across a grouped dimension.
//!
//! Covers:
//! 1. **Shares** -- share_i = value_i / sum(value), cumulative over the ranking
//! 2. **Pareto (ABC) classes** -- A up to 80% cumulative share, B up to 95%, C beyond
//! 3. **Herfindahl-Hirschman Index** -- HHI = sum(share_i^2) * 10000 over every group
//!
//! Ranking, shares, classes and HHI are always computed on the full set of
//! supported groups; `top_n` only limits how many ranked rows are returned.
//!
//! All arithmetic uses `rust_decimal::Decimal`. No `f64`.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::aggregation::{apply_min_support, AggregateBucket, GroupKey};
use crate::error::CustomsAnalyticsError;
use crate::types::{checked_ratio, Money, Rate, ValueField};
use crate::CustomsResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AbcClass {
    A,
    B,
    C,
}

/// Upper cumulative-share bounds of classes A and B.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbcThresholds {
    pub a: Rate,
    pub b: Rate,
}

impl Default for AbcThresholds {
    fn default() -> Self {
        Self {
            a: dec!(0.80),
            b: dec!(0.95),
        }
    }
}

impl AbcThresholds {
    pub fn classify(&self, cumulative_share: Rate) -> AbcClass {
        if cumulative_share <= self.a {
            AbcClass::A
        } else if cumulative_share <= self.b {
            AbcClass::B
        } else {
            AbcClass::C
        }
    }

    pub fn validate(&self) -> CustomsResult<()> {
        if !(self.a > Decimal::ZERO && self.a < self.b && self.b <= Decimal::ONE) {
            return Err(CustomsAnalyticsError::InvalidConfig {
                field: "abc_thresholds".into(),
                reason: format!("need 0 < a < b <= 1, got a={} b={}", self.a, self.b),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcentrationOptions {
    pub value_field: ValueField,
    /// Number of ranked rows returned.
    pub top_n: usize,
    /// Groups with fewer lines are left out of ranking and HHI.
    pub min_support: u64,
    pub abc: AbcThresholds,
}

impl Default for ConcentrationOptions {
    fn default() -> Self {
        Self {
            value_field: ValueField::Tax,
            top_n: 20,
            min_support: 1,
            abc: AbcThresholds::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConcentrationLevel {
    /// HHI below 1000.
    Low,
    /// HHI from 1000 up to 1800.
    Moderate,
    /// HHI of 1800 and above.
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedBucket {
    pub rank: usize,
    pub group_key: GroupKey,
    pub count: u64,
    pub value: Money,
    pub share: Rate,
    pub cumulative_share: Rate,
    pub abc_class: AbcClass,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbcCounts {
    pub a: usize,
    pub b: usize,
    pub c: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcentrationResult {
    pub value_field: ValueField,
    pub total_value: Money,
    /// 0-10000 scale.
    pub hhi: Decimal,
    pub concentration_level: ConcentrationLevel,
    /// Equivalent number of equal-sized groups, 10000 / HHI.
    pub effective_groups: Option<Decimal>,
    pub top_5_share: Rate,
    pub total_groups: usize,
    pub excluded_groups: usize,
    pub class_counts: AbcCounts,
    /// Highest-value groups first, truncated to `top_n`.
    pub ranked: Vec<RankedBucket>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Shares of each value in the total; all zero when the total is not positive.
pub fn shares(values: &[Decimal]) -> Vec<Rate> {
    let total: Decimal = values.iter().copied().sum();
    values
        .iter()
        .map(|&v| checked_ratio(v, total).unwrap_or(Decimal::ZERO))
        .collect()
}

/// HHI = sum((share * 100)^2), on the 0-10000 scale.
pub fn hhi(values: &[Decimal]) -> Decimal {
    shares(values)
        .iter()
        .map(|s| {
            let pct = *s * dec!(100);
            pct * pct
        })
        .sum()
}

pub fn concentration_level(hhi: Decimal) -> ConcentrationLevel {
    if hhi < dec!(1000) {
        ConcentrationLevel::Low
    } else if hhi < dec!(1800) {
        ConcentrationLevel::Moderate
    } else {
        ConcentrationLevel::High
    }
}

fn validate_options(options: &ConcentrationOptions) -> CustomsResult<()> {
    if options.top_n == 0 {
        return Err(CustomsAnalyticsError::InvalidConfig {
            field: "top_n".into(),
            reason: "must be at least 1".into(),
        });
    }
    options.abc.validate()
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// Rank buckets by value and measure how concentrated the value is.
pub fn analyze_concentration(
    buckets: &[AggregateBucket],
    options: &ConcentrationOptions,
) -> CustomsResult<ConcentrationResult> {
    validate_options(options)?;

    let supported = apply_min_support(buckets, options.min_support);
    let field = options.value_field;

    let mut ordered = supported.retained;
    ordered.sort_by(|a, b| {
        b.value(field)
            .cmp(&a.value(field))
            .then_with(|| a.group_key.cmp(&b.group_key))
    });

    let values: Vec<Decimal> = ordered.iter().map(|b| b.value(field)).collect();
    let total_value: Decimal = values.iter().copied().sum();
    let share_list = shares(&values);
    let hhi_value = hhi(&values);

    let mut class_counts = AbcCounts::default();
    let mut cumulative = Decimal::ZERO;
    let mut ranked: Vec<RankedBucket> = Vec::with_capacity(ordered.len());
    for (i, (bucket, share)) in ordered.into_iter().zip(share_list.iter()).enumerate() {
        cumulative += *share;
        let abc_class = options.abc.classify(cumulative);
        match abc_class {
            AbcClass::A => class_counts.a += 1,
            AbcClass::B => class_counts.b += 1,
            AbcClass::C => class_counts.c += 1,
        }
        ranked.push(RankedBucket {
            rank: i + 1,
            count: bucket.count,
            value: bucket.value(field),
            group_key: bucket.group_key,
            share: *share,
            cumulative_share: cumulative,
            abc_class,
        });
    }

    let total_groups = ranked.len();
    let top_5_share: Decimal = ranked.iter().take(5).map(|r| r.share).sum();
    ranked.truncate(options.top_n);

    log::debug!(
        "concentration by {field}: {total_groups} group(s), {} excluded, HHI {hhi_value}",
        supported.excluded_groups
    );

    Ok(ConcentrationResult {
        value_field: field,
        total_value,
        hhi: hhi_value,
        concentration_level: concentration_level(hhi_value),
        effective_groups: if hhi_value.is_zero() {
            None
        } else {
            Some(dec!(10000) / hhi_value)
        },
        top_5_share,
        total_groups,
        excluded_groups: supported.excluded_groups,
        class_counts,
        ranked,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket(key: &str, tax: Decimal, count: u64) -> AggregateBucket {
        AggregateBucket {
            group_key: GroupKey::single(Some(key.into())),
            count,
            total_tax: tax,
            total_declared_value: Decimal::ZERO,
            total_assessed_value: Decimal::ZERO,
            average_tax: Some(tax),
        }
    }

    fn four_buckets() -> Vec<AggregateBucket> {
        vec![
            bucket("c", dec!(15), 1),
            bucket("a", dec!(50), 1),
            bucket("d", dec!(5), 1),
            bucket("b", dec!(30), 1),
        ]
    }

    fn approx_eq(a: Decimal, b: Decimal, eps: Decimal) -> bool {
        (a - b).abs() < eps
    }

    #[test]
    fn test_pareto_four_bucket_scenario() {
        let r = analyze_concentration(&four_buckets(), &ConcentrationOptions::default()).unwrap();
        let shares: Vec<Decimal> = r.ranked.iter().map(|b| b.share).collect();
        let cumulative: Vec<Decimal> = r.ranked.iter().map(|b| b.cumulative_share).collect();
        let classes: Vec<AbcClass> = r.ranked.iter().map(|b| b.abc_class).collect();
        assert_eq!(shares, vec![dec!(0.50), dec!(0.30), dec!(0.15), dec!(0.05)]);
        assert_eq!(cumulative, vec![dec!(0.50), dec!(0.80), dec!(0.95), dec!(1.00)]);
        assert_eq!(classes, vec![AbcClass::A, AbcClass::A, AbcClass::B, AbcClass::C]);
        assert_eq!(r.hhi, dec!(3650));
        assert_eq!(r.concentration_level, ConcentrationLevel::High);
        assert_eq!(r.total_value, dec!(100));
        assert_eq!(
            r.class_counts,
            AbcCounts { a: 2, b: 1, c: 1 }
        );
    }

    #[test]
    fn test_hhi_invariant_to_top_n() {
        let full = analyze_concentration(&four_buckets(), &ConcentrationOptions::default()).unwrap();
        let opts = ConcentrationOptions {
            top_n: 1,
            ..Default::default()
        };
        let cut = analyze_concentration(&four_buckets(), &opts).unwrap();
        assert_eq!(cut.ranked.len(), 1);
        assert_eq!(cut.total_groups, 4);
        assert_eq!(cut.hhi, full.hhi);
        assert_eq!(cut.class_counts, full.class_counts);
        assert_eq!(cut.top_5_share, full.top_5_share);
    }

    #[test]
    fn test_ties_broken_by_key() {
        let buckets = vec![
            bucket("z", dec!(10), 1),
            bucket("m", dec!(10), 1),
            bucket("a", dec!(10), 1),
        ];
        let r = analyze_concentration(&buckets, &ConcentrationOptions::default()).unwrap();
        let keys: Vec<String> = r.ranked.iter().map(|b| b.group_key.to_string()).collect();
        assert_eq!(keys, vec!["a", "m", "z"]);
    }

    #[test]
    fn test_zero_total_gives_zero_shares() {
        let buckets = vec![bucket("a", Decimal::ZERO, 3), bucket("b", Decimal::ZERO, 2)];
        let r = analyze_concentration(&buckets, &ConcentrationOptions::default()).unwrap();
        assert!(r.ranked.iter().all(|b| b.share.is_zero()));
        assert_eq!(r.hhi, Decimal::ZERO);
        assert_eq!(r.effective_groups, None);
        assert_eq!(r.concentration_level, ConcentrationLevel::Low);
    }

    #[test]
    fn test_shares_sum_to_one() {
        let buckets = vec![
            bucket("a", dec!(1), 1),
            bucket("b", dec!(1), 1),
            bucket("c", dec!(1), 1),
        ];
        let r = analyze_concentration(&buckets, &ConcentrationOptions::default()).unwrap();
        let sum: Decimal = r.ranked.iter().map(|b| b.share).sum();
        assert!(approx_eq(sum, Decimal::ONE, dec!(0.0000001)));
        assert!(approx_eq(r.hhi, dec!(3333.33), dec!(0.01)));
        assert!(approx_eq(r.effective_groups.unwrap(), dec!(3), dec!(0.0001)));
    }

    #[test]
    fn test_abc_monotonic_and_a_boundary() {
        let buckets: Vec<AggregateBucket> = [40, 25, 12, 8, 6, 4, 3, 1, 1]
            .iter()
            .enumerate()
            .map(|(i, v)| bucket(&format!("g{i}"), Decimal::from(*v), 1))
            .collect();
        let r = analyze_concentration(&buckets, &ConcentrationOptions::default()).unwrap();
        for pair in r.ranked.windows(2) {
            assert!(pair[0].abc_class <= pair[1].abc_class);
            if pair[0].abc_class == AbcClass::A && pair[1].abc_class != AbcClass::A {
                assert!(pair[0].cumulative_share <= dec!(0.80));
                assert!(pair[0].cumulative_share + pair[1].share > dec!(0.80));
            }
        }
    }

    #[test]
    fn test_min_support_excludes_sparse_groups() {
        let buckets = vec![
            bucket("a", dec!(50), 10),
            bucket("b", dec!(40), 10),
            bucket("c", dec!(900), 2),
        ];
        let opts = ConcentrationOptions {
            min_support: 5,
            ..Default::default()
        };
        let r = analyze_concentration(&buckets, &opts).unwrap();
        assert_eq!(r.total_groups, 2);
        assert_eq!(r.excluded_groups, 1);
        assert_eq!(r.total_value, dec!(90));
    }

    #[test]
    fn test_count_value_field() {
        let buckets = vec![bucket("a", dec!(1), 3), bucket("b", dec!(100), 1)];
        let opts = ConcentrationOptions {
            value_field: ValueField::Count,
            ..Default::default()
        };
        let r = analyze_concentration(&buckets, &opts).unwrap();
        assert_eq!(r.ranked[0].group_key.to_string(), "a");
        assert_eq!(r.ranked[0].share, dec!(0.75));
    }

    #[test]
    fn test_invalid_options_rejected() {
        let opts = ConcentrationOptions {
            top_n: 0,
            ..Default::default()
        };
        assert!(analyze_concentration(&four_buckets(), &opts).is_err());
        let opts = ConcentrationOptions {
            abc: AbcThresholds {
                a: dec!(0.95),
                b: dec!(0.80),
            },
            ..Default::default()
        };
        assert!(analyze_concentration(&four_buckets(), &opts).is_err());
    }
}
