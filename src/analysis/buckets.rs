//! Bucketizer
//!
//! Fixed ordered enumerations (DTE, moneyness, log-moneyness) and the
//! data-dependent equal-width delta bins used by the scatter sampler.

use serde::{Deserialize, Serialize};

use crate::config::{BinScheme, Closed};

/// A labelled bin carrying its position in the canonical display order
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Bucket {
    /// Position in the scheme's label list
    pub rank: usize,
    pub label: String,
}

impl Bucket {
    pub fn new(rank: usize, label: impl Into<String>) -> Self {
        Self {
            rank,
            label: label.into(),
        }
    }
}

impl BinScheme {
    /// Index of the bin holding `value`; `None` only for non-finite input.
    ///
    /// Values below the first edge land in the first bin and values above
    /// the last edge in the last, so every finite input gets a label.
    pub fn rank_of(&self, value: f64) -> Option<usize> {
        if !value.is_finite() {
            return None;
        }
        let rank = match self.closed {
            Closed::Right => self.boundaries.partition_point(|edge| *edge < value),
            Closed::Left => self.boundaries.partition_point(|edge| *edge <= value),
        };
        Some(rank)
    }

    /// Labelled bin for `value`
    pub fn bucket(&self, value: f64) -> Option<Bucket> {
        let rank = self.rank_of(value)?;
        self.labels.get(rank).map(|label| Bucket::new(rank, label.clone()))
    }

    /// All buckets in display order
    pub fn buckets(&self) -> Vec<Bucket> {
        self.labels
            .iter()
            .enumerate()
            .map(|(rank, label)| Bucket::new(rank, label.clone()))
            .collect()
    }
}

/// Equal-width bins spanning the observed range of a sample.
///
/// Bins are right-closed, with the minimum itself in the first bin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EqualWidthBins {
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

impl EqualWidthBins {
    /// Span the finite values of a sample; `None` if there are none
    pub fn spanning<I: IntoIterator<Item = f64>>(values: I, count: usize) -> Option<Self> {
        if count == 0 {
            return None;
        }
        let (min, max) = values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })?;
        Some(Self { min, max, count })
    }

    pub fn width(&self) -> f64 {
        (self.max - self.min) / self.count as f64
    }

    /// Bin index in `0..count`; values outside the span clamp to the ends
    pub fn index_of(&self, value: f64) -> Option<usize> {
        if !value.is_finite() {
            return None;
        }
        let width = self.width();
        if width <= 0.0 {
            // degenerate sample: a single value
            return Some(0);
        }
        let pos = ((value - self.min) / width).ceil();
        let idx = if pos <= 0.0 { 0 } else { pos as usize - 1 };
        Some(idx.min(self.count - 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dte_edges_right_closed() {
        let scheme = BinScheme::dte();
        let label = |v: f64| scheme.bucket(v).unwrap().label;

        assert_eq!(label(0.0), "0-7");
        assert_eq!(label(7.0), "0-7");
        assert_eq!(label(8.0), "8-14");
        assert_eq!(label(14.0), "8-14");
        assert_eq!(label(30.0), "15-30");
        assert_eq!(label(365.0), "121-365");
        assert_eq!(label(366.0), ">365");
        assert_eq!(label(5000.0), ">365");
        assert_eq!(label(-2.0), "0-7");
    }

    #[test]
    fn test_moneyness_edges_left_closed() {
        let scheme = BinScheme::moneyness();
        let label = |v: f64| scheme.bucket(v).unwrap().label;

        assert_eq!(label(0.5), "<0.7");
        assert_eq!(label(0.7), "0.7-0.85");
        assert_eq!(label(0.9499), "0.85-0.95");
        assert_eq!(label(0.95), "0.95-1.05");
        assert_eq!(label(1.0), "0.95-1.05");
        assert_eq!(label(1.3), ">1.3");
    }

    #[test]
    fn test_log_moneyness_edges() {
        let scheme = BinScheme::log_moneyness();
        let rank = |v: f64| scheme.rank_of(v).unwrap();

        assert_eq!(rank(-0.6), 0);
        assert_eq!(rank(-0.59), 1);
        assert_eq!(rank(-0.1), 2);
        assert_eq!(rank(0.0), 3);
        assert_eq!(rank(0.1), 3);
        assert_eq!(rank(0.6), 5);
        assert_eq!(rank(0.61), 6);

        assert_eq!(scheme.bucket(f64::NAN), None);
        assert_eq!(scheme.bucket(f64::INFINITY), None);
        assert_eq!(scheme.bucket(f64::NEG_INFINITY), None);
    }

    #[test]
    fn test_fixed_schemes_are_total_over_finite_input() {
        for scheme in [BinScheme::dte(), BinScheme::moneyness(), BinScheme::log_moneyness()] {
            let mut v = -1000.0;
            while v <= 1000.0 {
                let bucket = scheme.bucket(v).expect("finite input must be labelled");
                assert!(bucket.rank < scheme.len());
                assert_eq!(scheme.labels[bucket.rank], bucket.label);
                v += 0.37;
            }
            assert!(scheme.bucket(f64::MAX).is_some());
            assert!(scheme.bucket(f64::MIN).is_some());
        }
    }

    #[test]
    fn test_buckets_in_display_order() {
        let labels: Vec<String> = BinScheme::dte().buckets().into_iter().map(|b| b.label).collect();
        assert_eq!(labels, vec!["0-7", "8-14", "15-30", "31-60", "61-120", "121-365", ">365"]);
    }

    #[test]
    fn test_equal_width_bins() {
        let bins = EqualWidthBins::spanning(vec![-1.0, 1.0, 0.0, f64::NAN], 20).unwrap();
        assert_eq!(bins.min, -1.0);
        assert_eq!(bins.max, 1.0);
        assert!((bins.width() - 0.1).abs() < 1e-12);

        assert_eq!(bins.index_of(-1.0), Some(0));
        assert_eq!(bins.index_of(-0.95), Some(0));
        assert_eq!(bins.index_of(-0.85), Some(1));
        assert_eq!(bins.index_of(1.0), Some(19));
        assert_eq!(bins.index_of(5.0), Some(19));
        assert_eq!(bins.index_of(f64::NAN), None);

        assert!(EqualWidthBins::spanning(Vec::<f64>::new(), 20).is_none());

        let single = EqualWidthBins::spanning(vec![0.3, 0.3], 20).unwrap();
        assert_eq!(single.index_of(0.3), Some(0));
    }
}
