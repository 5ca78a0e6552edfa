//! Aggregator
//!
//! Groups return records by a chosen set of dimensions and computes
//! per-group return statistics. Output rows follow the canonical order of
//! every dimension regardless of how groups were accumulated.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::config::AggregationConfig;
use crate::core::OptionSide;

use super::{Bucket, Dimension, KeyValue, Quarter};

/// Minimal record the Aggregator consumes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnRecord {
    pub option_side: OptionSide,
    pub dte_bucket: Option<Bucket>,
    pub log_m_bucket: Option<Bucket>,
    pub quarter: Option<Quarter>,
    pub near_event: Option<bool>,
    /// Unclamped return to expiration
    pub return_exp: Option<f64>,
}

impl ReturnRecord {
    /// Group key in dimension order; `None` if any component is undefined
    pub fn key(&self, dimensions: &[Dimension]) -> Option<Vec<KeyValue>> {
        dimensions
            .iter()
            .map(|dim| match dim {
                Dimension::OptionSide => Some(KeyValue::Side(self.option_side)),
                Dimension::DteBucket => self.dte_bucket.clone().map(KeyValue::Bucket),
                Dimension::LogMoneynessBucket => self.log_m_bucket.clone().map(KeyValue::Bucket),
                Dimension::Quarter => self.quarter.map(KeyValue::Quarter),
                Dimension::NearEvent => self.near_event.map(KeyValue::Flag),
            })
            .collect()
    }

    /// Return to aggregate, if any. NaN is excluded; infinities are kept
    /// and land on the clamp bounds.
    pub fn usable_return(&self) -> Option<f64> {
        self.return_exp.filter(|r| !r.is_nan())
    }
}

/// Statistics of one group's clamped returns
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    pub n: usize,
    pub mean_return: f64,
    /// Sample standard deviation; undefined for n <= 1
    pub std_return: Option<f64>,
    /// Sample standard deviation of negative returns; undefined below 2 of them
    pub downside_std: Option<f64>,
    /// mean / std
    pub sharpe: Option<f64>,
    /// mean / downside_std
    pub sortino: Option<f64>,
}

/// Sample standard deviation, defined for at least two values
fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let std = values.iter().std_dev();
    std.is_finite().then_some(std)
}

/// `numerator / denominator` when the denominator is finite and positive
fn guarded_ratio(numerator: f64, denominator: Option<f64>) -> Option<f64> {
    let d = denominator?;
    if d.is_finite() && d > 0.0 {
        let ratio = numerator / d;
        ratio.is_finite().then_some(ratio)
    } else {
        None
    }
}

/// Summarize already-clamped returns; `None` for an empty group
pub fn summarize(returns: &[f64]) -> Option<GroupStats> {
    if returns.is_empty() {
        return None;
    }

    let n = returns.len();
    let mean_return = returns.iter().mean();
    let std_return = sample_std(returns);

    let downside: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
    let downside_std = sample_std(&downside);

    Some(GroupStats {
        n,
        mean_return,
        std_return,
        downside_std,
        sharpe: guarded_ratio(mean_return, std_return),
        sortino: guarded_ratio(mean_return, downside_std),
    })
}

/// One row of a summary report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateCell {
    /// Key values in the report's dimension order
    pub key: Vec<KeyValue>,
    pub stats: GroupStats,
}

/// Groups return records and computes [`GroupStats`] per group
pub struct Aggregator {
    dimensions: Vec<Dimension>,
    config: AggregationConfig,
}

impl Aggregator {
    pub fn new(dimensions: Vec<Dimension>) -> Self {
        Self {
            dimensions,
            config: AggregationConfig::default(),
        }
    }

    pub fn with_config(dimensions: Vec<Dimension>, config: AggregationConfig) -> Self {
        Self { dimensions, config }
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// Aggregate records into cells sorted by canonical key order.
    ///
    /// Records with any undefined key component or an undefined/non-finite
    /// return are excluded; returns are clamped before statistics.
    pub fn aggregate(&self, records: &[ReturnRecord]) -> Vec<AggregateCell> {
        let mut groups: BTreeMap<Vec<KeyValue>, Vec<f64>> = BTreeMap::new();
        let mut excluded = 0usize;

        for record in records {
            match (record.key(&self.dimensions), record.usable_return()) {
                (Some(key), Some(ret)) => {
                    groups.entry(key).or_default().push(self.config.clamp(ret));
                }
                _ => excluded += 1,
            }
        }

        tracing::debug!(
            "Aggregated {} records into {} groups ({} excluded)",
            records.len() - excluded,
            groups.len(),
            excluded
        );

        groups
            .into_iter()
            .filter_map(|(key, returns)| summarize(&returns).map(|stats| AggregateCell { key, stats }))
            .collect()
    }
}
