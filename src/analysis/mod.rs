//! Return analysis over the enriched observation stream
//!
//! Turns per-contract hold-to-expiration returns into grouped summaries:
//!
//! 1. **Bucketizer**: maps DTE, moneyness and mirrored log-moneyness onto
//!    fixed ordered bins, and delta onto data-dependent equal-width bins
//! 2. **Event tagger**: distance in days from each quote to the nearest
//!    scheduled event (earnings)
//! 3. **Aggregator**: count, mean, dispersion and Sharpe/Sortino-like ratios
//!    per group, in canonical report order
//! 4. **Sampler**: seeded stratified sample across delta bins for scatter use

mod aggregate;
mod buckets;
mod events;
mod reports;
mod sampling;

pub use aggregate::*;
pub use buckets::*;
pub use events::*;
pub use reports::*;
pub use sampling::*;

use std::fmt;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::core::OptionSide;

/// Calendar quarter of a quote date, displayed as `YYYY-Qn`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Quarter {
    pub year: i32,
    /// 1..=4
    pub quarter: u32,
}

impl Quarter {
    pub fn from_timestamp(ts: DateTime<Utc>) -> Self {
        Self {
            year: ts.year(),
            quarter: ts.month0() / 3 + 1,
        }
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-Q{}", self.year, self.quarter)
    }
}

/// A grouping dimension of a summary report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    OptionSide,
    DteBucket,
    LogMoneynessBucket,
    Quarter,
    NearEvent,
}

impl Dimension {
    /// Column header in report output
    pub fn column(&self) -> &'static str {
        match self {
            Dimension::OptionSide => "option_side",
            Dimension::DteBucket => "dte_bucket",
            Dimension::LogMoneynessBucket => "log_m_bucket",
            Dimension::Quarter => "quarter",
            Dimension::NearEvent => "near_event",
        }
    }
}

/// One component of a group key.
///
/// Within a report every position of the key holds the same variant, so the
/// derived ordering compares sides CALL before PUT, buckets by rank,
/// quarters chronologically and flags `false` before `true`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KeyValue {
    Side(OptionSide),
    Bucket(Bucket),
    Quarter(Quarter),
    Flag(bool),
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Side(side) => write!(f, "{}", side),
            KeyValue::Bucket(bucket) => f.write_str(&bucket.label),
            KeyValue::Quarter(q) => write!(f, "{}", q),
            KeyValue::Flag(flag) => write!(f, "{}", flag),
        }
    }
}
