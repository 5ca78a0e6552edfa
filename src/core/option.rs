//! Contract side and expiration key
//!
//! The side of a quote (call or put) and the `(strike, expiration)` key that
//! groups quotes sharing one settlement price.

use std::fmt;

use chrono::{DateTime, Utc};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// Contract side. `Call` orders before `Put` in every report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OptionSide {
    Call,
    Put,
}

impl OptionSide {
    /// Intrinsic value at given spot
    pub fn intrinsic(&self, spot: f64, strike: f64) -> f64 {
        match self {
            OptionSide::Call => (spot - strike).max(0.0),
            OptionSide::Put => (strike - spot).max(0.0),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OptionSide::Call => "CALL",
            OptionSide::Put => "PUT",
        }
    }

    /// Column prefix used by the wide quote table
    pub fn column_prefix(&self) -> &'static str {
        match self {
            OptionSide::Call => "C_",
            OptionSide::Put => "P_",
        }
    }
}

impl fmt::Display for OptionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Key shared by every observation of one contract series: `(strike, expiration)`.
///
/// Both sides of the same strike/expiration share the key, so they resolve to
/// the same underlying price at expiration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExpirationKey {
    pub strike: OrderedFloat<f64>,
    pub expire_date: DateTime<Utc>,
}

impl ExpirationKey {
    pub fn new(strike: f64, expire_date: DateTime<Utc>) -> Self {
        Self {
            strike: OrderedFloat(strike),
            expire_date,
        }
    }

    /// Build a key when both parts are present
    pub fn from_parts(strike: Option<f64>, expire_date: Option<DateTime<Utc>>) -> Option<Self> {
        match (strike, expire_date) {
            (Some(k), Some(exp)) if k.is_finite() => Some(Self::new(k, exp)),
            _ => None,
        }
    }

    pub fn strike(&self) -> f64 {
        self.strike.into_inner()
    }
}
