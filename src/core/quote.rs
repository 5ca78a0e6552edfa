//! Quote data
//!
//! The wide input row (both sides side by side) and the per-side contract
//! observation the rest of the pipeline works on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::greeks::GreekSnapshot;
use super::option::{ExpirationKey, OptionSide};

/// Market fields of one side of a wide quote row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SideQuote {
    /// Bid price
    pub bid: Option<f64>,
    /// Ask price
    pub ask: Option<f64>,
    /// Last traded price
    pub last: Option<f64>,
    /// Trading volume
    pub volume: Option<u64>,
    /// Open interest
    pub open_interest: Option<u64>,
    /// Vendor Greeks
    pub greeks: GreekSnapshot,
}

impl SideQuote {
    /// Mid price; undefined unless both bid and ask are quoted
    pub fn mid(&self) -> Option<f64> {
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) => Some((bid + ask) / 2.0),
            _ => None,
        }
    }
}

/// One row of the unprocessed wide table, after type coercion
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawQuoteRow {
    pub quote_date: Option<DateTime<Utc>>,
    pub expire_date: Option<DateTime<Utc>>,
    /// Days to expiration as quoted (may be fractional)
    pub dte: Option<f64>,
    pub underlying_last: Option<f64>,
    pub strike: Option<f64>,
    pub call: SideQuote,
    pub put: SideQuote,
}

impl RawQuoteRow {
    pub fn side(&self, side: OptionSide) -> &SideQuote {
        match side {
            OptionSide::Call => &self.call,
            OptionSide::Put => &self.put,
        }
    }
}

/// A single side of a quote: the unit every later stage operates on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractObservation {
    pub quote_date: Option<DateTime<Utc>>,
    pub expire_date: Option<DateTime<Utc>>,
    pub dte: Option<f64>,
    /// Underlying price sampled on `quote_date`
    pub underlying_price: Option<f64>,
    pub strike: Option<f64>,
    pub option_side: OptionSide,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub last: Option<f64>,
    /// (bid + ask) / 2, undefined when either is missing
    pub mid: Option<f64>,
    pub volume: Option<u64>,
    pub open_interest: Option<u64>,
    pub greeks: GreekSnapshot,
}

impl ContractObservation {
    /// Project one side out of a wide row
    pub fn from_row(row: &RawQuoteRow, option_side: OptionSide) -> Self {
        let quote = row.side(option_side);
        Self {
            quote_date: row.quote_date,
            expire_date: row.expire_date,
            dte: row.dte,
            underlying_price: row.underlying_last,
            strike: row.strike,
            option_side,
            bid: quote.bid,
            ask: quote.ask,
            last: quote.last,
            mid: quote.mid(),
            volume: quote.volume,
            open_interest: quote.open_interest,
            greeks: quote.greeks,
        }
    }

    /// Key used for the expiration as-of join
    pub fn expiration_key(&self) -> Option<ExpirationKey> {
        ExpirationKey::from_parts(self.strike, self.expire_date)
    }

    /// Signed distance from quote to expiration in seconds (negative if the
    /// quote post-dates its own expiration)
    pub fn signed_gap_seconds(&self) -> Option<i64> {
        match (self.quote_date, self.expire_date) {
            (Some(quote), Some(expire)) => Some((expire - quote).num_seconds()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_row() -> RawQuoteRow {
        RawQuoteRow {
            quote_date: Some(Utc.with_ymd_and_hms(2021, 1, 4, 0, 0, 0).unwrap()),
            expire_date: Some(Utc.with_ymd_and_hms(2021, 1, 8, 0, 0, 0).unwrap()),
            dte: None,
            underlying_last: Some(130.0),
            strike: Some(120.0),
            call: SideQuote {
                bid: Some(11.0),
                ask: Some(13.0),
                ..Default::default()
            },
            put: SideQuote {
                bid: Some(0.5),
                ask: Some(0.7),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_mid_requires_both_sides_of_book() {
        let quote = SideQuote {
            bid: Some(1.0),
            ..Default::default()
        };
        assert_eq!(quote.mid(), None);

        let quote = SideQuote {
            bid: Some(1.0),
            ask: Some(1.5),
            ..Default::default()
        };
        assert_eq!(quote.mid(), Some(1.25));
    }

    #[test]
    fn test_observation_from_row() {
        let row = sample_row();
        let call = ContractObservation::from_row(&row, OptionSide::Call);
        let put = ContractObservation::from_row(&row, OptionSide::Put);

        assert!((call.mid.unwrap() - 12.0).abs() < 1e-12);
        assert!((put.mid.unwrap() - 0.6).abs() < 1e-12);
        assert_eq!(call.strike, put.strike);
        assert_eq!(call.expiration_key(), put.expiration_key());
        assert_eq!(call.signed_gap_seconds(), Some(4 * 86_400));
    }
}
