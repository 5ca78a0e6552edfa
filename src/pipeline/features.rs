//! Stage 2: Feature Engine
//!
//! Per-observation features: integer DTE, moneyness (S/K), mirrored
//! log-moneyness, and their fixed-scheme buckets.

use serde::{Deserialize, Serialize};

use crate::analysis::Bucket;
use crate::config::BinConfig;
use crate::core::{AnalysisError, AnalysisResult, Column, ContractObservation, OptionSide, QuoteTable};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Derived features of one observation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractFeatures {
    /// Days to expiration, rounded half-to-even
    pub dte_int: Option<i64>,
    /// underlying / strike
    pub moneyness: Option<f64>,
    /// ln(moneyness) for calls, -ln(moneyness) for puts
    pub log_moneyness: Option<f64>,
    pub dte_bucket: Option<Bucket>,
    pub moneyness_bucket: Option<Bucket>,
    pub log_moneyness_bucket: Option<Bucket>,
}

/// Check the columns this stage reads are present
pub fn check_feature_schema(table: &QuoteTable) -> AnalysisResult<()> {
    table.require("feature engine", &[Column::UnderlyingLast, Column::Strike])?;

    let has_dates = table.has(Column::QuoteDate) && table.has(Column::ExpireDate);
    if !table.has(Column::Dte) && !has_dates {
        return Err(AnalysisError::schema(
            "feature engine",
            vec![format!(
                "{} (or {} and {})",
                Column::Dte,
                Column::QuoteDate,
                Column::ExpireDate
            )],
        ));
    }
    Ok(())
}

/// Integer DTE: the quoted DTE if present, else the date gap in days
pub fn dte_int(obs: &ContractObservation) -> Option<i64> {
    let days = obs
        .dte
        .filter(|d| d.is_finite())
        .or_else(|| obs.signed_gap_seconds().map(|s| s as f64 / SECONDS_PER_DAY))?;
    Some(days.round_ties_even() as i64)
}

/// underlying / strike; undefined for a zero or missing strike
pub fn moneyness(obs: &ContractObservation) -> Option<f64> {
    let spot = obs.underlying_price?;
    let strike = obs.strike?;
    if strike == 0.0 {
        return None;
    }
    let m = spot / strike;
    m.is_finite().then_some(m)
}

/// Natural log of moneyness, sign-flipped for puts
pub fn mirrored_log_moneyness(moneyness: Option<f64>, side: OptionSide) -> Option<f64> {
    let m = moneyness.filter(|m| *m > 0.0)?;
    let log_m = m.ln();
    Some(match side {
        OptionSide::Call => log_m,
        OptionSide::Put => -log_m,
    })
}

/// Compute all features of one observation
pub fn compute_features(obs: &ContractObservation, bins: &BinConfig) -> ContractFeatures {
    let dte_int = dte_int(obs);
    let moneyness = moneyness(obs);
    let log_moneyness = mirrored_log_moneyness(moneyness, obs.option_side);

    ContractFeatures {
        dte_int,
        moneyness,
        log_moneyness,
        dte_bucket: dte_int.and_then(|d| bins.dte.bucket(d as f64)),
        moneyness_bucket: moneyness.and_then(|m| bins.moneyness.bucket(m)),
        log_moneyness_bucket: log_moneyness.and_then(|l| bins.log_moneyness.bucket(l)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{GreekSnapshot, RawQuoteRow};
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeSet;

    fn obs(side: OptionSide, spot: Option<f64>, strike: Option<f64>, dte: Option<f64>) -> ContractObservation {
        ContractObservation {
            quote_date: Some(Utc.with_ymd_and_hms(2021, 1, 4, 0, 0, 0).unwrap()),
            expire_date: Some(Utc.with_ymd_and_hms(2021, 1, 8, 0, 0, 0).unwrap()),
            dte,
            underlying_price: spot,
            strike,
            option_side: side,
            bid: None,
            ask: None,
            last: None,
            mid: None,
            volume: None,
            open_interest: None,
            greeks: GreekSnapshot::default(),
        }
    }

    #[test]
    fn test_dte_rounding_and_fallback() {
        let bins = BinConfig::default();

        let quoted = compute_features(&obs(OptionSide::Call, Some(130.0), Some(120.0), Some(2.5)), &bins);
        assert_eq!(quoted.dte_int, Some(2));

        let quoted = compute_features(&obs(OptionSide::Call, Some(130.0), Some(120.0), Some(3.5)), &bins);
        assert_eq!(quoted.dte_int, Some(4));

        // no DTE value: four-day gap between quote and expiration
        let derived = compute_features(&obs(OptionSide::Put, Some(130.0), Some(120.0), None), &bins);
        assert_eq!(derived.dte_int, Some(4));
        assert_eq!(derived.dte_bucket.unwrap().label, "0-7");

        let mut none = obs(OptionSide::Put, Some(130.0), Some(120.0), None);
        none.quote_date = None;
        assert_eq!(dte_int(&none), None);
    }

    #[test]
    fn test_moneyness_and_mirroring() {
        let bins = BinConfig::default();
        let call = compute_features(&obs(OptionSide::Call, Some(130.0), Some(100.0), Some(4.0)), &bins);
        let put = compute_features(&obs(OptionSide::Put, Some(130.0), Some(100.0), Some(4.0)), &bins);

        assert!((call.moneyness.unwrap() - 1.3).abs() < 1e-12);
        assert_eq!(call.moneyness, put.moneyness);
        assert!((call.log_moneyness.unwrap() - 1.3_f64.ln()).abs() < 1e-12);
        assert!((put.log_moneyness.unwrap() + 1.3_f64.ln()).abs() < 1e-12);

        assert_eq!(call.moneyness_bucket.unwrap().label, ">1.3");
        assert_eq!(call.log_moneyness_bucket.unwrap().label, "0.1 – 0.3");
        assert_eq!(put.log_moneyness_bucket.unwrap().label, "-0.3 – -0.1");
    }

    #[test]
    fn test_guards() {
        let bins = BinConfig::default();

        let zero_strike = compute_features(&obs(OptionSide::Call, Some(130.0), Some(0.0), Some(4.0)), &bins);
        assert_eq!(zero_strike.moneyness, None);
        assert_eq!(zero_strike.log_moneyness, None);
        assert_eq!(zero_strike.log_moneyness_bucket, None);

        let negative = compute_features(&obs(OptionSide::Call, Some(-5.0), Some(100.0), Some(4.0)), &bins);
        assert_eq!(negative.moneyness, Some(-0.05));
        assert_eq!(negative.log_moneyness, None);

        let zero_spot = compute_features(&obs(OptionSide::Put, Some(0.0), Some(100.0), Some(4.0)), &bins);
        assert_eq!(zero_spot.log_moneyness, None);

        let missing = compute_features(&obs(OptionSide::Call, None, Some(100.0), Some(4.0)), &bins);
        assert_eq!(missing.moneyness, None);
        assert_eq!(missing.moneyness_bucket, None);
    }

    #[test]
    fn test_schema_check() {
        let with = |cols: &[Column]| {
            let present: BTreeSet<Column> = cols.iter().copied().collect();
            QuoteTable::new(present, vec![RawQuoteRow::default()])
        };

        assert!(check_feature_schema(&with(&[Column::UnderlyingLast, Column::Strike, Column::Dte])).is_ok());
        assert!(check_feature_schema(&with(&[
            Column::UnderlyingLast,
            Column::Strike,
            Column::QuoteDate,
            Column::ExpireDate
        ]))
        .is_ok());

        let err = check_feature_schema(&with(&[Column::UnderlyingLast, Column::Strike])).unwrap_err();
        assert!(err.to_string().contains("DTE"));

        let err = check_feature_schema(&with(&[Column::Dte])).unwrap_err();
        assert!(err.to_string().contains("UNDERLYING_LAST, STRIKE"));
    }
}
