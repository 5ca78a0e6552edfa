//! Stage 3: Expiration Resolution
//!
//! As-of join from each `(strike, expiration)` key to the underlying price
//! at expiration, using the observation stream itself as the underlying's
//! time series. Then payoff and hold-to-expiration return per observation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::{AnalysisResult, Column, ContractObservation, ExpirationKey, QuoteTable};

/// Underlying at expiration plus the derived payoff and return
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpirationOutcome {
    /// Underlying price at expiration
    pub s_exp: Option<f64>,
    /// Intrinsic value at expiration, >= 0 when defined
    pub payoff: Option<f64>,
    /// (payoff - mid) / mid, unclamped
    pub return_exp: Option<f64>,
}

/// One usable member of an expiration group
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GapCandidate {
    /// expire_date - quote_date in seconds
    pub signed_gap: i64,
    pub underlying_price: f64,
}

/// Check the columns this stage reads are present
pub fn check_resolver_schema(table: &QuoteTable) -> AnalysisResult<()> {
    table.require(
        "expiration resolver",
        &[
            Column::QuoteDate,
            Column::ExpireDate,
            Column::UnderlyingLast,
            Column::Strike,
        ],
    )
}

/// Pick the member that stands for "the underlying at expiration".
///
/// Prefers the smallest non-negative gap (latest quote not after
/// expiration); when every quote post-dates expiration, falls back to the
/// smallest absolute gap. Ties go to the earliest member.
pub fn select_member(candidates: &[GapCandidate]) -> Option<usize> {
    let on_or_before = candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| c.signed_gap >= 0)
        .min_by_key(|(i, c)| (c.signed_gap, *i))
        .map(|(i, _)| i);

    on_or_before.or_else(|| {
        candidates
            .iter()
            .enumerate()
            .min_by_key(|(i, c)| (c.signed_gap.unsigned_abs(), *i))
            .map(|(i, _)| i)
    })
}

/// Resolve the underlying price at expiration for every key in the stream.
///
/// Members with a missing quote date or underlying price are ignored; a key
/// left with no members resolves to `None`.
pub fn resolve_expirations(observations: &[ContractObservation]) -> BTreeMap<ExpirationKey, Option<f64>> {
    let mut groups: BTreeMap<ExpirationKey, Vec<GapCandidate>> = BTreeMap::new();

    for obs in observations {
        let Some(key) = obs.expiration_key() else {
            continue;
        };
        let members = groups.entry(key).or_default();

        let price = obs.underlying_price.filter(|p| p.is_finite());
        if let (Some(signed_gap), Some(underlying_price)) = (obs.signed_gap_seconds(), price) {
            members.push(GapCandidate {
                signed_gap,
                underlying_price,
            });
        }
    }

    let resolved: BTreeMap<ExpirationKey, Option<f64>> = groups
        .into_iter()
        .map(|(key, members)| {
            let s_exp = select_member(&members).map(|i| members[i].underlying_price);
            (key, s_exp)
        })
        .collect();

    let undefined = resolved.values().filter(|v| v.is_none()).count();
    tracing::info!(
        "Resolved {} expiration keys ({} without usable quotes)",
        resolved.len(),
        undefined
    );
    resolved
}

/// Payoff and return of one observation given the resolved S_exp
pub fn expiration_outcome(obs: &ContractObservation, s_exp: Option<f64>) -> ExpirationOutcome {
    let payoff = match (s_exp, obs.strike) {
        (Some(s), Some(k)) => Some(obs.option_side.intrinsic(s, k)),
        _ => None,
    };

    let return_exp = match (payoff, obs.mid) {
        (Some(p), Some(mid)) if p.is_finite() && mid.is_finite() && mid > 0.0 => {
            Some((p - mid) / mid)
        }
        _ => None,
    };

    ExpirationOutcome {
        s_exp,
        payoff,
        return_exp,
    }
}
