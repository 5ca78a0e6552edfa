//! Option Greeks
//!
//! Sensitivities as quoted by the data vendor. They are carried through the
//! pipeline untouched; nothing here prices an option.

use serde::{Deserialize, Serialize};

/// Vendor-supplied Greeks and implied volatility for one side of a quote
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GreekSnapshot {
    /// Delta: dV/dS
    pub delta: Option<f64>,
    /// Gamma: d²V/dS²
    pub gamma: Option<f64>,
    /// Theta: dV/dt
    pub theta: Option<f64>,
    /// Vega: dV/dσ
    pub vega: Option<f64>,
    /// Implied volatility
    pub iv: Option<f64>,
}

impl GreekSnapshot {
    pub fn new(
        delta: Option<f64>,
        gamma: Option<f64>,
        theta: Option<f64>,
        vega: Option<f64>,
        iv: Option<f64>,
    ) -> Self {
        Self {
            delta,
            gamma,
            theta,
            vega,
            iv,
        }
    }

    /// Delta restricted to the closed interval [lo, hi]
    pub fn delta_within(&self, lo: f64, hi: f64) -> Option<f64> {
        self.delta.filter(|d| d.is_finite() && *d >= lo && *d <= hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_within() {
        let g = GreekSnapshot::new(Some(0.55), None, None, None, Some(0.4));
        assert_eq!(g.delta_within(-1.0, 1.0), Some(0.55));
        assert_eq!(g.delta_within(0.6, 1.0), None);

        // Vendors occasionally emit out-of-range deltas
        let bad = GreekSnapshot::new(Some(1.7), None, None, None, None);
        assert_eq!(bad.delta_within(-1.0, 1.0), None);
    }
}
