//! Stage 1: Side Expansion
//!
//! Splits each wide quote row into a CALL and a PUT observation.

use crate::core::{ContractObservation, OptionSide, QuoteTable};

/// Expand every row into one observation per side.
///
/// Output holds all CALL observations in input order followed by all PUT
/// observations in input order. A side with neither bid nor ask is still
/// emitted, with `mid` undefined.
pub fn expand_sides(table: &QuoteTable) -> Vec<ContractObservation> {
    let mut observations = Vec::with_capacity(table.rows.len() * 2);

    for side in [OptionSide::Call, OptionSide::Put] {
        observations.extend(
            table
                .rows
                .iter()
                .map(|row| ContractObservation::from_row(row, side)),
        );
    }

    tracing::debug!(
        "Expanded {} rows into {} observations",
        table.rows.len(),
        observations.len()
    );
    observations
}
