//! Canonical schema of the wide quote table
//!
//! Every downstream stage addresses input columns through [`Column`]; the
//! Schema Normalizer is the only place that deals with raw header spellings.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{AnalysisError, AnalysisResult};
use super::option::OptionSide;
use super::quote::RawQuoteRow;

/// Per-side market field of the wide table (`C_*` / `P_*`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SideField {
    Bid,
    Ask,
    Last,
    Delta,
    Gamma,
    Theta,
    Vega,
    Iv,
    Volume,
    OpenInterest,
}

impl SideField {
    pub const ALL: [SideField; 10] = [
        SideField::Bid,
        SideField::Ask,
        SideField::Last,
        SideField::Delta,
        SideField::Gamma,
        SideField::Theta,
        SideField::Vega,
        SideField::Iv,
        SideField::Volume,
        SideField::OpenInterest,
    ];

    pub fn suffix(&self) -> &'static str {
        match self {
            SideField::Bid => "BID",
            SideField::Ask => "ASK",
            SideField::Last => "LAST",
            SideField::Delta => "DELTA",
            SideField::Gamma => "GAMMA",
            SideField::Theta => "THETA",
            SideField::Vega => "VEGA",
            SideField::Iv => "IV",
            SideField::Volume => "VOLUME",
            SideField::OpenInterest => "OI",
        }
    }
}

/// Canonical input column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Column {
    QuoteDate,
    ExpireDate,
    Dte,
    UnderlyingLast,
    Strike,
    Side(OptionSide, SideField),
}

impl Column {
    /// Every canonical column, common fields first, then call and put fields
    pub fn all() -> Vec<Column> {
        let mut cols = vec![
            Column::QuoteDate,
            Column::ExpireDate,
            Column::Dte,
            Column::UnderlyingLast,
            Column::Strike,
        ];
        for side in [OptionSide::Call, OptionSide::Put] {
            cols.extend(SideField::ALL.iter().map(|f| Column::Side(side, *f)));
        }
        cols
    }

    /// Canonical header name, e.g. `QUOTE_DATE` or `C_DELTA`
    pub fn name(&self) -> String {
        match self {
            Column::QuoteDate => "QUOTE_DATE".to_string(),
            Column::ExpireDate => "EXPIRE_DATE".to_string(),
            Column::Dte => "DTE".to_string(),
            Column::UnderlyingLast => "UNDERLYING_LAST".to_string(),
            Column::Strike => "STRIKE".to_string(),
            Column::Side(side, field) => format!("{}{}", side.column_prefix(), field.suffix()),
        }
    }

    pub fn is_date(&self) -> bool {
        matches!(self, Column::QuoteDate | Column::ExpireDate)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Normalized quote table: typed rows plus the set of columns the input carried
#[derive(Debug, Clone, Default)]
pub struct QuoteTable {
    /// Canonical columns resolved from the input header
    pub present: BTreeSet<Column>,
    /// One typed row per input record, in input order
    pub rows: Vec<RawQuoteRow>,
}

impl QuoteTable {
    pub fn new(present: BTreeSet<Column>, rows: Vec<RawQuoteRow>) -> Self {
        Self { present, rows }
    }

    pub fn has(&self, column: Column) -> bool {
        self.present.contains(&column)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Fail with a schema error naming every required column that is absent
    pub fn require(&self, stage: &'static str, columns: &[Column]) -> AnalysisResult<()> {
        let missing: Vec<String> = columns
            .iter()
            .filter(|c| !self.has(**c))
            .map(|c| c.name())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AnalysisError::schema(stage, missing))
        }
    }
}
