//! Schema Normalizer
//!
//! Cleans header decoration (BOM, `[`/`]`, outer whitespace), resolves each
//! canonical column through the configured alias table once, and coerces
//! cells to typed values. Unparsable cells become `None`; a missing column
//! is not an error at this stage.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::config::SchemaConfig;
use crate::core::{Column, OptionSide, QuoteTable, RawQuoteRow, SideField, SideQuote};

use super::source::RawTable;

/// Strip BOM, bracket decoration and outer whitespace from a header cell
pub fn clean_header(name: &str) -> String {
    name.replace('\u{feff}', "")
        .replace(['[', ']'], "")
        .trim()
        .to_string()
}

/// Parse a timestamp cell into UTC. Date-only values map to midnight.
pub fn parse_timestamp(cell: &str) -> Option<DateTime<Utc>> {
    let s = cell.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M%:z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc());
        }
    }
    for fmt in ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }
    None
}

/// Parse a numeric cell. Empty, unparsable and NaN cells are missing.
pub fn parse_number(cell: &str) -> Option<f64> {
    let s = cell.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Parse a count cell (volume, open interest); accepts "12" and "12.0"
pub fn parse_count(cell: &str) -> Option<u64> {
    parse_number(cell)
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v.round() as u64)
}

/// Resolves raw headers to canonical columns and types every record
pub struct SchemaNormalizer {
    config: SchemaConfig,
}

impl Default for SchemaNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaNormalizer {
    pub fn new() -> Self {
        Self {
            config: SchemaConfig::default(),
        }
    }

    pub fn with_config(config: SchemaConfig) -> Self {
        Self { config }
    }

    /// Map each canonical column to the index of the header that supplies it
    pub fn resolve_columns(&self, headers: &[String]) -> HashMap<Column, usize> {
        let cleaned: Vec<String> = headers.iter().map(|h| clean_header(h)).collect();
        let mut resolved = HashMap::new();

        for column in Column::all() {
            let found = self
                .config
                .aliases_for(column)
                .iter()
                .find_map(|alias| cleaned.iter().position(|h| h == alias));
            if let Some(idx) = found {
                resolved.insert(column, idx);
            }
        }
        resolved
    }

    /// Produce the typed, canonical table
    pub fn normalize(&self, raw: &RawTable) -> QuoteTable {
        let columns = self.resolve_columns(&raw.headers);
        let present: BTreeSet<Column> = columns.keys().copied().collect();

        let absent: Vec<String> = Column::all()
            .into_iter()
            .filter(|c| !present.contains(c))
            .map(|c| c.name())
            .collect();
        if !absent.is_empty() {
            tracing::debug!("Columns absent from input: {}", absent.join(", "));
        }

        let cell = |record: &[String], column: Column| -> Option<String> {
            columns
                .get(&column)
                .and_then(|&idx| record.get(idx))
                .cloned()
        };
        let number = |record: &[String], column: Column| -> Option<f64> {
            cell(record, column).as_deref().and_then(parse_number)
        };
        let timestamp = |record: &[String], column: Column| -> Option<DateTime<Utc>> {
            cell(record, column).as_deref().and_then(parse_timestamp)
        };
        let side = |record: &[String], side: OptionSide| -> SideQuote {
            let field = |f: SideField| number(record, Column::Side(side, f));
            SideQuote {
                bid: field(SideField::Bid),
                ask: field(SideField::Ask),
                last: field(SideField::Last),
                volume: cell(record, Column::Side(side, SideField::Volume))
                    .as_deref()
                    .and_then(parse_count),
                open_interest: cell(record, Column::Side(side, SideField::OpenInterest))
                    .as_deref()
                    .and_then(parse_count),
                greeks: crate::core::GreekSnapshot::new(
                    field(SideField::Delta),
                    field(SideField::Gamma),
                    field(SideField::Theta),
                    field(SideField::Vega),
                    field(SideField::Iv),
                ),
            }
        };

        let rows: Vec<RawQuoteRow> = raw
            .records
            .iter()
            .map(|record| RawQuoteRow {
                quote_date: timestamp(record, Column::QuoteDate),
                expire_date: timestamp(record, Column::ExpireDate),
                dte: number(record, Column::Dte),
                underlying_last: number(record, Column::UnderlyingLast),
                strike: number(record, Column::Strike),
                call: side(record, OptionSide::Call),
                put: side(record, OptionSide::Put),
            })
            .collect();

        for column in Column::all().into_iter().filter(Column::is_date) {
            if present.contains(&column) && !rows.is_empty() {
                let parsed = rows
                    .iter()
                    .filter(|r| match column {
                        Column::QuoteDate => r.quote_date.is_some(),
                        _ => r.expire_date.is_some(),
                    })
                    .count();
                if parsed == 0 {
                    tracing::warn!("No parsable timestamps in {}; all values missing", column);
                }
            }
        }

        tracing::info!(
            "Normalized {} rows, {} of {} canonical columns present",
            rows.len(),
            present.len(),
            Column::all().len()
        );

        QuoteTable::new(present, rows)
    }
}
