//! Delimited-table source
//!
//! Reads a header row plus string records. No interpretation happens here:
//! header cleanup and typing belong to the Schema Normalizer.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;

use crate::core::{AnalysisError, AnalysisResult};

/// Untyped table exactly as read from the input
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    /// Header cells as they appear in the file
    pub headers: Vec<String>,
    /// Records; short records are padded with empty cells
    pub records: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, records: Vec<Vec<String>>) -> Self {
        Self { headers, records }
    }

    /// Read a comma-delimited table from any byte stream
    pub fn from_reader<R: Read>(reader: R) -> AnalysisResult<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()
            .map_err(|e| AnalysisError::data(format!("Failed to read header: {}", e)))?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let width = headers.len();
        let mut records = Vec::new();

        for (line, result) in rdr.records().enumerate() {
            let record = result
                .map_err(|e| AnalysisError::data(format!("Bad record {}: {}", line + 1, e)))?;
            let mut cells: Vec<String> = record.iter().map(|c| c.to_string()).collect();
            cells.resize(width, String::new());
            records.push(cells);
        }

        Ok(Self { headers, records })
    }

    /// Read a table from a file path
    pub fn from_path(path: impl AsRef<Path>) -> AnalysisResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(AnalysisError::MissingInput(path.display().to_string()));
        }

        let file = File::open(path)?;
        let table = Self::from_reader(file)?;

        tracing::info!(
            "Read {} records x {} columns from {:?}",
            table.records.len(),
            table.headers.len(),
            path
        );
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
