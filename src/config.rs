//! Configuration for the preprocessing and reporting pipeline
//!
//! Every tunable (bin edges and labels, event calendar, sampling cap and
//! seed, return clamp) is an explicit value passed into the component that
//! uses it. Defaults reproduce the NVDA 2020-2022 study; a JSON file can
//! override any subset.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::{AnalysisError, AnalysisResult, Column};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Column alias resolution
    pub schema: SchemaConfig,
    /// Fixed bin enumerations
    pub bins: BinConfig,
    /// Event calendar for the proximity tagger
    pub events: EventConfig,
    /// Delta scatter sampling
    pub sampling: SamplingConfig,
    /// Aggregation guards
    pub aggregation: AggregationConfig,
}

impl PipelineConfig {
    /// Load overrides from a JSON file; absent fields keep their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> AnalysisResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(AnalysisError::MissingInput(path.display().to_string()));
        }

        let reader = BufReader::new(File::open(path)?);
        let config: PipelineConfig = serde_json::from_reader(reader)
            .map_err(|e| AnalysisError::Serialization(format!("{}: {}", path.display(), e)))?;

        config.validate()?;
        tracing::info!("Loaded pipeline config from {:?}", path);
        Ok(config)
    }

    /// Reject configurations that would make a stage ill-defined
    pub fn validate(&self) -> AnalysisResult<()> {
        self.bins.dte.validate("bins.dte")?;
        self.bins.moneyness.validate("bins.moneyness")?;
        self.bins.log_moneyness.validate("bins.log_moneyness")?;
        self.events.validate()?;
        self.sampling.validate()?;
        self.aggregation.validate()?;
        Ok(())
    }
}

/// Alias table mapping canonical column names to accepted header spellings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// Canonical name (e.g. `C_DELTA`) -> spellings tried in order.
    /// Columns not listed accept their canonical name and its lowercase form.
    pub aliases: BTreeMap<String, Vec<String>>,
}

impl SchemaConfig {
    /// Header spellings accepted for a canonical column, in priority order
    pub fn aliases_for(&self, column: Column) -> Vec<String> {
        let name = column.name();
        match self.aliases.get(&name) {
            Some(list) if !list.is_empty() => list.clone(),
            _ => {
                let lower = name.to_lowercase();
                vec![name, lower]
            }
        }
    }
}

/// Which side of a bin edge is closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Closed {
    /// `(a, b]`: a value on an edge belongs to the lower bin
    Right,
    /// `[a, b)`: a value on an edge belongs to the upper bin
    Left,
}

/// An ordered, closed enumeration of bins over the real line.
///
/// `boundaries` are the interior edges; the first bin extends to -∞ and the
/// last to +∞, so `labels.len() == boundaries.len() + 1`. Label order is the
/// canonical display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinScheme {
    pub boundaries: Vec<f64>,
    pub labels: Vec<String>,
    pub closed: Closed,
}

impl BinScheme {
    pub fn new(boundaries: Vec<f64>, labels: Vec<String>, closed: Closed) -> AnalysisResult<Self> {
        let scheme = Self {
            boundaries,
            labels,
            closed,
        };
        scheme.validate("bin scheme")?;
        Ok(scheme)
    }

    /// Days-to-expiration bins: edges 0,7,14,30,60,120,365, right-closed
    pub fn dte() -> Self {
        Self {
            boundaries: vec![7.0, 14.0, 30.0, 60.0, 120.0, 365.0],
            labels: labels(&["0-7", "8-14", "15-30", "31-60", "61-120", "121-365", ">365"]),
            closed: Closed::Right,
        }
    }

    /// Raw moneyness bins (S/K): edges 0.7 .. 1.3, left-closed
    pub fn moneyness() -> Self {
        Self {
            boundaries: vec![0.7, 0.85, 0.95, 1.05, 1.15, 1.3],
            labels: labels(&[
                "<0.7",
                "0.7-0.85",
                "0.85-0.95",
                "0.95-1.05",
                "1.05-1.15",
                "1.15-1.3",
                ">1.3",
            ]),
            closed: Closed::Left,
        }
    }

    /// Mirrored log-moneyness bins: edges ±0.1, ±0.3, ±0.6, right-closed
    pub fn log_moneyness() -> Self {
        Self {
            boundaries: vec![-0.6, -0.3, -0.1, 0.1, 0.3, 0.6],
            labels: labels(&[
                "≤-0.6",
                "-0.6 – -0.3",
                "-0.3 – -0.1",
                "-0.1 – 0.1",
                "0.1 – 0.3",
                "0.3 – 0.6",
                "> 0.6",
            ]),
            closed: Closed::Right,
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn validate(&self, name: &str) -> AnalysisResult<()> {
        if self.labels.len() != self.boundaries.len() + 1 {
            return Err(AnalysisError::config(format!(
                "{}: {} labels for {} boundaries (need boundaries + 1)",
                name,
                self.labels.len(),
                self.boundaries.len()
            )));
        }
        if self.boundaries.iter().any(|b| !b.is_finite()) {
            return Err(AnalysisError::config(format!(
                "{}: boundaries must be finite",
                name
            )));
        }
        if self.boundaries.windows(2).any(|w| w[0] >= w[1]) {
            return Err(AnalysisError::config(format!(
                "{}: boundaries must be strictly increasing",
                name
            )));
        }
        Ok(())
    }
}

fn labels(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Fixed bin enumerations used by the Bucketizer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BinConfig {
    pub dte: BinScheme,
    pub moneyness: BinScheme,
    pub log_moneyness: BinScheme,
}

impl Default for BinConfig {
    fn default() -> Self {
        Self {
            dte: BinScheme::dte(),
            moneyness: BinScheme::moneyness(),
            log_moneyness: BinScheme::log_moneyness(),
        }
    }
}

/// Known scheduled events (earnings) and the proximity window
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    /// Event dates (date only)
    pub dates: Vec<NaiveDate>,
    /// A quote is near an event when at most this many days away
    pub window_days: i64,
}

impl Default for EventConfig {
    fn default() -> Self {
        // NVDA earnings releases, 2020-2022
        let dates = [
            (2020, 2, 13),
            (2020, 5, 21),
            (2020, 8, 19),
            (2020, 11, 18),
            (2021, 2, 24),
            (2021, 5, 26),
            (2021, 8, 18),
            (2021, 11, 17),
            (2022, 2, 16),
            (2022, 5, 25),
            (2022, 8, 24),
            (2022, 11, 16),
        ]
        .iter()
        .filter_map(|&(y, m, d)| NaiveDate::from_ymd_opt(y, m, d))
        .collect();

        Self {
            dates,
            window_days: 3,
        }
    }
}

impl EventConfig {
    pub fn validate(&self) -> AnalysisResult<()> {
        if self.window_days < 0 {
            return Err(AnalysisError::config("events.window_days must be >= 0"));
        }
        Ok(())
    }
}

/// Stratified delta sampling for the scatter report
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Number of equal-width delta bins over the observed range
    pub delta_bins: usize,
    /// Maximum rows drawn per bin
    pub per_bin_cap: usize,
    /// RNG seed
    pub seed: u64,
    /// Rows with delta outside [delta_min, delta_max] are dropped
    pub delta_min: f64,
    pub delta_max: f64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            delta_bins: 20,
            per_bin_cap: 200,
            seed: 42,
            delta_min: -1.0,
            delta_max: 1.0,
        }
    }
}

impl SamplingConfig {
    pub fn validate(&self) -> AnalysisResult<()> {
        if self.delta_bins == 0 {
            return Err(AnalysisError::config("sampling.delta_bins must be > 0"));
        }
        if self.per_bin_cap == 0 {
            return Err(AnalysisError::config("sampling.per_bin_cap must be > 0"));
        }
        if !(self.delta_min < self.delta_max) {
            return Err(AnalysisError::config(
                "sampling.delta_min must be below sampling.delta_max",
            ));
        }
        Ok(())
    }
}

/// Guards applied before statistics are computed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Lower clamp for return_exp
    pub clamp_min: f64,
    /// Upper clamp for return_exp
    pub clamp_max: f64,
    /// Minimum mid price for the risk-adjusted report
    pub risk_min_mid: f64,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            clamp_min: -1.0,
            clamp_max: 10.0,
            risk_min_mid: 0.1,
        }
    }
}

impl AggregationConfig {
    /// Clamp a return into the configured range
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.clamp_min, self.clamp_max)
    }

    pub fn validate(&self) -> AnalysisResult<()> {
        if !(self.clamp_min.is_finite() && self.clamp_max.is_finite())
            || self.clamp_min > self.clamp_max
        {
            return Err(AnalysisError::config(
                "aggregation clamp range must be finite with clamp_min <= clamp_max",
            ));
        }
        Ok(())
    }
}
