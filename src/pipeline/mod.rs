//! Preprocessing pipeline
//!
//! Three-stage transform from a normalized quote table to one enriched
//! record per contract side:
//!
//! 1. **Side expansion**: each wide row becomes a CALL and a PUT observation
//! 2. **Features**: integer DTE, moneyness, mirrored log-moneyness, buckets
//! 3. **Expiration resolution**: as-of join to the underlying at
//!    expiration, then payoff and hold-to-expiration return
//!
//! Each stage returns a new record stream; nothing is mutated after the
//! stage that produced it.

mod expand;
mod features;
mod resolver;

pub use expand::*;
pub use features::*;
pub use resolver::*;

use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::core::{AnalysisResult, ContractObservation, QuoteTable};
use crate::data::{RawTable, SchemaNormalizer};

/// A contract observation with its features and expiration outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedObservation {
    pub observation: ContractObservation,
    pub features: ContractFeatures,
    pub outcome: ExpirationOutcome,
}

impl EnrichedObservation {
    /// Unclamped return to expiration
    pub fn return_exp(&self) -> Option<f64> {
        self.outcome.return_exp
    }
}

/// Runs expansion, features and expiration resolution in order
pub struct Preprocessor {
    config: PipelineConfig,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Preprocessor {
    /// Create a preprocessor with default configuration
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
        }
    }

    /// Create with custom configuration
    pub fn with_config(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Normalize a raw delimited table, then run the pipeline on it
    pub fn run_raw(&self, raw: &RawTable) -> AnalysisResult<Vec<EnrichedObservation>> {
        let table = SchemaNormalizer::with_config(self.config.schema.clone()).normalize(raw);
        self.run(&table)
    }

    /// Run all stages on a normalized table.
    ///
    /// Fails with a schema error before any stage runs if a column required
    /// by the feature or resolution stage is absent.
    pub fn run(&self, table: &QuoteTable) -> AnalysisResult<Vec<EnrichedObservation>> {
        check_feature_schema(table)?;
        check_resolver_schema(table)?;

        let observations = expand_sides(table);
        let resolved = resolve_expirations(&observations);

        let enriched: Vec<EnrichedObservation> = observations
            .into_iter()
            .map(|observation| {
                let features = compute_features(&observation, &self.config.bins);
                let s_exp = observation
                    .expiration_key()
                    .and_then(|key| resolved.get(&key).copied().flatten());
                let outcome = expiration_outcome(&observation, s_exp);
                EnrichedObservation {
                    observation,
                    features,
                    outcome,
                }
            })
            .collect();

        let with_return = enriched.iter().filter(|e| e.return_exp().is_some()).count();
        tracing::info!(
            "Preprocessed {} rows into {} observations ({} with a defined return)",
            table.len(),
            enriched.len(),
            with_return
        );

        Ok(enriched)
    }
}
