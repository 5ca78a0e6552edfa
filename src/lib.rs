//! # Expiry Returns - Hold-to-Expiration Option Return Analysis
//!
//! A batch pipeline that turns a wide end-of-day option-chain table into
//! per-contract hold-to-expiration returns and bucketed return statistics.
//!
//! ## Overview
//!
//! Each input row carries one strike/expiration with call and put quotes
//! side by side. The pipeline:
//! - **Normalizes** messy headers and coerces types (missing, never zero)
//! - **Expands** each row into a CALL and a PUT observation
//! - **Enriches** each observation with DTE, moneyness and mirrored
//!   log-moneyness buckets
//! - **Resolves** the underlying at expiration with an as-of join over the
//!   chain itself, then payoff and return
//! - **Aggregates** clamped returns into Sharpe/Sortino-style summaries
//!   by side, DTE, log-moneyness, quarter and earnings proximity
//!
//! ## Usage
//!
//! ```rust,no_run
//! use expiry_returns::prelude::*;
//!
//! let raw = RawTable::from_path("options.csv").unwrap();
//! let enriched = Preprocessor::new().run_raw(&raw).unwrap();
//! write_enriched_csv("enriched.csv", &enriched).unwrap();
//!
//! let report = ReportBuilder::new().build(ReportKind::ReturnsByBucket, &enriched);
//! write_report("returns_by_bucket.csv", &report).unwrap();
//! ```
//!
//! ## What This Does NOT Do
//!
//! - Price options or estimate Greeks (vendor Greeks pass through)
//! - Model early exercise, fees or slippage
//! - Fetch data from any market source

pub mod analysis;
pub mod config;
pub mod core;
pub mod data;
pub mod pipeline;

/// Prelude with commonly used types
pub mod prelude {
    // Core types
    pub use crate::core::{
        AnalysisError, AnalysisResult, Column, ContractObservation, ExpirationKey, GreekSnapshot,
        OptionSide, QuoteTable, RawQuoteRow, SideQuote,
    };

    // Configuration
    pub use crate::config::{
        AggregationConfig, BinConfig, BinScheme, Closed, EventConfig, PipelineConfig,
        SamplingConfig, SchemaConfig,
    };

    // Data IO
    pub use crate::data::{
        read_enriched_csv, run_to_dir, write_enriched_csv, write_report, ExportRow, RawTable,
        SchemaNormalizer,
    };

    // Pipeline
    pub use crate::pipeline::{
        ContractFeatures, EnrichedObservation, ExpirationOutcome, Preprocessor,
    };

    // Analysis
    pub use crate::analysis::{
        stratified_sample, AggregateCell, Aggregator, Bucket, Dimension, EventCalendar,
        GroupStats, KeyValue, Quarter, Report, ReportBuilder, ReportKind, ReturnRecord,
        ScatterRow,
    };
}

// Re-export main types at crate root
pub use crate::core::{AnalysisError, AnalysisResult};
pub use crate::pipeline::Preprocessor;
