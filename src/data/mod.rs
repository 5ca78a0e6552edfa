//! Data input and output
//!
//! Handles:
//! - Reading the raw delimited quote table
//! - Header cleanup, column resolution and type coercion
//! - CSV export/import of the enriched table and reports

pub mod export;
pub mod normalize;
pub mod source;

pub use export::*;
pub use normalize::*;
pub use source::*;
