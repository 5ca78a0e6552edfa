//! Core data types
//!
//! Defines fundamental types:
//! - OptionSide / ExpirationKey: contract side and as-of join key
//! - RawQuoteRow / ContractObservation: wide input row and per-side record
//! - GreekSnapshot: vendor Greeks carried through untouched
//! - Column / QuoteTable: canonical schema of the normalized table

pub mod option;
pub mod quote;
pub mod greeks;
pub mod table;
pub mod error;

pub use option::*;
pub use quote::*;
pub use greeks::*;
pub use table::*;
pub use error::*;
