//! Analysis modules.
//!
//! Field parsing and the aggregation pass that produces both derived
//! tables.

pub mod aggregator;
pub mod fields;

pub use aggregator::*;
pub use fields::{extract_year, parse_numeric};
