//! Report rendering for the derived tables.

pub mod generator;

pub use generator::{build_report, fallback_summary, render};
