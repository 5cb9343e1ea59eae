//! Dataset sources.

pub mod loader;

pub use loader::{LoadOptions, RecordLoader, RecordSource, RetrievalError};
