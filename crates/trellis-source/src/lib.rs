//! Data sources for Trellis
//!
//! A data source answers the graph cache's misses. This crate defines the
//! boundary trait plus two implementations: an HTTP source speaking the
//! falcor-router wire format, and a local source serving another graph.

pub mod source;
pub mod sources;

#[cfg(test)]
pub mod tests;

pub use source::{CallRequest, DataSource, SourceError};
pub use sources::{create_source, SourceSpec};
pub use sources::http::HttpDataSource;
pub use sources::local::LocalSource;
