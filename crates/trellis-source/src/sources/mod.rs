//! Data source implementations

pub mod http;
pub mod local;

use crate::source::DataSource;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use trellis_core::SharedGraph;

/// What to build a data source from.
pub enum SourceSpec {
    /// A falcor router reachable over HTTP.
    Http {
        router: String,
        timeout: Option<Duration>,
        headers: BTreeMap<String, String>,
    },
    /// Another in-process graph.
    Local(SharedGraph),
}

/// Factory function to create data sources. Every call builds a new handle.
pub fn create_source(spec: SourceSpec) -> Arc<dyn DataSource> {
    match spec {
        SourceSpec::Http {
            router,
            timeout,
            headers,
        } => Arc::new(
            http::HttpDataSource::new(router)
                .with_timeout(timeout)
                .with_headers(headers),
        ),
        SourceSpec::Local(graph) => Arc::new(local::LocalSource::new(graph)),
    }
}
