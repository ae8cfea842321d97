//! Local data source backed by another in-process graph

use crate::source::{CallRequest, DataSource, SourceError};
use trellis_core::{Graph, JsonGraphEnvelope, Path, SharedGraph};

/// Serves an in-process graph as if it were remote.
pub struct LocalSource {
    graph: SharedGraph,
}

impl LocalSource {
    pub fn new(graph: SharedGraph) -> Self {
        Self { graph }
    }

    /// Serve a copy of `seed`.
    pub fn from_json(seed: &serde_json::Value) -> Self {
        Self::new(Graph::from_json(seed).shared())
    }

    pub fn graph(&self) -> &SharedGraph {
        &self.graph
    }
}

#[async_trait::async_trait]
impl DataSource for LocalSource {
    async fn get(&self, paths: &[Path]) -> Result<JsonGraphEnvelope, SourceError> {
        let envelope = JsonGraphEnvelope::from_graph(&self.graph.read(), paths);
        Ok(envelope)
    }

    async fn set(&self, envelope: JsonGraphEnvelope) -> Result<JsonGraphEnvelope, SourceError> {
        let mut graph = self.graph.write();
        graph.merge(&envelope.json_graph);
        Ok(JsonGraphEnvelope::from_graph(&graph, &envelope.paths))
    }

    async fn call(&self, _request: &CallRequest) -> Result<JsonGraphEnvelope, SourceError> {
        Err(SourceError::Unsupported {
            source_name: self.name().to_string(),
            operation: "call",
        })
    }

    fn name(&self) -> &str {
        "local"
    }
}
