//! The cache facade

use crate::batch::Batcher;
use crate::config::Config;
use crate::error::ModelError;
use crate::ops::GraphOps;
use crate::response::Response;
use serde_json::Value;
use std::sync::Arc;
use trellis_core::{Graph, JsonGraphEnvelope, Key, Node, Path, PathValue, Resolution, SharedGraph};
use trellis_source::{CallRequest, DataSource, LocalSource};

/// A graph cache plus the data source that fills its misses.
///
/// Clones share the cache and the batcher.
#[derive(Clone)]
pub struct Model {
    graph: SharedGraph,
    source: Option<Arc<dyn DataSource>>,
    batcher: Arc<Batcher>,
}

impl Model {
    pub fn new(source: Option<Arc<dyn DataSource>>) -> Self {
        Self::with_graph(Graph::new(), source)
    }

    /// Start from a JSON graph seed.
    pub fn seeded(seed: &Value, source: Option<Arc<dyn DataSource>>) -> Self {
        Self::with_graph(Graph::from_json(seed), source)
    }

    pub fn with_graph(graph: Graph, source: Option<Arc<dyn DataSource>>) -> Self {
        Self {
            graph: graph.shared(),
            source,
            batcher: Arc::new(Batcher::new()),
        }
    }

    /// Build from a config. The cache seed is taken out of `config`.
    pub fn from_config(config: &mut Config) -> Self {
        let source = config.build_source();
        match config.take_cache() {
            Some(seed) => Self::seeded(&seed, source),
            None => Self::new(source),
        }
    }

    pub fn graph(&self) -> &SharedGraph {
        &self.graph
    }

    pub fn source(&self) -> Option<&Arc<dyn DataSource>> {
        self.source.as_ref()
    }

    pub fn version(&self) -> u64 {
        self.graph.read().version()
    }

    /// Synchronous read of the local cache only.
    pub fn extract(&self, path: &[Key]) -> Resolution {
        self.graph.read().extract(path)
    }

    /// Paths currently queued or being fetched.
    pub fn in_flight(&self) -> usize {
        self.batcher.in_flight()
    }

    /// Serve this model's cache to another model.
    pub fn as_data_source(&self) -> Arc<dyn DataSource> {
        Arc::new(LocalSource::new(Arc::clone(&self.graph)))
    }
}

impl GraphOps for Model {
    fn get_value(&self, path: &Path) -> Response<Resolution> {
        let (local, missing) = {
            let graph = self.graph.read();
            (graph.extract(path), is_missing(&graph, path))
        };
        let source = match &self.source {
            Some(source) if missing => source,
            _ => return Response::ready(Ok(local)),
        };

        let fetch = self.batcher.fetch(source, &self.graph, std::slice::from_ref(path));
        let graph = Arc::clone(&self.graph);
        let path = path.clone();
        Response::pending(async move {
            fetch.await?;
            let resolution = graph.read().extract(&path);
            Ok(resolution)
        })
    }

    fn get(&self, paths: &[Path]) -> Response<Value> {
        let missing: Vec<Path> = {
            let graph = self.graph.read();
            paths
                .iter()
                .filter(|path| is_missing(&graph, path))
                .cloned()
                .collect()
        };

        let source = match &self.source {
            Some(source) if !missing.is_empty() => source,
            _ => return Response::ready(Ok(self.graph.read().select(paths))),
        };

        let fetch = self.batcher.fetch(source, &self.graph, &missing);
        let graph = Arc::clone(&self.graph);
        let paths = paths.to_vec();
        Response::pending(async move {
            fetch.await?;
            let selected = graph.read().select(&paths);
            Ok(selected)
        })
    }

    fn set(&self, value: PathValue) -> Response<Resolution> {
        let local = {
            let mut graph = self.graph.write();
            if let Err(e) = graph.set(&value.path, Node::from_json(&value.value)) {
                return Response::ready(Err(e.into()));
            }
            graph.extract(&value.path)
        };

        let Some(source) = self.source.clone() else {
            return Response::ready(Ok(local));
        };

        let graph = Arc::clone(&self.graph);
        Response::pending(async move {
            let envelope = JsonGraphEnvelope::from_path_values(std::slice::from_ref(&value))?;
            let stored = source.set(envelope).await?;
            let mut cache = graph.write();
            cache.merge_envelope(&stored);
            Ok(cache.extract(&value.path))
        })
    }

    fn call(&self, request: CallRequest) -> Response<Value> {
        let Some(source) = self.source.clone() else {
            return Response::ready(Err(ModelError::NoDataSource));
        };

        let graph = Arc::clone(&self.graph);
        Response::pending(async move {
            tracing::debug!("Calling {} on {}", request.call_path, source.name());
            let envelope = source.call(&request).await?;
            let mut cache = graph.write();
            cache.merge_envelope(&envelope);
            Ok(cache.select(&envelope.paths))
        })
    }

    fn invalidate(&self, paths: &[Path]) {
        let mut graph = self.graph.write();
        let dropped = paths.iter().filter(|path| graph.invalidate(path)).count();
        tracing::debug!("Invalidated {} of {} paths", dropped, paths.len());
    }

    fn without_data_source(&self) -> Model {
        Model {
            graph: Arc::clone(&self.graph),
            source: None,
            batcher: Arc::new(Batcher::new()),
        }
    }

    fn get_cache(&self) -> Value {
        self.graph.read().to_json()
    }
}

/// Unresolved locally and not already answered by the data source.
fn is_missing(graph: &Graph, path: &[Key]) -> bool {
    !graph.extract(path).is_available() && !graph.is_settled(path)
}
