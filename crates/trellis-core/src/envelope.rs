//! Wire shapes exchanged with data sources

use crate::graph::{Graph, GraphError};
use crate::model::Node;
use crate::path::{IntoPath, Path, PathError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A JSON graph fragment plus the paths it answers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonGraphEnvelope {
    #[serde(default)]
    pub json_graph: Value,
    #[serde(default)]
    pub paths: Vec<Path>,
    /// Paths the data source says are now stale.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub invalidated: Vec<Path>,
}

impl JsonGraphEnvelope {
    /// Envelope answering `paths` from `graph`.
    pub fn from_graph(graph: &Graph, paths: &[Path]) -> Self {
        JsonGraphEnvelope {
            json_graph: graph.slice(paths).to_json(),
            paths: paths.to_vec(),
            invalidated: Vec::new(),
        }
    }

    /// Envelope carrying the writes in `values`.
    pub fn from_path_values(values: &[PathValue]) -> Result<Self, GraphError> {
        let mut graph = Graph::new();
        for value in values {
            graph.set(&value.path, Node::from_json(&value.value))?;
        }
        Ok(JsonGraphEnvelope {
            json_graph: graph.to_json(),
            paths: values.iter().map(|v| v.path.clone()).collect(),
            invalidated: Vec::new(),
        })
    }
}

/// One write: `{ path, value }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathValue {
    pub path: Path,
    pub value: Value,
}

impl PathValue {
    pub fn new(path: impl IntoPath, value: impl Into<Value>) -> Result<Self, PathError> {
        Ok(PathValue {
            path: path.into_path()?,
            value: value.into(),
        })
    }
}
