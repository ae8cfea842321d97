//! The data source boundary

use serde::{Deserialize, Serialize};
use serde_json::Value;
use trellis_core::{JsonGraphEnvelope, Path};

/// Invocation of a remote function in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequest {
    /// Location of the function.
    pub call_path: Path,
    #[serde(default)]
    pub arguments: Vec<Value>,
    /// Paths to fetch relative to any references the call returns.
    #[serde(default)]
    pub ref_suffixes: Vec<Path>,
    /// Paths to fetch relative to the function's parent.
    #[serde(default)]
    pub this_paths: Vec<Path>,
}

impl CallRequest {
    pub fn new(call_path: Path, arguments: Vec<Value>) -> Self {
        Self {
            call_path,
            arguments,
            ref_suffixes: Vec::new(),
            this_paths: Vec::new(),
        }
    }

    pub fn with_ref_suffixes(mut self, suffixes: Vec<Path>) -> Self {
        self.ref_suffixes = suffixes;
        self
    }

    pub fn with_this_paths(mut self, paths: Vec<Path>) -> Self {
        self.this_paths = paths;
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("data source answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed data source response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("{source_name} data source does not support `{operation}`")]
    Unsupported {
        source_name: String,
        operation: &'static str,
    },
    #[error("{0}")]
    Other(String),
}

/// Remote end of the graph cache.
#[async_trait::async_trait]
pub trait DataSource: Send + Sync {
    /// Fetch `paths`, answering with a JSON graph fragment.
    async fn get(&self, paths: &[Path]) -> Result<JsonGraphEnvelope, SourceError>;

    /// Apply the writes carried by `envelope`; answers with the stored values.
    async fn set(&self, envelope: JsonGraphEnvelope) -> Result<JsonGraphEnvelope, SourceError>;

    /// Invoke a function in the graph.
    async fn call(&self, request: &CallRequest) -> Result<JsonGraphEnvelope, SourceError>;

    /// Get source name
    fn name(&self) -> &str;
}
