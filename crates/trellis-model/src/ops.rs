//! The graph operations shared by the facade and the reactive bridge

use crate::model::Model;
use crate::response::Response;
use serde_json::Value;
use trellis_core::{Path, PathValue, Resolution};
use trellis_source::CallRequest;

/// Operations a host can run against the cache.
///
/// Reads answer from the local graph when they can. Everything that has to
/// reach the data source is deferred into the returned [`Response`].
pub trait GraphOps {
    /// Resolve a single path, fetching it when the cache cannot answer.
    fn get_value(&self, path: &Path) -> Response<Resolution>;

    /// Resolve several paths into one JSON tree shaped like the requested paths.
    fn get(&self, paths: &[Path]) -> Response<Value>;

    fn set(&self, value: PathValue) -> Response<Resolution>;

    /// Invoke a remote function. Requires a data source.
    fn call(&self, request: CallRequest) -> Response<Value>;

    /// Drop cached values so the next read fetches them again.
    fn invalidate(&self, paths: &[Path]);

    /// A facade over the same cache that never goes upstream.
    fn without_data_source(&self) -> Model;

    fn get_cache(&self) -> Value;
}
