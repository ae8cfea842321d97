//! Trellis Core: JSON graph cache, paths and the reference-following extractor

pub mod path;
pub mod model;
pub mod extract;
pub mod graph;
pub mod envelope;


#[cfg(test)]
pub mod test_utils;

pub use path::{Key, Path, PathError, IntoPath, parse};
pub use model::{Node, Resolution};
pub use extract::{extract, MAX_REF_HOPS};
pub use graph::{Graph, GraphError, SharedGraph};
pub use envelope::{JsonGraphEnvelope, PathValue};
