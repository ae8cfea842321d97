//! Trellis Model: the cache facade over a graph and its data source
//!
//! Reads answer synchronously from the cache when they can; misses are
//! batched per tick and deduplicated while in flight.

pub mod error;
pub mod response;
pub mod ops;
pub mod model;
pub mod config;
mod batch;


pub use error::ModelError;
pub use response::Response;
pub use ops::GraphOps;
pub use model::Model;
pub use config::{Config, ConfigPatch, Patch};
