//! Facade errors

use std::sync::Arc;
use trellis_core::GraphError;
use trellis_source::SourceError;

/// Failure of a deferred facade operation.
///
/// Missing data is not an error; reads answer `Resolution::Unavailable`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ModelError {
    /// The data source failed. Shared by every caller waiting on the same batch.
    #[error("data source failed: {0}")]
    Transport(Arc<SourceError>),
    #[error("no data source is attached")]
    NoDataSource,
    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl From<SourceError> for ModelError {
    fn from(err: SourceError) -> Self {
        ModelError::Transport(Arc::new(err))
    }
}
