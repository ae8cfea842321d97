//! Bridge errors

use trellis_core::PathError;

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("a tokio runtime is required to drive background fetches")]
    NoRuntime,
    #[error(transparent)]
    Path(#[from] PathError),
}
