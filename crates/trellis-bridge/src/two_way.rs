//! Two-way accessor over one path

use crate::bridge::Bridge;
use serde_json::Value;
use trellis_core::{Path, PathValue, Resolution};
use trellis_model::GraphOps;

/// Reads and writes one fixed path, for form bindings and the like.
#[derive(Clone)]
pub struct TwoWay {
    bridge: Bridge,
    path: Path,
}

impl TwoWay {
    pub(crate) fn new(bridge: Bridge, path: Path) -> Self {
        Self { bridge, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Synchronous read of the current snapshot. Never fetches.
    pub fn get(&self) -> Resolution {
        self.bridge.model().extract(&self.path)
    }

    /// Write `value`. The local cache changes immediately; the upstream write
    /// runs in the background and signals the host when done.
    pub fn set(&self, value: impl Into<Value>) {
        let path = self.path.clone();
        let response = self.bridge.model().set(PathValue {
            path: path.clone(),
            value: value.into(),
        });
        self.bridge.spawn(async move {
            if let Err(e) = response.await {
                tracing::warn!("Write to {} failed: {}", path, e);
            }
        });
    }

    /// Getter with `None`, setter with `Some`.
    pub fn call(&self, value: Option<Value>) -> Option<Resolution> {
        match value {
            Some(value) => {
                self.set(value);
                None
            }
            None => Some(self.get()),
        }
    }
}

impl std::fmt::Debug for TwoWay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwoWay").field("path", &self.path).finish()
    }
}
