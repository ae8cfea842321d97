//! Request batching with in-flight dedup
//!
//! Misses enqueued before a batch is first polled (plus one cooperative yield)
//! travel upstream in a single `DataSource::get`. A path already in flight
//! joins the outstanding batch instead of being requested again. Paths are
//! compared in canonical form, so `[7]` and `["7"]` share one request.

use crate::error::ModelError;
use futures_util::future::{join_all, BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use trellis_core::{Path, SharedGraph};
use trellis_source::{DataSource, SourceError};

type FetchOutcome = Result<(), Arc<SourceError>>;

#[derive(Clone)]
struct Batch {
    id: u64,
    handle: Shared<BoxFuture<'static, FetchOutcome>>,
}

#[derive(Default)]
struct BatchState {
    next_id: u64,
    /// Batch still accepting paths.
    open: Option<Batch>,
    queued: Vec<Path>,
    /// Keyed by canonical path.
    in_flight: HashMap<Path, Batch>,
}

pub(crate) struct Batcher {
    state: Arc<Mutex<BatchState>>,
}

impl Batcher {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(BatchState::default())),
        }
    }

    /// Paths queued or being fetched.
    pub fn in_flight(&self) -> usize {
        self.state.lock().in_flight.len()
    }

    /// Fetch `paths` into `graph`, joining batches already carrying any of them.
    pub fn fetch(
        &self,
        source: &Arc<dyn DataSource>,
        graph: &SharedGraph,
        paths: &[Path],
    ) -> BoxFuture<'static, Result<(), ModelError>> {
        let mut batches: Vec<Batch> = Vec::new();
        {
            let mut state = self.state.lock();
            for path in paths {
                let key = Path::canonical(path);
                let existing = state.in_flight.get(&key).cloned();
                let batch = match existing {
                    Some(batch) => batch,
                    None => {
                        let open = state.open.clone();
                        let batch = match open {
                            Some(batch) => batch,
                            None => self.open_batch(&mut state, Arc::clone(source), Arc::clone(graph)),
                        };
                        state.queued.push(path.clone());
                        state.in_flight.insert(key, batch.clone());
                        batch
                    }
                };
                if !batches.iter().any(|b| b.id == batch.id) {
                    batches.push(batch);
                }
            }
        }

        async move {
            let outcomes = join_all(batches.into_iter().map(|batch| batch.handle)).await;
            for outcome in outcomes {
                outcome.map_err(ModelError::Transport)?;
            }
            Ok(())
        }
        .boxed()
    }

    fn open_batch(
        &self,
        state: &mut BatchState,
        source: Arc<dyn DataSource>,
        graph: SharedGraph,
    ) -> Batch {
        let id = state.next_id;
        state.next_id += 1;
        let shared_state = Arc::clone(&self.state);

        let handle = async move {
            tokio::task::yield_now().await;
            let paths = {
                let mut state = shared_state.lock();
                state.open = None;
                std::mem::take(&mut state.queued)
            };
            tracing::debug!(batch = id, paths = paths.len(), source = source.name(), "Fetching batch");

            let result = source.get(&paths).await;
            match &result {
                Ok(envelope) => {
                    let mut cache = graph.write();
                    cache.merge_envelope(envelope);
                    for path in &paths {
                        cache.materialize(path);
                    }
                    for path in &paths {
                        if !cache.extract(path).is_available() {
                            cache.settle(path);
                        }
                    }
                }
                Err(e) => tracing::warn!(batch = id, "Batch fetch failed: {}", e),
            }

            let mut state = shared_state.lock();
            for path in &paths {
                state.in_flight.remove(&Path::canonical(path));
            }
            result.map(|_| ()).map_err(Arc::new)
        }
        .boxed()
        .shared();

        let batch = Batch { id, handle };
        state.open = Some(batch.clone());
        batch
    }
}
