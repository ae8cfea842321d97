//! The reactive binding

use crate::error::BridgeError;
use crate::scheduler::Scheduler;
use crate::two_way::TwoWay;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;
use tokio::runtime::Handle;
use trellis_core::{parse, Key, Path, PathValue, Resolution};
use trellis_model::{Config, ConfigPatch, GraphOps, Model, Response};
use trellis_source::{CallRequest, DataSource};

struct Session {
    config: Config,
    model: Model,
}

struct Inner {
    /// Construction options without the cache seed.
    defaults: Config,
    session: RwLock<Session>,
    scheduler: Arc<dyn Scheduler>,
    runtime: Handle,
}

/// A cache facade that tells the host when to re-evaluate.
///
/// Clones share the same session.
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<Inner>,
}

impl Bridge {
    /// Must be called inside a tokio runtime; background fetches run on it.
    pub fn new(options: Config, scheduler: Arc<dyn Scheduler>) -> Result<Self, BridgeError> {
        let runtime = Handle::try_current().map_err(|_| BridgeError::NoRuntime)?;
        Ok(Self::with_runtime(options, scheduler, runtime))
    }

    pub fn with_runtime(options: Config, scheduler: Arc<dyn Scheduler>, runtime: Handle) -> Self {
        let mut config = options.clone();
        let model = Model::from_config(&mut config);
        let mut defaults = options;
        defaults.cache = None;

        Self {
            inner: Arc::new(Inner {
                defaults,
                session: RwLock::new(Session { config, model }),
                scheduler,
                runtime,
            }),
        }
    }

    /// The model currently bound.
    pub fn model(&self) -> Model {
        self.inner.session.read().model.clone()
    }

    /// The stored config. Never carries a cache seed.
    pub fn config(&self) -> Config {
        self.inner.session.read().config.clone()
    }

    pub fn data_source(&self) -> Option<Arc<dyn DataSource>> {
        self.inner.session.read().model.source().cloned()
    }

    /// Read the value at the path formed by `keys`, one key per argument.
    ///
    /// A single string is one key: `read(["a.b"])` looks up the key `"a.b"`.
    pub fn read<I, K>(&self, keys: I) -> Resolution
    where
        I: IntoIterator<Item = K>,
        K: Into<Key>,
    {
        self.read_path(&Path::from_args(keys))
    }

    /// Read `path` from the current snapshot.
    ///
    /// On a miss the fetch runs in the background and the host is signalled
    /// when it settles; the call itself answers `Unavailable`.
    pub fn read_path(&self, path: &Path) -> Resolution {
        let model = self.model();
        let local = model.extract(path);
        if local.is_available() || model.source().is_none() {
            return local;
        }

        let response = model.get_value(path);
        if response.is_ready() {
            return local;
        }
        let path = path.clone();
        self.spawn(async move {
            if let Err(e) = response.await {
                tracing::warn!("Background fetch of {} failed: {}", path, e);
            }
        });
        local
    }

    /// Parse `syntax` once and bind an accessor to it.
    pub fn two_way(&self, syntax: &str) -> Result<TwoWay, BridgeError> {
        Ok(TwoWay::new(self.clone(), parse(syntax)?))
    }

    /// Rebuild the source, model and cache from `options`, falling back to
    /// the construction options for anything unset.
    pub fn configure(&self, options: Config) {
        let session = open_session(options.with_defaults(&self.inner.defaults));
        *self.inner.session.write() = session;
        self.inner.scheduler.schedule();
    }

    /// Rebuild from the current config with `patch` applied.
    ///
    /// The patch is applied under the session lock, so concurrent patches
    /// all land.
    pub fn reconfigure(&self, patch: ConfigPatch) {
        {
            let mut session = self.inner.session.write();
            let config = session.config.clone().reconfigure(patch);
            *session = open_session(config);
        }
        self.inner.scheduler.schedule();
    }

    /// Signal the host once `response` settles.
    fn signalled<T: Send + 'static>(&self, response: Response<T>) -> Response<T> {
        let scheduler = Arc::clone(&self.inner.scheduler);
        response.on_settle(move |_| scheduler.schedule())
    }

    /// Drive a response without a caller awaiting it.
    pub(crate) fn spawn<F>(&self, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let scheduler = Arc::clone(&self.inner.scheduler);
        self.inner.runtime.spawn(async move {
            future.await;
            scheduler.schedule();
        });
    }
}

fn open_session(mut config: Config) -> Session {
    let model = Model::from_config(&mut config);
    tracing::info!(
        "Configured binding (source: {}, router: {})",
        model.source().map(|s| s.name()).unwrap_or("none"),
        config.router.as_deref().unwrap_or("none")
    );
    Session { config, model }
}

impl GraphOps for Bridge {
    fn get_value(&self, path: &Path) -> Response<Resolution> {
        let response = self.model().get_value(path);
        if response.is_ready() {
            return response;
        }
        self.signalled(response)
    }

    fn get(&self, paths: &[Path]) -> Response<Value> {
        let response = self.model().get(paths);
        if response.is_ready() {
            return response;
        }
        self.signalled(response)
    }

    fn set(&self, value: PathValue) -> Response<Resolution> {
        self.signalled(self.model().set(value))
    }

    fn call(&self, request: CallRequest) -> Response<Value> {
        let response = self.model().call(request);
        if response.is_ready() {
            return response;
        }
        self.signalled(response)
    }

    fn invalidate(&self, paths: &[Path]) {
        self.model().invalidate(paths);
    }

    fn without_data_source(&self) -> Model {
        self.model().without_data_source()
    }

    fn get_cache(&self) -> Value {
        self.model().get_cache()
    }
}
