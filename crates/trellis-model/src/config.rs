//! Typed configuration and the reconfigure reducer

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use trellis_source::{create_source, DataSource, SourceSpec};

/// Options for building a model.
///
/// A direct `source` wins over `router`. The `cache` seed is consumed when a
/// model is built and never stays in a stored config.
#[derive(Clone, Default)]
pub struct Config {
    pub source: Option<Arc<dyn DataSource>>,
    pub router: Option<String>,
    pub timeout: Option<Duration>,
    pub headers: Option<BTreeMap<String, String>>,
    pub cache: Option<Value>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("source", &self.source.as_ref().map(|s| s.name()))
            .field("router", &self.router)
            .field("timeout", &self.timeout)
            .field("headers", &self.headers)
            .field("cache", &self.cache.is_some())
            .finish()
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source: Arc<dyn DataSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_router(mut self, router: impl Into<String>) -> Self {
        self.router = Some(router.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn with_cache(mut self, seed: Value) -> Self {
        self.cache = Some(seed);
        self
    }

    /// Fill every unset field except `cache` from `defaults`.
    pub fn with_defaults(self, defaults: &Config) -> Config {
        Config {
            source: self.source.or_else(|| defaults.source.clone()),
            router: self.router.or_else(|| defaults.router.clone()),
            timeout: self.timeout.or(defaults.timeout),
            headers: self.headers.or_else(|| defaults.headers.clone()),
            cache: self.cache,
        }
    }

    /// Apply a patch on top of this config.
    ///
    /// Headers are merged key by key; every other field is replaced. A
    /// cleared field falls back to nothing, not to construction options.
    pub fn reconfigure(self, patch: ConfigPatch) -> Config {
        let headers = match patch.headers {
            Patch::Set(incoming) => {
                let mut merged = self.headers.unwrap_or_default();
                merged.extend(incoming);
                Some(merged)
            }
            other => other.apply(self.headers),
        };

        Config {
            source: patch.source.apply(self.source),
            router: patch.router.apply(self.router),
            timeout: patch.timeout.apply(self.timeout),
            headers,
            cache: patch.cache.apply(self.cache),
        }
    }

    /// The data source this config describes. Every call builds a new handle
    /// for `router`, even when nothing changed.
    pub fn build_source(&self) -> Option<Arc<dyn DataSource>> {
        if let Some(source) = &self.source {
            return Some(Arc::clone(source));
        }
        self.router.as_ref().map(|router| {
            create_source(SourceSpec::Http {
                router: router.clone(),
                timeout: self.timeout,
                headers: self.headers.clone().unwrap_or_default(),
            })
        })
    }

    pub fn take_cache(&mut self) -> Option<Value> {
        self.cache.take()
    }
}

/// One field of a [`ConfigPatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum Patch<T> {
    /// Leave the current value alone.
    Keep,
    /// Remove the current value.
    Clear,
    Set(T),
}

impl<T> Patch<T> {
    pub fn apply(self, current: Option<T>) -> Option<T> {
        match self {
            Patch::Keep => current,
            Patch::Clear => None,
            Patch::Set(value) => Some(value),
        }
    }
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Keep
    }
}

/// `None` clears, `Some` sets.
impl<T> From<Option<T>> for Patch<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Patch::Set(value),
            None => Patch::Clear,
        }
    }
}

/// Partial update for [`Config::reconfigure`]. Fields left at `Keep` are untouched.
#[derive(Clone, Default)]
pub struct ConfigPatch {
    pub source: Patch<Arc<dyn DataSource>>,
    pub router: Patch<String>,
    pub timeout: Patch<Duration>,
    pub headers: Patch<BTreeMap<String, String>>,
    pub cache: Patch<Value>,
}

impl ConfigPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(mut self, source: Option<Arc<dyn DataSource>>) -> Self {
        self.source = source.into();
        self
    }

    pub fn router(mut self, router: Option<String>) -> Self {
        self.router = router.into();
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout.into();
        self
    }

    pub fn headers(mut self, headers: Option<BTreeMap<String, String>>) -> Self {
        self.headers = headers.into();
        self
    }

    pub fn cache(mut self, seed: Option<Value>) -> Self {
        self.cache = seed.into();
        self
    }
}
