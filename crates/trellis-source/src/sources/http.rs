//! HTTP data source speaking the falcor-router wire format
//!
//! `get` is a `GET router?paths=<json>&method=get`; `set` and `call` are
//! form-encoded `POST`s. Every response body is a JSON graph envelope.

use crate::source::{CallRequest, DataSource, SourceError};
use reqwest::Method;
use std::collections::BTreeMap;
use std::time::Duration;
use trellis_core::{JsonGraphEnvelope, Path};

pub struct HttpDataSource {
    client: reqwest::Client,
    router: String,
    timeout: Option<Duration>,
    headers: BTreeMap<String, String>,
}

impl HttpDataSource {
    /// The router URL is not validated here; a bad URL fails the first request.
    pub fn new(router: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            router: router.into(),
            timeout: None,
            headers: BTreeMap::new(),
        }
    }

    /// Forwarded to every request as-is.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    pub fn router(&self) -> &str {
        &self.router
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub(crate) fn get_query(paths: &[Path]) -> Result<Vec<(&'static str, String)>, SourceError> {
        Ok(vec![
            ("paths", serde_json::to_string(paths)?),
            ("method", "get".to_string()),
        ])
    }

    pub(crate) fn set_form(envelope: &JsonGraphEnvelope) -> Result<Vec<(&'static str, String)>, SourceError> {
        Ok(vec![
            ("jsonGraph", serde_json::to_string(envelope)?),
            ("method", "set".to_string()),
        ])
    }

    pub(crate) fn call_form(request: &CallRequest) -> Result<Vec<(&'static str, String)>, SourceError> {
        Ok(vec![
            ("method", "call".to_string()),
            ("callPath", serde_json::to_string(&request.call_path)?),
            ("arguments", serde_json::to_string(&request.arguments)?),
            ("pathSuffixes", serde_json::to_string(&request.ref_suffixes)?),
            ("paths", serde_json::to_string(&request.this_paths)?),
        ])
    }

    fn request(&self, method: Method) -> reqwest::RequestBuilder {
        let mut builder = self.client.request(method, self.router.as_str());
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        builder
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<JsonGraphEnvelope, SourceError> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            tracing::warn!("Router {} answered {}", self.router, status);
            return Err(SourceError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait::async_trait]
impl DataSource for HttpDataSource {
    async fn get(&self, paths: &[Path]) -> Result<JsonGraphEnvelope, SourceError> {
        tracing::debug!("GET {} for {} paths", self.router, paths.len());
        let query = Self::get_query(paths)?;
        let mut envelope = self.send(self.request(Method::GET).query(&query)).await?;
        if envelope.paths.is_empty() {
            envelope.paths = paths.to_vec();
        }
        Ok(envelope)
    }

    async fn set(&self, envelope: JsonGraphEnvelope) -> Result<JsonGraphEnvelope, SourceError> {
        tracing::debug!("POST set {} for {} paths", self.router, envelope.paths.len());
        let form = Self::set_form(&envelope)?;
        self.send(self.request(Method::POST).form(&form)).await
    }

    async fn call(&self, request: &CallRequest) -> Result<JsonGraphEnvelope, SourceError> {
        tracing::debug!("POST call {} at {}", self.router, request.call_path);
        let form = Self::call_form(request)?;
        self.send(self.request(Method::POST).form(&form)).await
    }

    fn name(&self) -> &str {
        "http"
    }
}
