//! Deferred results

use crate::error::ModelError;
use futures_util::future::{self, BoxFuture, FutureExt};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A deferred facade result.
///
/// Work that needs the data source runs when the response is polled; a
/// response nobody polls never reaches the network.
pub struct Response<T> {
    future: BoxFuture<'static, Result<T, ModelError>>,
    ready: bool,
}

impl<T: Send + 'static> Response<T> {
    /// Already settled from the local cache.
    pub fn ready(result: Result<T, ModelError>) -> Self {
        Self {
            future: future::ready(result).boxed(),
            ready: true,
        }
    }

    /// Settles once the data source answers.
    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, ModelError>> + Send + 'static,
    {
        Self {
            future: future.boxed(),
            ready: false,
        }
    }

    /// Whether this response settles without the data source.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Run `hook` when the response settles, successfully or not.
    pub fn on_settle<F>(self, hook: F) -> Self
    where
        F: FnOnce(&Result<T, ModelError>) + Send + 'static,
    {
        let inner = self.future;
        Self {
            future: async move {
                let result = inner.await;
                hook(&result);
                result
            }
            .boxed(),
            ready: self.ready,
        }
    }
}

impl<T> Future for Response<T> {
    type Output = Result<T, ModelError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.future.as_mut().poll(cx)
    }
}
