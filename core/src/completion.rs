//! Dual callback/future completion.
//!
//! # Design
//! Every resource operation returns a `Completion<T>`: a future that yields
//! `Result<T, ApiError>` and is the single source of truth for the outcome.
//! Callers that prefer callback-style notification attach an observer with
//! `on_done`; it runs exactly once, right before the future yields, and sees
//! the same outcome by reference. Without an observer nothing extra happens.
//!
//! Completions are lazy like any Rust future: the request goes out on the
//! first poll. `spawn` drives one on the tokio runtime when the caller only
//! cares about the callback.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use futures::ready;
use tokio::task::JoinHandle;

use crate::error::ApiError;

/// Observer notified with the outcome of a `Completion`.
pub type Done<T> = Box<dyn FnOnce(Result<&T, &ApiError>) + Send + 'static>;

/// The eventual outcome of one resource operation.
#[must_use = "completions do nothing unless polled or spawned"]
pub struct Completion<T> {
    inner: BoxFuture<'static, Result<T, ApiError>>,
    done: Option<Done<T>>,
}

impl<T: Send + 'static> Completion<T> {
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        Self {
            inner: Box::pin(future),
            done: None,
        }
    }

    /// A completion that fails with `err` without doing any I/O.
    pub fn rejected(err: ApiError) -> Self {
        Self::new(futures::future::ready(Err(err)))
    }

    /// A completion that succeeds with `value` without doing any I/O.
    pub fn resolved(value: T) -> Self {
        Self::new(futures::future::ready(Ok(value)))
    }

    /// Attach a callback that observes the outcome.
    ///
    /// Replaces any previously attached callback.
    pub fn on_done<F>(mut self, done: F) -> Self
    where
        F: FnOnce(Result<&T, &ApiError>) + Send + 'static,
    {
        self.done = Some(Box::new(done));
        self
    }

    /// Drive the completion to its end on the current tokio runtime.
    pub fn spawn(self) -> JoinHandle<Result<T, ApiError>> {
        tokio::spawn(self)
    }
}

impl<T> Future for Completion<T> {
    type Output = Result<T, ApiError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let outcome = ready!(this.inner.as_mut().poll(cx));
        if let Some(done) = this.done.take() {
            done(outcome.as_ref());
        }
        Poll::Ready(outcome)
    }
}

impl<T> fmt::Debug for Completion<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("has_callback", &self.done.is_some())
            .finish_non_exhaustive()
    }
}
