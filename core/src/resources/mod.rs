//! Engine resources.
//!
//! A resource is a named group of operations sharing a base path and the
//! client's transport. Each operation is split into a pure `build_*` step
//! that turns its arguments into an `HttpRequest` (or a validation error)
//! and an async step that sends it and returns a `Completion`.

pub mod metrics;
pub mod process_instance;
pub mod task;

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::completion::Completion;
use crate::error::ApiError;
use crate::http::{decode_json, HttpClient, HttpRequest};
use crate::params::escape_url;

pub use metrics::MetricsResource;
pub use process_instance::ProcessInstanceResource;
pub use task::TaskResource;

/// Base path and transport shared by every operation of one resource.
#[derive(Clone)]
pub(crate) struct Resource {
    base: &'static str,
    http: Arc<dyn HttpClient>,
}

impl Resource {
    pub(crate) fn new(base: &'static str, http: Arc<dyn HttpClient>) -> Self {
        Self { base, http }
    }

    /// `base/escaped-id[/suffix]`.
    pub(crate) fn item_path(&self, id: &str, suffix: &str) -> String {
        if suffix.is_empty() {
            format!("{}/{}", self.base, escape_url(id))
        } else {
            format!("{}/{}/{}", self.base, escape_url(id), suffix)
        }
    }

    /// Send `request` and decode the response body.
    pub(crate) fn request<T>(&self, request: HttpRequest) -> impl Future<Output = Result<T, ApiError>> + Send + 'static
    where
        T: DeserializeOwned + Send + 'static,
    {
        let http = Arc::clone(&self.http);
        async move {
            let method = request.method.as_str();
            let path = request.path.clone();
            tracing::debug!(method, path = %path, query_keys = request.query.len(), "sending request");

            let result: Result<T, ApiError> = http.send(request).await.and_then(decode_json);
            match &result {
                Ok(_) => tracing::debug!(method, path = %path, "request succeeded"),
                Err(err) => tracing::debug!(method, path = %path, error = %err, "request failed"),
            }
            result
        }
    }

    /// Send a built request, or deliver its validation error without any I/O.
    pub(crate) fn dispatch<T>(&self, request: Result<HttpRequest, ApiError>) -> Completion<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        match request {
            Ok(request) => Completion::new(self.request(request)),
            Err(err) => self.reject(err),
        }
    }

    pub(crate) fn call<T>(&self, request: HttpRequest) -> Completion<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.dispatch(Ok(request))
    }

    pub(crate) fn reject<T: Send + 'static>(&self, err: ApiError) -> Completion<T> {
        tracing::warn!(resource = self.base, error = %err, "rejected before sending");
        Completion::rejected(err)
    }
}

/// Treat an empty identifier as a missing one.
pub(crate) fn required<'a>(id: &'a str, message: &str) -> Result<&'a str, ApiError> {
    if id.trim().is_empty() {
        Err(ApiError::validation(message))
    } else {
        Ok(id)
    }
}

/// Serialize a request payload.
pub(crate) fn to_body<B: serde::Serialize + ?Sized>(body: &B) -> Result<serde_json::Value, ApiError> {
    serde_json::to_value(body).map_err(|e| ApiError::Serialization(e.to_string()))
}
