//! Metrics resource (`metrics`).
//!
//! The engine caps `maxResults` at 200 on its side; the client forwards the
//! value as given.

use serde_json::Value;

use super::{required, Resource};
use crate::completion::Completion;
use crate::error::ApiError;
use crate::http::HttpRequest;
use crate::params::{escape_url, Params};

pub const PATH: &str = "metrics";

#[derive(Clone)]
pub struct MetricsResource {
    resource: Resource,
}

impl std::fmt::Debug for MetricsResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsResource").field("path", &PATH).finish()
    }
}

impl MetricsResource {
    pub(crate) fn new(resource: Resource) -> Self {
        Self { resource }
    }

    pub fn build_sum(&self, name: &str, params: Params) -> Result<HttpRequest, ApiError> {
        let name = required(name, "Metrics sum needs a metric name.")?;
        Ok(HttpRequest::get(format!("{PATH}/{}/sum", escape_url(name))).with_query(params))
    }

    /// Sum of one metric, optionally bounded by `startDate`/`endDate`.
    pub fn sum(&self, name: &str, params: Params) -> Completion<Value> {
        self.resource.dispatch(self.build_sum(name, params))
    }

    pub fn build_by_interval(&self, params: Params) -> HttpRequest {
        HttpRequest::get(PATH).with_query(params)
    }

    /// Metrics aggregated per interval (`interval` in seconds, 900 by default
    /// on the engine).
    pub fn by_interval(&self, params: Params) -> Completion<Value> {
        self.resource.call(self.build_by_interval(params))
    }
}
