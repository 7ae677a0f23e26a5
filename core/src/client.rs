//! Entry point binding resources to a transport.
//!
//! # Design
//! `EngineClient` holds only the shared `HttpClient`. Resource handles are
//! cheap clones of it bound to their base path; no call mutates anything
//! shared, so handles can be used from many tasks at once.

use std::sync::Arc;

use crate::config::ClientConfig;
use crate::http::HttpClient;
use crate::resources::{metrics, process_instance, task, Resource};
use crate::resources::{MetricsResource, ProcessInstanceResource, TaskResource};
use crate::transport::UreqHttpClient;

#[derive(Clone)]
pub struct EngineClient {
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for EngineClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineClient").finish_non_exhaustive()
    }
}

impl EngineClient {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self { http }
    }

    /// Client talking to `config.base_url` through the ureq transport.
    pub fn from_config(config: &ClientConfig) -> Self {
        tracing::debug!(base_url = %config.base_url, timeout_ms = config.timeout_ms, "creating engine client");
        Self::new(Arc::new(UreqHttpClient::new(config)))
    }

    pub fn task(&self) -> TaskResource {
        TaskResource::new(self.resource(task::PATH))
    }

    pub fn process_instance(&self) -> ProcessInstanceResource {
        ProcessInstanceResource::new(self.resource(process_instance::PATH))
    }

    pub fn metrics(&self) -> MetricsResource {
        MetricsResource::new(self.resource(metrics::PATH))
    }

    fn resource(&self, base: &'static str) -> Resource {
        Resource::new(base, Arc::clone(&self.http))
    }
}
