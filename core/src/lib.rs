//! Client library for a workflow engine's REST API.
//!
//! # Overview
//! Resource handles (`task`, `process-instance`, `metrics`) turn method calls
//! into `HttpRequest` values, send them through an `HttpClient`, and decode
//! the responses. Every operation returns a `Completion`, a future that can
//! also notify a callback.
//!
//! # Design
//! - Each operation is a pure `build_*` step plus an async send, so request
//!   shapes are testable without a transport.
//! - Query endpoints split their parameters: paging keys travel on the query
//!   string, the rest forms the filter body (`params::split_params`).
//! - Task lists are compiled on arrival: each task gets its process
//!   definition nested under `_embedded` (`embed::embed_process_definitions`).
//! - Missing identifiers are reported as `ApiError::Validation` through the
//!   same `Completion`, without issuing a request.

pub mod client;
pub mod completion;
pub mod config;
pub mod embed;
pub mod error;
pub mod http;
pub mod params;
pub mod resources;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod transport;
pub mod types;

pub use client::EngineClient;
pub use completion::{Completion, Done};
pub use config::ClientConfig;
pub use embed::embed_process_definitions;
pub use error::ApiError;
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use params::{escape_url, split_params, to_params, Params, RoutedParams, PAGINATION_PARAMS};
pub use resources::{MetricsResource, ProcessInstanceResource, TaskResource};
pub use transport::UreqHttpClient;
pub use types::{
    FormVariablesQuery, IdentityLink, Modification, ProcessDefinitionRecord, StartProcess, TaskEmbedded,
    TaskList, TaskListEmbedded, TaskRecord, VariablesQuery,
};
