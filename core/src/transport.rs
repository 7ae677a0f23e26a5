//! Default `HttpClient` backed by ureq.
//!
//! ureq is blocking, so each round trip runs on tokio's blocking pool. Error
//! statuses are returned as data; only I/O failures become `Err`. Bodies are
//! read up to `ClientConfig::max_body_bytes` (64 MiB by default); a larger
//! one fails with `ApiError::Transport` naming the limit.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use crate::params::Params;

#[derive(Clone)]
pub struct UreqHttpClient {
    base_url: Arc<str>,
    agent: ureq::Agent,
    max_body_bytes: u64,
}

impl std::fmt::Debug for UreqHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UreqHttpClient")
            .field("base_url", &self.base_url)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish_non_exhaustive()
    }
}

impl UreqHttpClient {
    pub fn new(config: &ClientConfig) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(Duration::from_millis(config.timeout_ms)))
            .build()
            .new_agent();
        Self {
            base_url: config.base_url.trim_end_matches('/').into(),
            agent,
            max_body_bytes: config.max_body_bytes,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let url = self.url(&request.path);
        let query = render_query(&request.query);
        let body = request
            .body
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| ApiError::Serialization(e.to_string()))?;

        let result = match (request.method, body) {
            (HttpMethod::Get, _) => with_query(self.agent.get(&url), &query).call(),
            (HttpMethod::Delete, _) => with_query(self.agent.delete(&url), &query).call(),
            (HttpMethod::Post, Some(body)) => with_query(self.agent.post(&url), &query)
                .content_type("application/json")
                .send(body.as_bytes()),
            (HttpMethod::Post, None) => with_query(self.agent.post(&url), &query).send_empty(),
            (HttpMethod::Put, Some(body)) => with_query(self.agent.put(&url), &query)
                .content_type("application/json")
                .send(body.as_bytes()),
            (HttpMethod::Put, None) => with_query(self.agent.put(&url), &query).send_empty(),
        };
        let mut response = result.map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let body = response
            .body_mut()
            .with_config()
            .limit(self.max_body_bytes)
            .read_to_string()
            .map_err(|e| match e {
                ureq::Error::BodyExceedsLimit(limit) => {
                    ApiError::Transport(format!("response body exceeds {limit} bytes"))
                }
                other => ApiError::Transport(other.to_string()),
            })?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[async_trait]
impl HttpClient for UreqHttpClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let client = self.clone();
        tokio::task::spawn_blocking(move || client.execute(request))
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?
    }
}

fn with_query<B>(mut builder: ureq::RequestBuilder<B>, query: &[(String, String)]) -> ureq::RequestBuilder<B> {
    for (key, value) in query {
        builder = builder.query(key, value);
    }
    builder
}

/// Render query parameters as strings. `null` values are dropped and arrays
/// are comma-joined.
fn render_query(query: &Params) -> Vec<(String, String)> {
    query
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| (key.clone(), render_value(value)))
        .collect()
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(render_value).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn url_joins_base_and_path() {
        let client = UreqHttpClient::new(&ClientConfig::new("http://localhost:3000/engine-rest/"));
        assert_eq!(client.url("task/1"), "http://localhost:3000/engine-rest/task/1");
        assert_eq!(client.url("/task"), "http://localhost:3000/engine-rest/task");
    }

    #[test]
    fn query_values_are_rendered_as_text() {
        let query = match json!({
            "firstResult": 0,
            "deserializeValues": false,
            "assignee": "kermit",
            "variableNames": ["a", "b"],
            "skipped": null
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let rendered = render_query(&query);
        assert!(rendered.contains(&("firstResult".to_string(), "0".to_string())));
        assert!(rendered.contains(&("deserializeValues".to_string(), "false".to_string())));
        assert!(rendered.contains(&("assignee".to_string(), "kermit".to_string())));
        assert!(rendered.contains(&("variableNames".to_string(), "a,b".to_string())));
        assert_eq!(rendered.len(), 4);
    }
}
