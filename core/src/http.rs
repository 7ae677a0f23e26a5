//! HTTP transport seam.
//!
//! # Design
//! Requests and responses are plain data. Resources build `HttpRequest`
//! values without touching the network and hand them to an `HttpClient`,
//! which owns everything transport-shaped: base URL, TLS, headers, timeouts.
//! The client returns whatever status the server produced; interpreting it
//! is the core's job (`decode_json`), so every transport behaves the same.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;
use crate::params::Params;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// An HTTP request described as plain data.
///
/// `path` is relative to the engine's REST root, e.g. `task/abc/claim`.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub query: Params,
    pub body: Option<Value>,
}

impl HttpRequest {
    fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Params::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    pub fn with_query(mut self, query: Params) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Performs one network round trip per request.
///
/// Implementations return `Err` only for transport failures (connection
/// refused, I/O errors); HTTP error statuses come back as `Ok` data.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if (200..300).contains(&response.status) {
        return Ok(());
    }
    if response.status == 404 {
        return Err(ApiError::NotFound);
    }
    Err(ApiError::Http {
        status: response.status,
        body: response.body.clone(),
    })
}

/// Check the status and decode the body. An empty body decodes as JSON `null`.
pub(crate) fn decode_json<T: DeserializeOwned>(response: HttpResponse) -> Result<T, ApiError> {
    check_status(&response)?;
    let body = if response.body.trim().is_empty() {
        "null"
    } else {
        response.body.as_str()
    };
    serde_json::from_str(body).map_err(|e| ApiError::Deserialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    #[test]
    fn builders_set_method_path_query_and_body() {
        let mut query = Params::new();
        query.insert("maxResults".to_string(), json!(10));
        let req = HttpRequest::post("task")
            .with_query(query.clone())
            .with_body(json!({"name": "foo"}));
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "task");
        assert_eq!(req.query, query);
        assert_eq!(req.body, Some(json!({"name": "foo"})));
    }

    #[test]
    fn get_has_no_body_by_default() {
        let req = HttpRequest::get("task/1");
        assert!(req.body.is_none());
        assert!(req.query.is_empty());
    }

    #[test]
    fn decode_success_body() {
        let value: Value = decode_json(response(200, r#"{"id":"1"}"#)).unwrap();
        assert_eq!(value, json!({"id": "1"}));
    }

    #[test]
    fn decode_empty_no_content_as_null() {
        let value: Value = decode_json(response(204, "")).unwrap();
        assert_eq!(value, Value::Null);
    }

    #[test]
    fn decode_not_found() {
        let err = decode_json::<Value>(response(404, "")).unwrap_err();
        assert_eq!(err, ApiError::NotFound);
    }

    #[test]
    fn decode_server_error_keeps_body() {
        let err = decode_json::<Value>(response(500, "internal error")).unwrap_err();
        assert!(matches!(err, ApiError::Http { status: 500, ref body } if body == "internal error"));
    }

    #[test]
    fn decode_bad_json() {
        let err = decode_json::<Value>(response(200, "not json")).unwrap_err();
        assert!(matches!(err, ApiError::Deserialization(_)));
    }
}
