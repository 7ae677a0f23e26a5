//! Test doubles for the transport seam.
//!
//! `RecordingHttpClient` records every request it receives and answers with
//! canned responses in FIFO order, falling back to `200 null` once the queue
//! is empty.
//!
//! ```rust,ignore
//! use engine_client::testing::RecordingHttpClient;
//! use engine_client::EngineClient;
//! use std::sync::Arc;
//!
//! let http = Arc::new(RecordingHttpClient::new());
//! let client = EngineClient::new(http.clone());
//! let _ = client.task();
//! assert!(http.requests().is_empty());
//! ```

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ApiError;
use crate::http::{HttpClient, HttpRequest, HttpResponse};

#[derive(Debug, Default)]
pub struct RecordingHttpClient {
    requests: Mutex<Vec<HttpRequest>>,
    responses: Mutex<VecDeque<Result<HttpResponse, ApiError>>>,
}

impl RecordingHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response with the given status and JSON body.
    pub fn respond(&self, status: u16, body: Value) -> &Self {
        let body = if body.is_null() {
            String::new()
        } else {
            body.to_string()
        };
        self.push(Ok(HttpResponse {
            status,
            headers: Vec::new(),
            body,
        }))
    }

    /// Queue a transport failure.
    pub fn fail(&self, err: ApiError) -> &Self {
        self.push(Err(err))
    }

    fn push(&self, response: Result<HttpResponse, ApiError>) -> &Self {
        self.responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(response);
        self
    }

    /// Every request sent so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// The most recent request, if any.
    pub fn last_request(&self) -> Option<HttpRequest> {
        self.requests().pop()
    }
}

#[async_trait]
impl HttpClient for RecordingHttpClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request);
        self.responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
            .unwrap_or_else(|| {
                Ok(HttpResponse {
                    status: 200,
                    headers: Vec::new(),
                    body: String::new(),
                })
            })
    }
}
