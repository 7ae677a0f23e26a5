//! Client configuration.

use serde::{Deserialize, Serialize};

pub const BASE_URL_ENV: &str = "ENGINE_REST_URL";
pub const TIMEOUT_ENV: &str = "ENGINE_REST_TIMEOUT_MS";

/// Where the engine's REST API lives and how long a round trip may take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,

    /// Largest response body the transport will read.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: u64,
}

fn default_base_url() -> String {
    "http://localhost:8080/engine-rest".to_string()
}

fn default_timeout() -> u64 {
    30_000
}

fn default_max_body_bytes() -> u64 {
    64 * 1024 * 1024
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: u64) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    /// Read `ENGINE_REST_URL` and `ENGINE_REST_TIMEOUT_MS`, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = match lookup(BASE_URL_ENV) {
            Some(url) => Self::new(&url),
            None => Self::default(),
        };
        if let Some(raw) = lookup(TIMEOUT_ENV) {
            match raw.parse() {
                Ok(timeout_ms) => config.timeout_ms = timeout_ms,
                Err(_) => tracing::warn!(value = %raw, "ignoring unparsable {TIMEOUT_ENV}"),
            }
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn trailing_slash_is_stripped() {
        assert_eq!(ClientConfig::new("http://localhost:3000/").base_url, "http://localhost:3000");
    }

    #[test]
    fn env_overrides_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[
            (BASE_URL_ENV, "http://engine:8080/engine-rest/"),
            (TIMEOUT_ENV, "500"),
        ]));
        assert_eq!(config.base_url, "http://engine:8080/engine-rest");
        assert_eq!(config.timeout_ms, 500);
    }

    #[test]
    fn unset_env_uses_defaults() {
        assert_eq!(ClientConfig::from_lookup(lookup(&[])), ClientConfig::default());
    }

    #[test]
    fn bad_timeout_is_ignored() {
        let config = ClientConfig::from_lookup(lookup(&[(TIMEOUT_ENV, "soon")]));
        assert_eq!(config.timeout_ms, 30_000);
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: ClientConfig = serde_json::from_str(r#"{"base_url":"http://x"}"#).unwrap();
        assert_eq!(config.base_url, "http://x");
        assert_eq!(config.timeout_ms, 30_000);
        assert_eq!(config.max_body_bytes, 64 * 1024 * 1024);
    }
}
