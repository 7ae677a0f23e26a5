//! Parameter routing and path escaping.
//!
//! Query endpoints of the engine accept paging parameters on the query
//! string and the filter itself as a JSON body. Callers hand over one flat
//! parameter object; `split_params` decides where each key goes based on
//! an allow-list alone, never on the value.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ApiError;

/// A flat parameter object, as accepted by every resource operation.
pub type Params = Map<String, Value>;

/// Keys that always travel on the query string of list/query endpoints.
pub const PAGINATION_PARAMS: &[&str] = &["firstResult", "maxResults"];

/// Parameters split into query-string and request-body halves.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoutedParams {
    pub query: Params,
    pub body: Params,
}

/// Partition `params` by membership of each key in `query_keys`.
///
/// Every key lands in exactly one half. The input is left untouched and a
/// fresh pair is returned.
pub fn split_params(params: &Params, query_keys: &[&str]) -> RoutedParams {
    let mut routed = RoutedParams::default();
    for (key, value) in params {
        let target = if query_keys.contains(&key.as_str()) {
            &mut routed.query
        } else {
            &mut routed.body
        };
        target.insert(key.clone(), value.clone());
    }
    routed
}

/// Percent-encode a caller-supplied path segment.
pub fn escape_url(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

/// Serialize any struct or map into `Params`.
///
/// `null` yields an empty set; any other non-object value is rejected.
pub fn to_params<P: Serialize + ?Sized>(params: &P) -> Result<Params, ApiError> {
    match serde_json::to_value(params).map_err(|e| ApiError::Serialization(e.to_string()))? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Params::new()),
        other => Err(ApiError::Serialization(format!(
            "parameters must be an object, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Params {
        to_params(&value).unwrap()
    }

    #[test]
    fn pagination_goes_to_query_and_filters_to_body() {
        let input = params(json!({"firstResult": 0, "maxResults": 10, "name": "foo"}));
        let routed = split_params(&input, PAGINATION_PARAMS);
        assert_eq!(Value::Object(routed.query), json!({"firstResult": 0, "maxResults": 10}));
        assert_eq!(Value::Object(routed.body), json!({"name": "foo"}));
    }

    #[test]
    fn every_key_lands_in_exactly_one_half() {
        let input = params(json!({
            "firstResult": 5,
            "maxResults": null,
            "assignee": "kermit",
            "sorting": [{"sortBy": "created"}],
            "active": true,
            "variables": {"a": 1}
        }));
        let routed = split_params(&input, PAGINATION_PARAMS);

        assert_eq!(routed.query.len() + routed.body.len(), input.len());
        for (key, value) in &input {
            let in_query = routed.query.get(key);
            let in_body = routed.body.get(key);
            assert!(in_query.is_some() ^ in_body.is_some(), "{key} routed twice or dropped");
            assert_eq!(in_query.or(in_body), Some(value));
        }
        for key in routed.query.keys() {
            assert!(PAGINATION_PARAMS.contains(&key.as_str()));
        }
    }

    #[test]
    fn routing_ignores_values() {
        let input = params(json!({"maxResults": "not a number", "firstResult": {"nested": true}}));
        let routed = split_params(&input, PAGINATION_PARAMS);
        assert_eq!(routed.query.len(), 2);
        assert!(routed.body.is_empty());
    }

    #[test]
    fn empty_input_yields_two_empty_halves() {
        let routed = split_params(&Params::new(), PAGINATION_PARAMS);
        assert_eq!(routed, RoutedParams::default());
    }

    #[test]
    fn empty_allow_list_sends_everything_to_body() {
        let input = params(json!({"firstResult": 0, "name": "foo"}));
        let routed = split_params(&input, &[]);
        assert!(routed.query.is_empty());
        assert_eq!(routed.body, input);
    }

    #[test]
    fn to_params_accepts_structs_and_rejects_scalars() {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Paging {
            first_result: u32,
            max_results: u32,
        }
        let routed = split_params(
            &to_params(&Paging { first_result: 0, max_results: 15 }).unwrap(),
            PAGINATION_PARAMS,
        );
        assert_eq!(routed.query.len(), 2);
        assert!(to_params(&Value::Null).unwrap().is_empty());
        assert!(matches!(to_params(&json!(3)), Err(ApiError::Serialization(_))));
    }

    #[test]
    fn escape_url_encodes_reserved_characters() {
        assert_eq!(escape_url("my var/x"), "my%20var%2Fx");
        assert_eq!(escape_url("plain-name_1"), "plain-name_1");
    }
}
