//! Process instance resource (`process-instance`).

use serde_json::Value;

use super::{required, to_body, Resource};
use crate::completion::Completion;
use crate::error::ApiError;
use crate::http::HttpRequest;
use crate::params::{escape_url, split_params, Params, PAGINATION_PARAMS};
use crate::types::{Modification, StartProcess, VariablesQuery};

pub const PATH: &str = "process-instance";

const DEFINITION_PATH: &str = "process-definition";
const NO_PROCESS_ID: &str = "No process id found";
const START_NEEDS_DEFINITION: &str = "Process start needs a process definition id or key.";

/// Operations on running process instances.
#[derive(Clone)]
pub struct ProcessInstanceResource {
    resource: Resource,
}

impl std::fmt::Debug for ProcessInstanceResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessInstanceResource").field("path", &PATH).finish()
    }
}

impl ProcessInstanceResource {
    pub(crate) fn new(resource: Resource) -> Self {
        Self { resource }
    }

    fn item(&self, id: &str, suffix: &str) -> Result<String, ApiError> {
        let id = required(id, NO_PROCESS_ID)?;
        Ok(self.resource.item_path(id, suffix))
    }

    pub fn build_get(&self, id: &str) -> Result<HttpRequest, ApiError> {
        Ok(HttpRequest::get(self.item(id, "")?))
    }

    pub fn get(&self, id: &str) -> Completion<Value> {
        self.resource.dispatch(self.build_get(id))
    }

    pub fn build_list(&self, params: Params) -> HttpRequest {
        HttpRequest::get(PATH).with_query(params)
    }

    pub fn list(&self, params: Params) -> Completion<Value> {
        self.resource.call(self.build_list(params))
    }

    pub fn build_count(&self, params: Params) -> HttpRequest {
        HttpRequest::get(format!("{PATH}/count")).with_query(params)
    }

    pub fn count(&self, params: Params) -> Completion<Value> {
        self.resource.call(self.build_count(params))
    }

    /// `POST process-instance` with paging on the query string and the
    /// filter as body.
    pub fn build_query(&self, params: &Params) -> HttpRequest {
        let routed = split_params(params, PAGINATION_PARAMS);
        HttpRequest::post(PATH)
            .with_query(routed.query)
            .with_body(Value::Object(routed.body))
    }

    pub fn query(&self, params: &Params) -> Completion<Value> {
        self.resource.call(self.build_query(params))
    }

    pub fn build_start(&self, start: &StartProcess) -> Result<HttpRequest, ApiError> {
        let non_empty = |value: &Option<String>| value.as_deref().filter(|v| !v.trim().is_empty()).map(escape_url);
        let definition = match (non_empty(&start.id), non_empty(&start.key)) {
            (Some(id), _) => id,
            (None, Some(key)) => format!("key/{key}"),
            (None, None) => return Err(ApiError::validation(START_NEEDS_DEFINITION)),
        };

        let mut body = Params::new();
        if let Some(variables) = &start.variables {
            body.insert("variables".to_string(), Value::Object(variables.clone()));
        }
        if let Some(business_key) = &start.business_key {
            body.insert("businessKey".to_string(), Value::String(business_key.clone()));
        }
        Ok(HttpRequest::post(format!("{DEFINITION_PATH}/{definition}/start")).with_body(Value::Object(body)))
    }

    /// Start a new instance of a process definition, chosen by id or key.
    pub fn start(&self, start: &StartProcess) -> Completion<Value> {
        self.resource.dispatch(self.build_start(start))
    }

    fn build_modification(&self, id: &str, suffix: &str, modification: &Modification) -> Result<HttpRequest, ApiError> {
        Ok(HttpRequest::post(self.item(id, suffix)?).with_body(to_body(modification)?))
    }

    pub fn build_modify(&self, id: &str, modification: &Modification) -> Result<HttpRequest, ApiError> {
        self.build_modification(id, "modification", modification)
    }

    /// Start and cancel activities of a running instance.
    pub fn modify(&self, id: &str, modification: &Modification) -> Completion<Value> {
        self.resource.dispatch(self.build_modify(id, modification))
    }

    pub fn build_modify_async(&self, id: &str, modification: &Modification) -> Result<HttpRequest, ApiError> {
        self.build_modification(id, "modification-async", modification)
    }

    /// Like `modify`, but executed as a batch.
    pub fn modify_async(&self, id: &str, modification: &Modification) -> Completion<Value> {
        self.resource.dispatch(self.build_modify_async(id, modification))
    }

    /// `POST process-instance/{operation}` with the payload passed through.
    fn build_batch(&self, operation: &str, payload: &Params) -> HttpRequest {
        HttpRequest::post(format!("{PATH}/{operation}")).with_body(Value::Object(payload.clone()))
    }

    pub fn build_delete_async(&self, payload: &Params) -> HttpRequest {
        self.build_batch("delete", payload)
    }

    pub fn delete_async(&self, payload: &Params) -> Completion<Value> {
        self.resource.call(self.build_delete_async(payload))
    }

    pub fn build_delete_async_historic_query_based(&self, payload: &Params) -> HttpRequest {
        self.build_batch("delete-historic-query-based", payload)
    }

    pub fn delete_async_historic_query_based(&self, payload: &Params) -> Completion<Value> {
        self.resource
            .call(self.build_delete_async_historic_query_based(payload))
    }

    pub fn build_set_jobs_retries_async(&self, payload: &Params) -> HttpRequest {
        self.build_batch("job-retries", payload)
    }

    pub fn set_jobs_retries_async(&self, payload: &Params) -> Completion<Value> {
        self.resource.call(self.build_set_jobs_retries_async(payload))
    }

    pub fn build_set_jobs_retries_async_historic_query_based(&self, payload: &Params) -> HttpRequest {
        self.build_batch("job-retries-historic-query-based", payload)
    }

    pub fn set_jobs_retries_async_historic_query_based(&self, payload: &Params) -> Completion<Value> {
        self.resource
            .call(self.build_set_jobs_retries_async_historic_query_based(payload))
    }

    pub fn build_suspend_async(&self, payload: &Params) -> HttpRequest {
        self.build_batch("suspended-async", payload)
    }

    /// Activate or suspend instances selected by ids and/or queries.
    pub fn suspend_async(&self, payload: &Params) -> Completion<Value> {
        self.resource.call(self.build_suspend_async(payload))
    }

    pub fn build_set_variable(&self, id: &str, name: &str, variable: Value) -> Result<HttpRequest, ApiError> {
        let name = required(name, "Process variable operation needs a variable name.")?;
        let path = self.item(id, &format!("variables/{}", escape_url(name)))?;
        Ok(HttpRequest::put(path).with_body(variable))
    }

    /// Set one variable; `variable` carries `value`, `type` and optionally
    /// `valueInfo`.
    pub fn set_variable(&self, id: &str, name: &str, variable: Value) -> Completion<Value> {
        self.resource
            .dispatch(self.build_set_variable(id, name, variable))
    }

    pub fn build_get_variables(&self, query: &VariablesQuery) -> Result<HttpRequest, ApiError> {
        let suffix = match query.var_id.as_deref().filter(|name| !name.is_empty()) {
            Some(name) => format!("variables/{}", escape_url(name)),
            None => "variables".to_string(),
        };
        Ok(HttpRequest::get(self.item(&query.id, &suffix)?))
    }

    /// All variables of an instance, or a single one when `var_id` is set.
    pub fn get_variables(&self, query: &VariablesQuery) -> Completion<Value> {
        self.resource.dispatch(self.build_get_variables(query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;
    use crate::params::to_params;
    use crate::testing::RecordingHttpClient;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn setup() -> (Arc<RecordingHttpClient>, ProcessInstanceResource) {
        let http = Arc::new(RecordingHttpClient::new());
        let instances = ProcessInstanceResource::new(Resource::new(PATH, http.clone()));
        (http, instances)
    }

    fn params(value: Value) -> Params {
        to_params(&value).unwrap()
    }

    #[test]
    fn build_query_routes_paging() {
        let (_, instances) = setup();
        let req = instances.build_query(&params(json!({
            "maxResults": 50,
            "processDefinitionKey": "invoice",
            "active": true
        })));
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "process-instance");
        assert_eq!(Value::Object(req.query), json!({"maxResults": 50}));
        assert_eq!(req.body, Some(json!({"processDefinitionKey": "invoice", "active": true})));
    }

    #[tokio::test]
    async fn get_variables_without_id_is_rejected() {
        let (http, instances) = setup();
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);

        let err = instances
            .get_variables(&VariablesQuery::default())
            .on_done(move |outcome| *sink.lock().unwrap() = outcome.err().cloned())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), NO_PROCESS_ID);
        assert_eq!(seen.lock().unwrap().as_ref(), Some(&err));
        assert!(http.requests().is_empty());
    }

    #[test]
    fn build_get_variables_with_and_without_name() {
        let (_, instances) = setup();
        let all = instances
            .build_get_variables(&VariablesQuery {
                id: "pi1".to_string(),
                var_id: None,
            })
            .unwrap();
        assert_eq!(all.path, "process-instance/pi1/variables");

        let one = instances
            .build_get_variables(&VariablesQuery {
                id: "pi1".to_string(),
                var_id: Some("amount".to_string()),
            })
            .unwrap();
        assert_eq!(one.path, "process-instance/pi1/variables/amount");
    }

    #[test]
    fn build_start_by_id_or_key() {
        let (_, instances) = setup();
        let by_key = instances
            .build_start(&StartProcess {
                key: Some("invoice".to_string()),
                business_key: Some("INV-1".to_string()),
                ..StartProcess::default()
            })
            .unwrap();
        assert_eq!(by_key.path, "process-definition/key/invoice/start");
        assert_eq!(by_key.body, Some(json!({"businessKey": "INV-1"})));

        let by_id = instances
            .build_start(&StartProcess {
                id: Some("invoice:1:abc".to_string()),
                key: Some("ignored".to_string()),
                variables: Some(params(json!({"amount": {"value": 3}}))),
                ..StartProcess::default()
            })
            .unwrap();
        assert_eq!(by_id.path, "process-definition/invoice%3A1%3Aabc/start");
        assert_eq!(by_id.body, Some(json!({"variables": {"amount": {"value": 3}}})));

        let err = instances.build_start(&StartProcess::default()).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn build_modify_sends_instructions_and_flags() {
        let (_, instances) = setup();
        let modification = Modification {
            instructions: vec![json!({"type": "cancel", "activityId": "review"})],
            skip_custom_listeners: Some(true),
            skip_io_mappings: Some(false),
        };
        let req = instances.build_modify("pi1", &modification).unwrap();
        assert_eq!(req.path, "process-instance/pi1/modification");
        assert_eq!(
            req.body,
            Some(json!({
                "instructions": [{"type": "cancel", "activityId": "review"}],
                "skipCustomListeners": true,
                "skipIoMappings": false
            }))
        );
    }

    #[tokio::test]
    async fn batch_operations_post_payload() {
        let (http, instances) = setup();
        let payload = params(json!({"processInstanceIds": ["a", "b"], "deleteReason": "cleanup"}));
        instances.delete_async(&payload).await.unwrap();
        instances.delete_async_historic_query_based(&payload).await.unwrap();
        instances.set_jobs_retries_async(&payload).await.unwrap();
        instances
            .set_jobs_retries_async_historic_query_based(&payload)
            .await
            .unwrap();
        instances.suspend_async(&payload).await.unwrap();
        instances
            .modify_async("pi1", &Modification::default())
            .await
            .unwrap();

        let requests = http.requests();
        let paths: Vec<&str> = requests.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "process-instance/delete",
                "process-instance/delete-historic-query-based",
                "process-instance/job-retries",
                "process-instance/job-retries-historic-query-based",
                "process-instance/suspended-async",
                "process-instance/pi1/modification-async",
            ]
        );
        assert_eq!(requests[0].body, Some(Value::Object(payload)));
    }

    #[tokio::test]
    async fn reads_and_variable_writes() {
        let (http, instances) = setup();
        http.respond(200, json!({"id": "pi1"}));
        http.respond(200, json!({"count": 4}));

        assert_eq!(instances.get("pi1").await.unwrap(), json!({"id": "pi1"}));
        assert_eq!(
            instances.count(params(json!({"active": true}))).await.unwrap(),
            json!({"count": 4})
        );
        instances.list(Params::new()).await.unwrap();
        instances
            .set_variable("pi1", "total amount", json!({"value": 10, "type": "Integer"}))
            .await
            .unwrap();

        let requests = http.requests();
        assert_eq!(requests[1].path, "process-instance/count");
        assert_eq!(Value::Object(requests[1].query.clone()), json!({"active": true}));
        assert_eq!(requests[2].path, "process-instance");
        assert_eq!(requests[3].method, HttpMethod::Put);
        assert_eq!(requests[3].path, "process-instance/pi1/variables/total%20amount");
    }

    #[tokio::test]
    async fn not_found_is_forwarded() {
        let (http, instances) = setup();
        http.respond(404, Value::Null);
        assert_eq!(instances.get("missing").await.unwrap_err(), ApiError::NotFound);
    }

    #[test]
    fn builders_for_reads_batches_and_variables() {
        let (http, instances) = setup();

        let get = instances.build_get("a b").unwrap();
        assert_eq!((get.method, get.path.as_str()), (HttpMethod::Get, "process-instance/a%20b"));
        assert!(instances.build_get("").unwrap_err().is_validation());

        let list = instances.build_list(params(json!({"businessKey": "INV-1"})));
        assert_eq!(list.path, "process-instance");
        assert_eq!(Value::Object(list.query), json!({"businessKey": "INV-1"}));

        let count = instances.build_count(Params::new());
        assert_eq!(count.path, "process-instance/count");
        assert!(count.body.is_none());

        let modify = instances
            .build_modify_async("pi1", &Modification::default())
            .unwrap();
        assert_eq!(modify.path, "process-instance/pi1/modification-async");
        assert_eq!(modify.body, Some(json!({"instructions": []})));

        let payload = params(json!({"retries": 3}));
        let batches = [
            instances.build_delete_async(&payload),
            instances.build_delete_async_historic_query_based(&payload),
            instances.build_set_jobs_retries_async(&payload),
            instances.build_set_jobs_retries_async_historic_query_based(&payload),
            instances.build_suspend_async(&payload),
        ];
        assert!(batches.iter().all(|req| req.method == HttpMethod::Post));
        assert!(batches.iter().all(|req| req.body == Some(json!({"retries": 3}))));
        assert_eq!(batches[4].path, "process-instance/suspended-async");

        let set = instances
            .build_set_variable("pi1", "a/b", json!({"value": 1}))
            .unwrap();
        assert_eq!((set.method, set.path.as_str()), (HttpMethod::Put, "process-instance/pi1/variables/a%2Fb"));
        assert_eq!(set.body, Some(json!({"value": 1})));
        assert!(instances.build_set_variable("pi1", " ", Value::Null).is_err());
        assert_eq!(
            instances.build_set_variable("", "x", Value::Null).unwrap_err().to_string(),
            NO_PROCESS_ID
        );

        assert!(http.requests().is_empty());
    }
}
