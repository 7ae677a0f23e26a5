//! Task resource (`task`).
//!
//! Task lists come back with their process definitions in a parallel
//! collection; both list operations run the response through
//! `embed_process_definitions` before delivering it.

use futures::TryFutureExt;
use serde_json::{json, Value};

use super::{required, to_body, Resource};
use crate::completion::Completion;
use crate::embed::embed_process_definitions;
use crate::error::ApiError;
use crate::http::HttpRequest;
use crate::params::{escape_url, split_params, Params, PAGINATION_PARAMS};
use crate::types::{FormVariablesQuery, IdentityLink, TaskList};

pub const PATH: &str = "task";

const SUBMIT_FORM_NEEDS_ID: &str = "Task submitForm needs a task id.";
const COMPLETE_NEEDS_ID: &str = "Task complete needs a task id.";
const UPDATE_NEEDS_ID: &str = "Task update needs a task id.";
const FORM_VARIABLES_NEEDS_POINTER: &str = "Task variables needs either a key or an id.";
const NEEDS_ID: &str = "Task operation needs a task id.";

/// Operations on human and system tasks.
#[derive(Clone)]
pub struct TaskResource {
    resource: Resource,
}

impl std::fmt::Debug for TaskResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskResource").field("path", &PATH).finish()
    }
}

impl TaskResource {
    pub(crate) fn new(resource: Resource) -> Self {
        Self { resource }
    }

    // -----------------------------------------------------------------------
    // Lists
    // -----------------------------------------------------------------------

    pub fn build_list(&self, params: Params) -> HttpRequest {
        HttpRequest::get(PATH).with_query(params)
    }

    /// `POST task` with paging on the query string and the filter as body.
    pub fn build_query(&self, params: &Params) -> HttpRequest {
        let routed = split_params(params, PAGINATION_PARAMS);
        HttpRequest::post(PATH)
            .with_query(routed.query)
            .with_body(Value::Object(routed.body))
    }

    /// `POST history/task`, routed like `build_query`.
    pub fn build_history(&self, params: &Params) -> HttpRequest {
        let routed = split_params(params, PAGINATION_PARAMS);
        HttpRequest::post(format!("history/{PATH}"))
            .with_query(routed.query)
            .with_body(Value::Object(routed.body))
    }

    /// List tasks, passing every parameter on the query string.
    pub fn list(&self, params: Params) -> Completion<TaskList> {
        self.compiled_list(self.build_list(params))
    }

    /// Query tasks with a filter body.
    pub fn query(&self, params: &Params) -> Completion<TaskList> {
        self.compiled_list(self.build_query(params))
    }

    /// Query historic tasks. The response is delivered as the engine sent it.
    pub fn history(&self, params: &Params) -> Completion<Value> {
        self.resource.call(self.build_history(params))
    }

    fn compiled_list(&self, request: HttpRequest) -> Completion<TaskList> {
        Completion::new(
            self.resource
                .request::<TaskList>(request)
                .map_ok(embed_process_definitions),
        )
    }

    // -----------------------------------------------------------------------
    // Single task
    // -----------------------------------------------------------------------

    fn build_item_get(&self, task_id: &str, suffix: &str) -> Result<HttpRequest, ApiError> {
        let task_id = required(task_id, NEEDS_ID)?;
        Ok(HttpRequest::get(self.resource.item_path(task_id, suffix)))
    }

    pub fn build_get(&self, task_id: &str) -> Result<HttpRequest, ApiError> {
        self.build_item_get(task_id, "")
    }

    pub fn get(&self, task_id: &str) -> Completion<Value> {
        self.resource.dispatch(self.build_get(task_id))
    }

    pub fn build_comments(&self, task_id: &str) -> Result<HttpRequest, ApiError> {
        self.build_item_get(task_id, "comment")
    }

    pub fn comments(&self, task_id: &str) -> Completion<Value> {
        self.resource.dispatch(self.build_comments(task_id))
    }

    pub fn build_identity_links(&self, task_id: &str) -> Result<HttpRequest, ApiError> {
        self.build_item_get(task_id, "identity-links")
    }

    pub fn identity_links(&self, task_id: &str) -> Completion<Value> {
        self.resource.dispatch(self.build_identity_links(task_id))
    }

    pub fn build_form(&self, task_id: &str) -> Result<HttpRequest, ApiError> {
        self.build_item_get(task_id, "form")
    }

    pub fn form(&self, task_id: &str) -> Completion<Value> {
        self.resource.dispatch(self.build_form(task_id))
    }

    pub fn build_local_variables(&self, task_id: &str) -> Result<HttpRequest, ApiError> {
        self.build_item_get(task_id, "localVariables")
    }

    pub fn local_variables(&self, task_id: &str) -> Completion<Value> {
        self.resource.dispatch(self.build_local_variables(task_id))
    }

    pub fn build_get_variables(&self, task_id: &str, params: Params) -> Result<HttpRequest, ApiError> {
        Ok(self.build_item_get(task_id, "variables")?.with_query(params))
    }

    /// Variables visible from the task, including those of enclosing scopes.
    pub fn get_variables(&self, task_id: &str, params: Params) -> Completion<Value> {
        self.resource.dispatch(self.build_get_variables(task_id, params))
    }

    pub fn build_create(&self, task: &Params) -> HttpRequest {
        HttpRequest::post(format!("{PATH}/create")).with_body(Value::Object(task.clone()))
    }

    pub fn create(&self, task: &Params) -> Completion<Value> {
        self.resource.call(self.build_create(task))
    }

    pub fn build_update(&self, task: &Params) -> Result<HttpRequest, ApiError> {
        let task_id = task.get("id").and_then(Value::as_str).unwrap_or_default();
        let task_id = required(task_id, UPDATE_NEEDS_ID)?;
        Ok(HttpRequest::put(self.resource.item_path(task_id, "")).with_body(Value::Object(task.clone())))
    }

    /// Update a task; `task["id"]` selects which one.
    pub fn update(&self, task: &Params) -> Completion<Value> {
        self.resource.dispatch(self.build_update(task))
    }

    // -----------------------------------------------------------------------
    // Assignment
    // -----------------------------------------------------------------------

    fn build_user_action(&self, task_id: &str, action: &str, user_id: &str) -> Result<HttpRequest, ApiError> {
        let task_id = required(task_id, NEEDS_ID)?;
        Ok(HttpRequest::post(self.resource.item_path(task_id, action)).with_body(json!({ "userId": user_id })))
    }

    pub fn build_claim(&self, task_id: &str, user_id: &str) -> Result<HttpRequest, ApiError> {
        self.build_user_action(task_id, "claim", user_id)
    }

    /// Claim the task for `user_id`. Fails server-side if it is already assigned.
    pub fn claim(&self, task_id: &str, user_id: &str) -> Completion<Value> {
        self.resource.dispatch(self.build_claim(task_id, user_id))
    }

    pub fn build_assignee(&self, task_id: &str, user_id: &str) -> Result<HttpRequest, ApiError> {
        self.build_user_action(task_id, "assignee", user_id)
    }

    /// Set the assignee without checking for an existing one.
    pub fn assignee(&self, task_id: &str, user_id: &str) -> Completion<Value> {
        self.resource.dispatch(self.build_assignee(task_id, user_id))
    }

    pub fn build_delegate(&self, task_id: &str, user_id: &str) -> Result<HttpRequest, ApiError> {
        self.build_user_action(task_id, "delegate", user_id)
    }

    pub fn delegate(&self, task_id: &str, user_id: &str) -> Completion<Value> {
        self.resource.dispatch(self.build_delegate(task_id, user_id))
    }

    pub fn build_unclaim(&self, task_id: &str) -> Result<HttpRequest, ApiError> {
        let task_id = required(task_id, NEEDS_ID)?;
        Ok(HttpRequest::post(self.resource.item_path(task_id, "unclaim")))
    }

    pub fn unclaim(&self, task_id: &str) -> Completion<Value> {
        self.resource.dispatch(self.build_unclaim(task_id))
    }

    // -----------------------------------------------------------------------
    // Identity links and comments
    // -----------------------------------------------------------------------

    fn build_identity_link(&self, task_id: &str, suffix: &str, link: &IdentityLink) -> Result<HttpRequest, ApiError> {
        let task_id = required(task_id, NEEDS_ID)?;
        Ok(HttpRequest::post(self.resource.item_path(task_id, suffix)).with_body(to_body(link)?))
    }

    pub fn build_identity_links_add(&self, task_id: &str, link: &IdentityLink) -> Result<HttpRequest, ApiError> {
        self.build_identity_link(task_id, "identity-links", link)
    }

    pub fn identity_links_add(&self, task_id: &str, link: &IdentityLink) -> Completion<Value> {
        self.resource.dispatch(self.build_identity_links_add(task_id, link))
    }

    pub fn build_identity_links_delete(&self, task_id: &str, link: &IdentityLink) -> Result<HttpRequest, ApiError> {
        self.build_identity_link(task_id, "identity-links/delete", link)
    }

    pub fn identity_links_delete(&self, task_id: &str, link: &IdentityLink) -> Completion<Value> {
        self.resource.dispatch(self.build_identity_links_delete(task_id, link))
    }

    pub fn build_create_comment(&self, task_id: &str, message: &str) -> Result<HttpRequest, ApiError> {
        let task_id = required(task_id, NEEDS_ID)?;
        Ok(HttpRequest::post(self.resource.item_path(task_id, "comment/create"))
            .with_body(json!({ "message": message })))
    }

    pub fn create_comment(&self, task_id: &str, message: &str) -> Completion<Value> {
        self.resource.dispatch(self.build_create_comment(task_id, message))
    }

    // -----------------------------------------------------------------------
    // Completion and forms
    // -----------------------------------------------------------------------

    fn build_variables_post(
        &self,
        task_id: &str,
        suffix: &str,
        variables: Option<Params>,
        missing_id: &str,
    ) -> Result<HttpRequest, ApiError> {
        let task_id = required(task_id, missing_id)?;
        let body = match variables {
            Some(variables) => json!({ "variables": variables }),
            None => json!({}),
        };
        Ok(HttpRequest::post(self.resource.item_path(task_id, suffix)).with_body(body))
    }

    pub fn build_complete(&self, task_id: &str, variables: Option<Params>) -> Result<HttpRequest, ApiError> {
        self.build_variables_post(task_id, "complete", variables, COMPLETE_NEEDS_ID)
    }

    /// Complete the task, updating process variables on the way.
    pub fn complete(&self, task_id: &str, variables: Option<Params>) -> Completion<Value> {
        self.resource.dispatch(self.build_complete(task_id, variables))
    }

    pub fn build_submit_form(&self, task_id: &str, variables: Option<Params>) -> Result<HttpRequest, ApiError> {
        self.build_variables_post(task_id, "submit-form", variables, SUBMIT_FORM_NEEDS_ID)
    }

    /// Complete the task through its form. A delegated task is resolved
    /// instead, and the engine validates any form fields with validators.
    pub fn submit_form(&self, task_id: &str, variables: Option<Params>) -> Completion<Value> {
        self.resource.dispatch(self.build_submit_form(task_id, variables))
    }

    pub fn build_form_variables(&self, query: &FormVariablesQuery) -> Result<HttpRequest, ApiError> {
        let non_empty = |value: &Option<String>| value.as_deref().filter(|v| !v.trim().is_empty()).map(escape_url);
        let pointer = match (non_empty(&query.key), non_empty(&query.id)) {
            (Some(key), _) => format!("key/{key}"),
            (None, Some(id)) => id,
            (None, None) => return Err(ApiError::validation(FORM_VARIABLES_NEEDS_POINTER)),
        };

        let mut params = Params::new();
        if let Some(deserialize) = query.deserialize_values {
            params.insert("deserializeValues".to_string(), Value::Bool(deserialize));
        }
        if let Some(names) = &query.names {
            params.insert("variableNames".to_string(), Value::String(names.join(",")));
        }
        Ok(HttpRequest::get(format!("{PATH}/{pointer}/form-variables")).with_query(params))
    }

    /// Form variables of a task, addressed by key or by id.
    pub fn form_variables(&self, query: &FormVariablesQuery) -> Completion<Value> {
        self.resource.dispatch(self.build_form_variables(query))
    }

    // -----------------------------------------------------------------------
    // Local variables
    // -----------------------------------------------------------------------

    fn local_variable_path(&self, task_id: &str, var_name: &str) -> Result<String, ApiError> {
        let task_id = required(task_id, NEEDS_ID)?;
        let var_name = required(var_name, "Task variable operation needs a variable name.")?;
        Ok(self
            .resource
            .item_path(task_id, &format!("localVariables/{}", escape_url(var_name))))
    }

    pub fn build_local_variable(&self, task_id: &str, var_name: &str, variable: Value) -> Result<HttpRequest, ApiError> {
        Ok(HttpRequest::put(self.local_variable_path(task_id, var_name)?).with_body(variable))
    }

    /// Set one local variable. `variable` carries `value`, `type` and
    /// optionally `valueInfo`.
    pub fn local_variable(&self, task_id: &str, var_name: &str, variable: Value) -> Completion<Value> {
        self.resource
            .dispatch(self.build_local_variable(task_id, var_name, variable))
    }

    pub fn build_modify_variables(&self, task_id: &str, modifications: &Params) -> Result<HttpRequest, ApiError> {
        let task_id = required(task_id, NEEDS_ID)?;
        Ok(HttpRequest::post(self.resource.item_path(task_id, "localVariables"))
            .with_body(Value::Object(modifications.clone())))
    }

    /// Update and delete local variables in one call; deletions win.
    pub fn modify_variables(&self, task_id: &str, modifications: &Params) -> Completion<Value> {
        self.resource
            .dispatch(self.build_modify_variables(task_id, modifications))
    }

    pub fn build_delete_variable(&self, task_id: &str, var_name: &str) -> Result<HttpRequest, ApiError> {
        Ok(HttpRequest::delete(self.local_variable_path(task_id, var_name)?))
    }

    pub fn delete_variable(&self, task_id: &str, var_name: &str) -> Completion<Value> {
        self.resource.dispatch(self.build_delete_variable(task_id, var_name))
    }
}
