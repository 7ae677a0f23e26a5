use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub name: String,
    pub assignee: Option<String>,
    pub owner: Option<String>,
    pub process_definition_id: Option<String>,
    pub process_instance_id: Option<String>,
    pub task_definition_key: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProcessDefinition {
    pub id: String,
    pub key: String,
    pub name: String,
    pub version: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProcessInstance {
    pub id: String,
    pub definition_id: String,
    pub business_key: Option<String>,
    pub suspended: bool,
    pub ended: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub task_id: String,
    pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IdentityLink {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(rename = "type")]
    pub link_type: String,
}

/// In-memory engine state. Tasks keep insertion order so list responses
/// are deterministic.
#[derive(Debug, Default)]
pub struct Engine {
    pub definitions: Vec<ProcessDefinition>,
    pub instances: Vec<ProcessInstance>,
    pub tasks: Vec<Task>,
    pub history: Vec<Task>,
    pub comments: HashMap<String, Vec<Comment>>,
    pub identity_links: HashMap<String, Vec<IdentityLink>>,
    pub local_variables: HashMap<String, Map<String, Value>>,
    pub instance_variables: HashMap<String, Map<String, Value>>,
    pub metrics: HashMap<String, i64>,
}

impl Engine {
    /// Two deployed definitions, one running invoice instance with its
    /// approval task, and an orphan task without a definition.
    pub fn seeded() -> Self {
        let mut engine = Engine {
            definitions: vec![
                ProcessDefinition {
                    id: "invoice:1".to_string(),
                    key: "invoice".to_string(),
                    name: "Invoice Receipt".to_string(),
                    version: 1,
                },
                ProcessDefinition {
                    id: "review:1".to_string(),
                    key: "review".to_string(),
                    name: "Review".to_string(),
                    version: 1,
                },
            ],
            ..Engine::default()
        };
        engine.metrics.insert("activity-instance-end".to_string(), 42);
        engine.start("invoice:1", None, Map::new());
        engine.tasks.push(Task {
            id: "orphan".to_string(),
            name: "Standalone".to_string(),
            assignee: None,
            owner: None,
            process_definition_id: None,
            process_instance_id: None,
            task_definition_key: None,
        });
        engine
    }

    /// Start an instance of `definition_id` and create its first user task.
    pub fn start(
        &mut self,
        definition_id: &str,
        business_key: Option<String>,
        variables: Map<String, Value>,
    ) -> Option<ProcessInstance> {
        let definition = self.definitions.iter().find(|d| d.id == definition_id)?.clone();
        let instance = ProcessInstance {
            id: Uuid::new_v4().to_string(),
            definition_id: definition.id.clone(),
            business_key,
            suspended: false,
            ended: false,
        };
        self.instance_variables.insert(instance.id.clone(), variables);
        self.instances.push(instance.clone());
        self.tasks.push(Task {
            id: Uuid::new_v4().to_string(),
            name: format!("Approve {}", definition.name),
            assignee: None,
            owner: None,
            process_definition_id: Some(definition.id),
            process_instance_id: Some(instance.id.clone()),
            task_definition_key: Some("approve".to_string()),
        });
        Some(instance)
    }

    fn task(&self, id: &str) -> Result<&Task, ApiFailure> {
        self.tasks.iter().find(|t| t.id == id).ok_or_else(|| not_found("task", id))
    }

    fn task_mut(&mut self, id: &str) -> Result<&mut Task, ApiFailure> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| not_found("task", id))
    }

    /// HAL envelope with the definitions referenced by `tasks`.
    fn task_page(&self, tasks: Vec<Task>, count: usize) -> Value {
        let definitions: Vec<&ProcessDefinition> = self
            .definitions
            .iter()
            .filter(|d| tasks.iter().any(|t| t.process_definition_id.as_deref() == Some(d.id.as_str())))
            .collect();
        json!({
            "_embedded": {
                "task": tasks,
                "processDefinition": definitions,
            },
            "count": count,
        })
    }
}

pub type Db = Arc<RwLock<Engine>>;

type ApiFailure = (StatusCode, Json<Value>);
type ApiResult<T> = Result<T, ApiFailure>;

fn failure(status: StatusCode, kind: &str, message: String) -> ApiFailure {
    (status, Json(json!({ "type": kind, "message": message })))
}

fn not_found(what: &str, id: &str) -> ApiFailure {
    failure(StatusCode::NOT_FOUND, "InvalidRequestException", format!("No {what} found with id '{id}'"))
}

pub fn app() -> Router {
    app_with(Engine::seeded())
}

pub fn app_with(engine: Engine) -> Router {
    let db: Db = Arc::new(RwLock::new(engine));
    Router::new()
        .route("/task", get(list_tasks).post(query_tasks))
        .route("/task/create", post(create_task))
        .route("/task/{id}", get(get_task).put(update_task))
        .route("/task/{id}/claim", post(claim_task))
        .route("/task/{id}/unclaim", post(unclaim_task))
        .route("/task/{id}/assignee", post(set_assignee))
        .route("/task/{id}/delegate", post(delegate_task))
        .route("/task/{id}/complete", post(complete_task))
        .route("/task/{id}/submit-form", post(complete_task))
        .route("/task/{id}/comment", get(list_comments))
        .route("/task/{id}/comment/create", post(create_comment))
        .route("/task/{id}/identity-links", get(list_identity_links).post(add_identity_link))
        .route("/task/{id}/identity-links/delete", post(delete_identity_link))
        .route("/task/{id}/form-variables", get(task_variables))
        .route("/task/{id}/variables", get(task_variables))
        .route("/task/{id}/localVariables", get(local_variables).post(modify_local_variables))
        .route(
            "/task/{id}/localVariables/{name}",
            put(put_local_variable).delete(delete_local_variable),
        )
        .route("/history/task", post(query_history))
        .route("/process-definition/{id}/start", post(start_by_id))
        .route("/process-definition/key/{key}/start", post(start_by_key))
        .route("/process-instance", get(list_instances).post(query_instances))
        .route("/process-instance/count", get(count_instances))
        .route("/process-instance/{id}", get(get_instance))
        .route("/process-instance/{id}/variables", get(instance_variables))
        .route(
            "/process-instance/{id}/variables/{name}",
            get(instance_variable).put(put_instance_variable),
        )
        .route("/metrics", get(metrics_by_interval))
        .route("/metrics/{name}/sum", get(metric_sum))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

// ---------------------------------------------------------------------------
// Filtering and paging
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paging {
    pub first_result: Option<usize>,
    pub max_results: Option<usize>,
}

impl Paging {
    fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        let skip = self.first_result.unwrap_or(0);
        let take = self.max_results.unwrap_or(usize::MAX);
        items.into_iter().skip(skip).take(take).collect()
    }
}

/// Task filter shared by the query-string and body variants.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskFilter {
    pub assignee: Option<String>,
    pub name: Option<String>,
    pub process_definition_id: Option<String>,
    pub process_instance_id: Option<String>,
    #[serde(default)]
    pub unassigned: bool,
}

impl TaskFilter {
    fn matches(&self, task: &Task) -> bool {
        let eq = |want: &Option<String>, have: &Option<String>| want.is_none() || want == have;
        eq(&self.assignee, &task.assignee)
            && self.name.as_ref().map_or(true, |name| *name == task.name)
            && eq(&self.process_definition_id, &task.process_definition_id)
            && eq(&self.process_instance_id, &task.process_instance_id)
            && (!self.unassigned || task.assignee.is_none())
    }
}

fn filtered(tasks: &[Task], filter: &TaskFilter) -> Vec<Task> {
    tasks.iter().filter(|t| filter.matches(t)).cloned().collect()
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

/// Query-string form of a task list request. Kept flat because
/// `serde_urlencoded` cannot parse numbers through `#[serde(flatten)]`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListQuery {
    pub assignee: Option<String>,
    pub name: Option<String>,
    pub process_definition_id: Option<String>,
    pub process_instance_id: Option<String>,
    #[serde(default)]
    pub unassigned: bool,
    pub first_result: Option<usize>,
    pub max_results: Option<usize>,
}

async fn list_tasks(State(db): State<Db>, Query(query): Query<TaskListQuery>) -> Json<Value> {
    let filter = TaskFilter {
        assignee: query.assignee,
        name: query.name,
        process_definition_id: query.process_definition_id,
        process_instance_id: query.process_instance_id,
        unassigned: query.unassigned,
    };
    let paging = Paging {
        first_result: query.first_result,
        max_results: query.max_results,
    };
    let engine = db.read().await;
    let matching = filtered(&engine.tasks, &filter);
    let count = matching.len();
    Json(engine.task_page(paging.apply(matching), count))
}

async fn query_tasks(
    State(db): State<Db>,
    Query(paging): Query<Paging>,
    Json(filter): Json<TaskFilter>,
) -> Json<Value> {
    let engine = db.read().await;
    let matching = filtered(&engine.tasks, &filter);
    let count = matching.len();
    Json(engine.task_page(paging.apply(matching), count))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub id: Option<String>,
    pub name: String,
    pub assignee: Option<String>,
    pub owner: Option<String>,
}

async fn create_task(State(db): State<Db>, Json(input): Json<NewTask>) -> StatusCode {
    let task = Task {
        id: input.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
        name: input.name,
        assignee: input.assignee,
        owner: input.owner,
        process_definition_id: None,
        process_instance_id: None,
        task_definition_key: None,
    };
    db.write().await.tasks.push(task);
    StatusCode::NO_CONTENT
}

async fn get_task(State(db): State<Db>, Path(id): Path<String>) -> ApiResult<Json<Task>> {
    let engine = db.read().await;
    engine.task(&id).cloned().map(Json)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    pub name: Option<String>,
    pub assignee: Option<String>,
    pub owner: Option<String>,
}

async fn update_task(
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(input): Json<TaskUpdate>,
) -> ApiResult<StatusCode> {
    let mut engine = db.write().await;
    let task = engine.task_mut(&id)?;
    if let Some(name) = input.name {
        task.name = name;
    }
    if input.assignee.is_some() {
        task.assignee = input.assignee;
    }
    if input.owner.is_some() {
        task.owner = input.owner;
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAction {
    pub user_id: Option<String>,
}

async fn claim_task(
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(input): Json<UserAction>,
) -> ApiResult<StatusCode> {
    let mut engine = db.write().await;
    let task = engine.task_mut(&id)?;
    if let (Some(current), Some(user)) = (&task.assignee, &input.user_id) {
        if current != user {
            return Err(failure(
                StatusCode::BAD_REQUEST,
                "TaskAlreadyClaimedException",
                format!("Task '{id}' is already claimed by someone else."),
            ));
        }
    }
    task.assignee = input.user_id;
    Ok(StatusCode::NO_CONTENT)
}

async fn unclaim_task(State(db): State<Db>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    db.write().await.task_mut(&id)?.assignee = None;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_assignee(
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(input): Json<UserAction>,
) -> ApiResult<StatusCode> {
    db.write().await.task_mut(&id)?.assignee = input.user_id;
    Ok(StatusCode::NO_CONTENT)
}

async fn delegate_task(
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(input): Json<UserAction>,
) -> ApiResult<StatusCode> {
    let mut engine = db.write().await;
    let task = engine.task_mut(&id)?;
    task.owner = task.assignee.take();
    task.assignee = input.user_id;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Default, Deserialize)]
pub struct CompleteTask {
    #[serde(default)]
    pub variables: Map<String, Value>,
}

/// Completes the task; its variables are written to the owning instance.
async fn complete_task(
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(input): Json<CompleteTask>,
) -> ApiResult<StatusCode> {
    let mut engine = db.write().await;
    let position = engine
        .tasks
        .iter()
        .position(|t| t.id == id)
        .ok_or_else(|| not_found("task", &id))?;
    let task = engine.tasks.remove(position);
    if let Some(instance_id) = &task.process_instance_id {
        engine
            .instance_variables
            .entry(instance_id.clone())
            .or_default()
            .extend(input.variables);
        if let Some(instance) = engine.instances.iter_mut().find(|i| &i.id == instance_id) {
            instance.ended = true;
        }
    }
    tracing::info!(task = %task.id, "task completed");
    engine.history.push(task);
    Ok(StatusCode::NO_CONTENT)
}

async fn list_comments(State(db): State<Db>, Path(id): Path<String>) -> ApiResult<Json<Vec<Comment>>> {
    let engine = db.read().await;
    engine.task(&id)?;
    Ok(Json(engine.comments.get(&id).cloned().unwrap_or_default()))
}

#[derive(Debug, Deserialize)]
pub struct NewComment {
    pub message: String,
}

async fn create_comment(
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(input): Json<NewComment>,
) -> ApiResult<Json<Comment>> {
    let mut engine = db.write().await;
    engine.task(&id)?;
    let comment = Comment {
        id: Uuid::new_v4().to_string(),
        task_id: id.clone(),
        message: input.message,
    };
    engine.comments.entry(id).or_default().push(comment.clone());
    Ok(Json(comment))
}

async fn list_identity_links(
    State(db): State<Db>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<IdentityLink>>> {
    let engine = db.read().await;
    engine.task(&id)?;
    Ok(Json(engine.identity_links.get(&id).cloned().unwrap_or_default()))
}

async fn add_identity_link(
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(link): Json<IdentityLink>,
) -> ApiResult<StatusCode> {
    let mut engine = db.write().await;
    engine.task(&id)?;
    engine.identity_links.entry(id).or_default().push(link);
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_identity_link(
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(link): Json<IdentityLink>,
) -> ApiResult<StatusCode> {
    let mut engine = db.write().await;
    engine.task(&id)?;
    if let Some(links) = engine.identity_links.get_mut(&id) {
        links.retain(|existing| *existing != link);
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Local variables merged over the variables of the owning instance.
async fn task_variables(State(db): State<Db>, Path(id): Path<String>) -> ApiResult<Json<Map<String, Value>>> {
    let engine = db.read().await;
    let task = engine.task(&id)?;
    let mut variables = task
        .process_instance_id
        .as_ref()
        .and_then(|instance| engine.instance_variables.get(instance))
        .cloned()
        .unwrap_or_default();
    if let Some(local) = engine.local_variables.get(&id) {
        variables.extend(local.clone());
    }
    Ok(Json(variables))
}

async fn local_variables(State(db): State<Db>, Path(id): Path<String>) -> ApiResult<Json<Map<String, Value>>> {
    let engine = db.read().await;
    engine.task(&id)?;
    Ok(Json(engine.local_variables.get(&id).cloned().unwrap_or_default()))
}

#[derive(Debug, Default, Deserialize)]
pub struct VariableModifications {
    #[serde(default)]
    pub modifications: Map<String, Value>,
    #[serde(default)]
    pub deletions: Vec<String>,
}

async fn modify_local_variables(
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(input): Json<VariableModifications>,
) -> ApiResult<StatusCode> {
    let mut engine = db.write().await;
    engine.task(&id)?;
    let variables = engine.local_variables.entry(id).or_default();
    variables.extend(input.modifications);
    for name in input.deletions {
        variables.remove(&name);
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn put_local_variable(
    State(db): State<Db>,
    Path((id, name)): Path<(String, String)>,
    Json(variable): Json<Value>,
) -> ApiResult<StatusCode> {
    let mut engine = db.write().await;
    engine.task(&id)?;
    engine.local_variables.entry(id).or_default().insert(name, variable);
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_local_variable(
    State(db): State<Db>,
    Path((id, name)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let mut engine = db.write().await;
    engine.task(&id)?;
    engine
        .local_variables
        .get_mut(&id)
        .and_then(|variables| variables.remove(&name))
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(|| not_found("variable", &name))
}

async fn query_history(
    State(db): State<Db>,
    Query(paging): Query<Paging>,
    Json(filter): Json<TaskFilter>,
) -> Json<Vec<Task>> {
    let engine = db.read().await;
    Json(paging.apply(filtered(&engine.history, &filter)))
}

// ---------------------------------------------------------------------------
// Process instances
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    #[serde(default)]
    pub variables: Map<String, Value>,
    pub business_key: Option<String>,
}

async fn start_by_id(
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(input): Json<StartRequest>,
) -> ApiResult<Json<ProcessInstance>> {
    let mut engine = db.write().await;
    engine
        .start(&id, input.business_key, input.variables)
        .map(Json)
        .ok_or_else(|| not_found("process definition", &id))
}

async fn start_by_key(
    State(db): State<Db>,
    Path(key): Path<String>,
    Json(input): Json<StartRequest>,
) -> ApiResult<Json<ProcessInstance>> {
    let mut engine = db.write().await;
    let latest = engine
        .definitions
        .iter()
        .filter(|d| d.key == key)
        .max_by_key(|d| d.version)
        .map(|d| d.id.clone())
        .ok_or_else(|| not_found("process definition with key", &key))?;
    engine
        .start(&latest, input.business_key, input.variables)
        .map(Json)
        .ok_or_else(|| not_found("process definition", &latest))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceFilter {
    pub process_definition_id: Option<String>,
    pub business_key: Option<String>,
    #[serde(default)]
    pub active: bool,
}

impl InstanceFilter {
    fn apply(&self, instances: &[ProcessInstance]) -> Vec<ProcessInstance> {
        instances
            .iter()
            .filter(|i| self.process_definition_id.as_ref().map_or(true, |d| *d == i.definition_id))
            .filter(|i| self.business_key.is_none() || self.business_key == i.business_key)
            .filter(|i| !self.active || (!i.ended && !i.suspended))
            .cloned()
            .collect()
    }
}

async fn list_instances(
    State(db): State<Db>,
    Query(filter): Query<InstanceFilter>,
) -> Json<Vec<ProcessInstance>> {
    Json(filter.apply(&db.read().await.instances))
}

async fn count_instances(State(db): State<Db>, Query(filter): Query<InstanceFilter>) -> Json<Value> {
    Json(json!({ "count": filter.apply(&db.read().await.instances).len() }))
}

async fn query_instances(
    State(db): State<Db>,
    Query(paging): Query<Paging>,
    Json(filter): Json<InstanceFilter>,
) -> Json<Vec<ProcessInstance>> {
    Json(paging.apply(filter.apply(&db.read().await.instances)))
}

async fn get_instance(State(db): State<Db>, Path(id): Path<String>) -> ApiResult<Json<ProcessInstance>> {
    let engine = db.read().await;
    engine
        .instances
        .iter()
        .find(|i| i.id == id)
        .cloned()
        .map(Json)
        .ok_or_else(|| not_found("process instance", &id))
}

async fn instance_variables(
    State(db): State<Db>,
    Path(id): Path<String>,
) -> ApiResult<Json<Map<String, Value>>> {
    let engine = db.read().await;
    engine
        .instance_variables
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| not_found("process instance", &id))
}

async fn instance_variable(
    State(db): State<Db>,
    Path((id, name)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let engine = db.read().await;
    engine
        .instance_variables
        .get(&id)
        .and_then(|variables| variables.get(&name))
        .cloned()
        .map(Json)
        .ok_or_else(|| not_found("variable", &name))
}

async fn put_instance_variable(
    State(db): State<Db>,
    Path((id, name)): Path<(String, String)>,
    Json(variable): Json<Value>,
) -> ApiResult<StatusCode> {
    let mut engine = db.write().await;
    let variables = engine
        .instance_variables
        .get_mut(&id)
        .ok_or_else(|| not_found("process instance", &id))?;
    variables.insert(name, variable);
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

async fn metric_sum(State(db): State<Db>, Path(name): Path<String>) -> Json<Value> {
    let result = db.read().await.metrics.get(&name).copied().unwrap_or(0);
    Json(json!({ "result": result }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntervalQuery {
    pub name: Option<String>,
    pub max_results: Option<usize>,
}

/// One bucket per known metric; `maxResults` is capped at 200.
async fn metrics_by_interval(State(db): State<Db>, Query(query): Query<IntervalQuery>) -> Json<Vec<Value>> {
    let engine = db.read().await;
    let mut names: Vec<&String> = engine.metrics.keys().collect();
    names.sort();
    let buckets = names
        .into_iter()
        .filter(|name| query.name.as_ref().map_or(true, |wanted| wanted == *name))
        .take(query.max_results.unwrap_or(200).min(200))
        .map(|name| json!({ "name": name, "value": engine.metrics[name], "timestamp": "1970-01-01T00:00:00.000+0000" }))
        .collect();
    Json(buckets)
}
