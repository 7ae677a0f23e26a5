//! Domain DTOs for the engine REST API.
//!
//! # Design
//! Only the shapes the client itself inspects are typed. Records carry a
//! flattened `fields` map so attributes the client does not know about
//! survive a decode/encode cycle unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A process definition delivered alongside tasks in a list response.
///
/// The `id` is read from `fields` rather than typed, so a record without
/// one, or with an unexpected type, simply never matches a task.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProcessDefinitionRecord {
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ProcessDefinitionRecord {
    pub fn id(&self) -> Option<&Value> {
        self.fields.get("id")
    }
}

/// Entities nested into a single task record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TaskEmbedded {
    #[serde(
        rename = "processDefinition",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub process_definition: Option<Vec<ProcessDefinitionRecord>>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// One task of a list response.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TaskRecord {
    #[serde(rename = "_embedded", default, skip_serializing_if = "Option::is_none")]
    pub embedded: Option<TaskEmbedded>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl TaskRecord {
    pub fn id(&self) -> Option<&Value> {
        self.fields.get("id")
    }

    /// `processDefinitionId` as sent; `null` counts as absent.
    pub fn process_definition_id(&self) -> Option<&Value> {
        self.fields.get("processDefinitionId").filter(|id| !id.is_null())
    }

    /// The process definition embedded into this task, if any.
    pub fn process_definition(&self) -> Option<&ProcessDefinitionRecord> {
        self.embedded
            .as_ref()?
            .process_definition
            .as_ref()?
            .first()
    }
}

/// The `_embedded` envelope of a task list response.
///
/// The engine names the task collection either `task` or `tasks`; whichever
/// was received is written back under the same name.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TaskListEmbedded {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<Vec<TaskRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<TaskRecord>>,
    #[serde(
        rename = "processDefinition",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub process_definition: Option<Vec<ProcessDefinitionRecord>>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl TaskListEmbedded {
    /// The task collection, preferring `task` over `tasks`.
    pub fn task_collection(&self) -> Option<&Vec<TaskRecord>> {
        self.task.as_ref().or(self.tasks.as_ref())
    }
}

/// A task list response envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TaskList {
    #[serde(rename = "_embedded", default, skip_serializing_if = "Option::is_none")]
    pub embedded: Option<TaskListEmbedded>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl TaskList {
    /// The tasks in server order; empty when the response carried none.
    pub fn tasks(&self) -> &[TaskRecord] {
        self.embedded
            .as_ref()
            .and_then(TaskListEmbedded::task_collection)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn count(&self) -> Option<u64> {
        self.fields.get("count").and_then(Value::as_u64)
    }
}

/// Identity link payload for adding or removing a user/group link on a task.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IdentityLink {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(rename = "type")]
    pub link_type: String,
}

/// Selects the task whose form variables are fetched.
///
/// `key` takes precedence over `id`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormVariablesQuery {
    pub key: Option<String>,
    pub id: Option<String>,
    pub deserialize_values: Option<bool>,
    pub names: Option<Vec<String>>,
}

/// Starts a process instance from a definition, by id or by key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StartProcess {
    pub id: Option<String>,
    pub key: Option<String>,
    pub variables: Option<Map<String, Value>>,
    pub business_key: Option<String>,
}

/// Execution-state modification of a running process instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Modification {
    pub instructions: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_custom_listeners: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_io_mappings: Option<bool>,
}

/// Selects the variables of a process instance; all of them, or one by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariablesQuery {
    pub id: String,
    pub var_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn task_list_keeps_unknown_fields() {
        let raw = json!({
            "_embedded": {
                "task": [{"id": "t1", "name": "Review", "processDefinitionId": "A"}],
                "processDefinition": [{"id": "A", "name": "Invoice"}],
                "identityLink": []
            },
            "count": 1
        });
        let list: TaskList = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(list.count(), Some(1));
        assert_eq!(list.tasks().len(), 1);
        assert_eq!(list.tasks()[0].id(), Some(&json!("t1")));
        assert_eq!(serde_json::to_value(&list).unwrap(), raw);
    }

    #[test]
    fn task_list_accepts_tasks_key() {
        let raw = json!({"_embedded": {"tasks": [{"id": "t1"}]}});
        let list: TaskList = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(list.tasks().len(), 1);
        assert_eq!(serde_json::to_value(&list).unwrap(), raw);
    }

    #[test]
    fn task_list_without_envelope_has_no_tasks() {
        let list: TaskList = serde_json::from_value(json!({"count": 0})).unwrap();
        assert!(list.embedded.is_none());
        assert!(list.tasks().is_empty());
    }

    #[test]
    fn identity_link_serializes_camel_case() {
        let link = IdentityLink {
            user_id: Some("kermit".to_string()),
            group_id: None,
            link_type: "candidate".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&link).unwrap(),
            json!({"userId": "kermit", "type": "candidate"})
        );
    }

    #[test]
    fn modification_omits_unset_flags() {
        let modification = Modification {
            instructions: vec![json!({"type": "startBeforeActivity", "activityId": "a"})],
            skip_custom_listeners: Some(true),
            skip_io_mappings: None,
        };
        assert_eq!(
            serde_json::to_value(&modification).unwrap(),
            json!({
                "instructions": [{"type": "startBeforeActivity", "activityId": "a"}],
                "skipCustomListeners": true
            })
        );
    }

    #[test]
    fn task_list_decodes_records_with_odd_ids() {
        let raw = json!({
            "_embedded": {
                "task": [{"id": "t1", "processDefinitionId": 7}],
                "processDefinition": [{"id": "A"}, {"key": "noid"}]
            }
        });
        let list: TaskList = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(list.tasks()[0].process_definition_id(), Some(&json!(7)));
        let definitions = list.embedded.as_ref().unwrap().process_definition.as_ref().unwrap();
        assert!(definitions[1].id().is_none());
        assert_eq!(serde_json::to_value(&list).unwrap(), raw);
    }
}
