//! Task list compilation.
//!
//! Task list responses carry the process definitions of their tasks in a
//! parallel collection. `embed_process_definitions` nests the matching
//! definition into each task under `_embedded.processDefinition` so callers
//! don't have to join the two themselves.
//!
//! The transformation is idempotent: applying it again to its own output
//! produces the same value, because the source collection is left in place.

use serde_json::Value;

use crate::types::{ProcessDefinitionRecord, TaskEmbedded, TaskList, TaskListEmbedded};

/// Nest each task's process definition into the task itself.
///
/// A response without an `_embedded` envelope is returned unchanged. Task
/// order is preserved. For each task the first definition whose `id` equals
/// the task's `processDefinitionId` is embedded as a one-element list. Every
/// task ends up with an `_embedded` map; tasks without a match keep whatever
/// definition they already carried.
pub fn embed_process_definitions(mut list: TaskList) -> TaskList {
    let Some(embedded) = list.embedded.as_mut() else {
        return list;
    };
    let TaskListEmbedded {
        task,
        tasks,
        process_definition,
        ..
    } = embedded;

    let collection = if task.is_some() { task } else { tasks };
    let Some(collection) = collection.as_mut() else {
        return list;
    };
    let definitions = process_definition.as_deref().unwrap_or_default();

    for record in collection.iter_mut() {
        let matched = find_definition(definitions, record.process_definition_id());
        let nested = record.embedded.get_or_insert_with(TaskEmbedded::default);
        if let Some(definition) = matched {
            nested.process_definition = Some(vec![definition.clone()]);
        }
    }
    list
}

/// First definition whose id equals `process_definition_id`, compared as
/// JSON values so `7` never matches `"7"`. Later duplicates are never
/// looked at.
fn find_definition<'a>(
    definitions: &'a [ProcessDefinitionRecord],
    process_definition_id: Option<&Value>,
) -> Option<&'a ProcessDefinitionRecord> {
    let wanted = process_definition_id?;
    definitions.iter().find(|definition| definition.id() == Some(wanted))
}
