//! Typed action decisions and the validation gate for classifier output.
//!
//! The external classification service replies with free text that should
//! be a 2-element JSON array `[action_id, parameters]`. Nothing downstream
//! may act on that text until it has passed through
//! [`ActionDecision::from_classifier_output`], which absorbs every parse
//! failure, unknown id, and shape mismatch into the `Unrecognized` variant.
//! Executors therefore only ever see well-shaped, typed parameters.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::domain::person::PersonField;
use crate::domain::task::{parse_user_date, ListPeriod, TaskField, TaskPriority, TaskStatus};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionDecision {
    Search(SearchParams),
    AddTask(AddTaskParams),
    RemoveTask(RemoveTaskParams),
    AddTaskAlert(AddTaskAlertParams),
    ListTasks(ListTasksParams),
    AddPeopleBulk(AddPeopleBulkParams),
    ListMeetings,
    UpdateTask(UpdateTaskParams),
    UpdatePerson(UpdatePersonParams),
    /// Anything the gate could not validate. Never reaches an executor.
    Unrecognized,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchParams {
    pub terms: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddTaskParams {
    pub text: String,
    pub assignee: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub label: Option<String>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoveTaskParams {
    pub task_id: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddTaskAlertParams {
    pub task_id: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListTasksParams {
    pub filter: Option<TaskFilter>,
    pub period: ListPeriod,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskFilter {
    Priority(TaskPriority),
    Status(TaskStatus),
    Assignee(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddPeopleBulkParams {
    pub entries: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdateTaskParams {
    pub task_id: i64,
    pub field: TaskField,
    pub new_value: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdatePersonParams {
    pub identifier: String,
    pub updates: Vec<(PersonField, String)>,
}

impl ActionDecision {
    /// Validates raw classifier output into a typed decision.
    ///
    /// Tolerates fenced code-block wrapping around the JSON body. Structural
    /// problems (non-JSON, wrong arity, unknown id, wrong parameter types,
    /// disallowed field names) all collapse into `Unrecognized`; semantic
    /// emptiness of required values is left for executor-level validation so
    /// the user can be told which field was missing.
    pub fn from_classifier_output(raw: &str) -> Self {
        let body = strip_code_fences(raw);
        let Ok(value) = serde_json::from_str::<Value>(body) else {
            return Self::Unrecognized;
        };

        let Value::Array(items) = value else {
            return Self::Unrecognized;
        };
        let [action_id, parameters] = items.as_slice() else {
            return Self::Unrecognized;
        };
        let Some(action_id) = as_integer(action_id) else {
            return Self::Unrecognized;
        };

        match action_id {
            1 => parse_search(parameters),
            2 => parse_add_task(parameters),
            3 => parse_task_id(parameters)
                .map(|task_id| Self::RemoveTask(RemoveTaskParams { task_id }))
                .unwrap_or(Self::Unrecognized),
            4 => parse_task_id(parameters)
                .map(|task_id| Self::AddTaskAlert(AddTaskAlertParams { task_id }))
                .unwrap_or(Self::Unrecognized),
            5 => parse_list_tasks(parameters),
            6 => parse_add_people_bulk(parameters),
            7 => Self::ListMeetings,
            8 => parse_update_task(parameters),
            9 => parse_update_person(parameters),
            _ => Self::Unrecognized,
        }
    }

    pub fn is_unrecognized(&self) -> bool {
        matches!(self, Self::Unrecognized)
    }
}

/// Removes a fenced code-block wrapper (with optional language tag) that
/// some models emit around the JSON body.
fn strip_code_fences(raw: &str) -> &str {
    let mut body = raw.trim();
    if let Some(rest) = body.strip_suffix("```") {
        body = rest;
    }
    if let Some(rest) = body.trim_start().strip_prefix("```") {
        body = match rest.split_once('\n') {
            Some((first_line, remainder)) if is_fence_tag(first_line) => remainder,
            _ => rest,
        };
    }
    body.trim()
}

fn is_fence_tag(line: &str) -> bool {
    let tag = line.trim();
    tag.is_empty() || tag.chars().all(|ch| ch.is_ascii_alphanumeric())
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn as_string(value: &Value) -> Option<String> {
    value.as_str().map(|text| text.trim().to_string())
}

fn optional_string(object: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).map(str::trim).filter(|v| !v.is_empty()).map(Into::into)
}

fn parse_search(parameters: &Value) -> ActionDecision {
    let Value::Array(raw_terms) = parameters else {
        return ActionDecision::Unrecognized;
    };

    let mut terms = Vec::with_capacity(raw_terms.len());
    for raw in raw_terms {
        let Some(term) = as_string(raw) else {
            return ActionDecision::Unrecognized;
        };
        if !term.is_empty() {
            terms.push(term);
        }
    }

    if terms.is_empty() {
        return ActionDecision::Unrecognized;
    }
    ActionDecision::Search(SearchParams { terms })
}

fn parse_add_task(parameters: &Value) -> ActionDecision {
    let Value::Object(object) = parameters else {
        return ActionDecision::Unrecognized;
    };
    let Some(text) = object.get("text").and_then(Value::as_str) else {
        return ActionDecision::Unrecognized;
    };

    let priority = match object.get("priority").and_then(Value::as_str) {
        Some(raw) => match TaskPriority::parse(raw) {
            Some(priority) => priority,
            None => return ActionDecision::Unrecognized,
        },
        None => TaskPriority::default(),
    };
    let status = match object.get("status").and_then(Value::as_str) {
        Some(raw) => match TaskStatus::parse(raw) {
            Some(status) => status,
            None => return ActionDecision::Unrecognized,
        },
        None => TaskStatus::default(),
    };
    let due_date = match optional_string(object, "due_date") {
        Some(raw) => match parse_user_date(&raw) {
            Some(parsed) => Some(parsed),
            None => return ActionDecision::Unrecognized,
        },
        None => None,
    };

    ActionDecision::AddTask(AddTaskParams {
        text: text.trim().to_string(),
        assignee: optional_string(object, "assignee"),
        due_date,
        label: optional_string(object, "label"),
        priority,
        status,
    })
}

fn parse_task_id(parameters: &Value) -> Option<i64> {
    let id = match parameters {
        Value::Object(object) => as_integer(object.get("task_id")?)?,
        other => as_integer(other)?,
    };
    (id > 0).then_some(id)
}

fn parse_list_tasks(parameters: &Value) -> ActionDecision {
    let object = match parameters {
        Value::Object(object) => object,
        Value::Null => return ActionDecision::ListTasks(ListTasksParams::default()),
        _ => return ActionDecision::Unrecognized,
    };

    let period = match object.get("period").and_then(Value::as_str) {
        Some(raw) => match ListPeriod::parse(raw) {
            Some(period) => period,
            None => return ActionDecision::Unrecognized,
        },
        None => ListPeriod::default(),
    };

    let filter = match object.get("filter") {
        None | Some(Value::Null) => None,
        Some(Value::Object(filter_object)) => {
            let Some(filter) = parse_task_filter(filter_object) else {
                return ActionDecision::Unrecognized;
            };
            Some(filter)
        }
        Some(_) => return ActionDecision::Unrecognized,
    };

    ActionDecision::ListTasks(ListTasksParams { filter, period })
}

fn parse_task_filter(object: &serde_json::Map<String, Value>) -> Option<TaskFilter> {
    if object.len() != 1 {
        return None;
    }
    let (key, value) = object.iter().next()?;
    let value = value.as_str()?.trim();

    match key.as_str() {
        "priority" => TaskPriority::parse(value).map(TaskFilter::Priority),
        "status" => TaskStatus::parse(value).map(TaskFilter::Status),
        "assignee" => (!value.is_empty()).then(|| TaskFilter::Assignee(value.to_string())),
        _ => None,
    }
}

fn parse_add_people_bulk(parameters: &Value) -> ActionDecision {
    let Value::Array(raw_entries) = parameters else {
        return ActionDecision::Unrecognized;
    };

    let mut entries = Vec::with_capacity(raw_entries.len());
    for raw in raw_entries {
        let Some(entry) = as_string(raw) else {
            return ActionDecision::Unrecognized;
        };
        if !entry.is_empty() {
            entries.push(entry);
        }
    }

    if entries.is_empty() {
        return ActionDecision::Unrecognized;
    }
    ActionDecision::AddPeopleBulk(AddPeopleBulkParams { entries })
}

fn parse_update_task(parameters: &Value) -> ActionDecision {
    let Value::Object(object) = parameters else {
        return ActionDecision::Unrecognized;
    };
    let Some(task_id) = object.get("task_id").and_then(as_integer).filter(|id| *id > 0) else {
        return ActionDecision::Unrecognized;
    };
    let Some(field) = object.get("field").and_then(Value::as_str).and_then(TaskField::parse)
    else {
        return ActionDecision::Unrecognized;
    };
    let Some(new_value) = object.get("new_value").and_then(Value::as_str) else {
        return ActionDecision::Unrecognized;
    };

    ActionDecision::UpdateTask(UpdateTaskParams {
        task_id,
        field,
        new_value: new_value.trim().to_string(),
    })
}

fn parse_update_person(parameters: &Value) -> ActionDecision {
    let Value::Object(object) = parameters else {
        return ActionDecision::Unrecognized;
    };
    let Some(identifier) = object.get("identifier").and_then(Value::as_str) else {
        return ActionDecision::Unrecognized;
    };
    let Some(Value::Object(raw_updates)) = object.get("updates") else {
        return ActionDecision::Unrecognized;
    };

    let mut updates = Vec::with_capacity(raw_updates.len());
    for (raw_field, raw_value) in raw_updates {
        let Some(field) = PersonField::parse(raw_field) else {
            return ActionDecision::Unrecognized;
        };
        let Some(value) = raw_value.as_str() else {
            return ActionDecision::Unrecognized;
        };
        updates.push((field, value.trim().to_string()));
    }

    if updates.is_empty() {
        return ActionDecision::Unrecognized;
    }

    ActionDecision::UpdatePerson(UpdatePersonParams {
        identifier: identifier.trim().to_string(),
        updates,
    })
}
