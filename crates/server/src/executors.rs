//! One executor per validated action. Every path either performs its store
//! effect and reports it, or fails with a `CommandError` before any write.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use rolobot_core::domain::person::{draft_from_bulk_entries, Person, PersonDraft};
use rolobot_core::domain::task::{parse_user_date, TaskDraft, TaskField, TaskPriority, TaskStatus};
use rolobot_core::intent::{
    ActionDecision, AddPeopleBulkParams, AddTaskParams, ListTasksParams, TaskFilter,
    UpdatePersonParams, UpdateTaskParams,
};
use rolobot_core::CommandError;
use rolobot_db::repositories::{
    PersonRepository, RepositoryError, TaskQuery, TaskRepository,
};

use crate::replies;

/// Search results are capped at ten rows, task listings at twenty.
pub const SEARCH_CAP: u32 = 10;
pub const TASK_LIST_CAP: u32 = 20;

pub(crate) fn store_error(error: RepositoryError) -> CommandError {
    match error {
        RepositoryError::Conflict => CommandError::Busy,
        other => CommandError::Persistence(other.to_string()),
    }
}

pub struct ActionExecutors {
    people: Arc<dyn PersonRepository>,
    tasks: Arc<dyn TaskRepository>,
}

impl ActionExecutors {
    pub fn new(people: Arc<dyn PersonRepository>, tasks: Arc<dyn TaskRepository>) -> Self {
        Self { people, tasks }
    }

    /// Runs the executor for one validated decision. `Unrecognized` never
    /// reaches a store: it resolves to the generic could-not-understand
    /// reply here.
    pub async fn execute(&self, decision: ActionDecision) -> Result<String, CommandError> {
        match decision {
            ActionDecision::Search(params) => self.search(&params.terms.join(" ")).await,
            ActionDecision::AddTask(params) => self.add_task(params).await,
            ActionDecision::RemoveTask(params) => self.remove_task(params.task_id).await,
            ActionDecision::AddTaskAlert(params) => self.add_task_alert(params.task_id).await,
            ActionDecision::ListTasks(params) => self.list_tasks(params).await,
            ActionDecision::AddPeopleBulk(params) => self.add_people_bulk(params).await,
            ActionDecision::ListMeetings => Ok(replies::meetings_coming_soon().to_string()),
            ActionDecision::UpdateTask(params) => self.update_task(params).await,
            ActionDecision::UpdatePerson(params) => self.update_person(params).await,
            ActionDecision::Unrecognized => Ok(replies::not_understood().to_string()),
        }
    }

    /// Commits a finished wizard draft. The single store write of the
    /// add-person flow.
    pub(crate) async fn insert_person(&self, draft: PersonDraft) -> Result<Person, CommandError> {
        let person = self.people.insert(draft).await.map_err(store_error)?;
        info!(person_id = person.id, "contact created");
        Ok(person)
    }

    pub async fn search(&self, query: &str) -> Result<String, CommandError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(CommandError::Validation { field: "query".to_string() });
        }

        let matches = self.people.search(query, SEARCH_CAP).await.map_err(store_error)?;
        info!(query, matched = matches.len(), "contact search executed");

        if matches.is_empty() {
            return Ok(replies::no_results(query));
        }
        Ok(replies::person_list(&matches))
    }

    async fn add_task(&self, params: AddTaskParams) -> Result<String, CommandError> {
        if params.text.is_empty() {
            return Err(CommandError::Validation { field: "text".to_string() });
        }

        let draft = TaskDraft {
            text: params.text,
            assignee: params.assignee,
            due_date: params.due_date,
            status: params.status,
            priority: params.priority,
            label: params.label,
        };
        let task = self.tasks.insert(draft).await.map_err(store_error)?;
        info!(task_id = task.id, "task created");
        Ok(replies::task_added(&task))
    }

    async fn remove_task(&self, task_id: i64) -> Result<String, CommandError> {
        // Existence check first so a stale id reports not-found instead of
        // silently succeeding.
        if self.tasks.find_by_id(task_id).await.map_err(store_error)?.is_none() {
            return Err(CommandError::NotFound { what: format!("task #{task_id}") });
        }

        self.tasks.delete(task_id).await.map_err(store_error)?;
        info!(task_id, "task removed");
        Ok(replies::task_removed(task_id))
    }

    async fn add_task_alert(&self, task_id: i64) -> Result<String, CommandError> {
        if self.tasks.find_by_id(task_id).await.map_err(store_error)?.is_none() {
            return Err(CommandError::NotFound { what: format!("task #{task_id}") });
        }
        Ok(replies::task_alert_ack(task_id))
    }

    async fn list_tasks(&self, params: ListTasksParams) -> Result<String, CommandError> {
        let mut query = TaskQuery {
            due_before: params.period.due_before(Utc::now()),
            limit: TASK_LIST_CAP,
            ..TaskQuery::default()
        };
        match params.filter {
            Some(TaskFilter::Priority(priority)) => query.priority = Some(priority),
            Some(TaskFilter::Status(status)) => query.status = Some(status),
            Some(TaskFilter::Assignee(assignee)) => query.assignee = Some(assignee),
            None => {}
        }

        let tasks = self.tasks.list(&query).await.map_err(store_error)?;
        if tasks.is_empty() {
            return Ok(replies::no_tasks().to_string());
        }
        Ok(replies::task_list(&tasks))
    }

    async fn add_people_bulk(&self, params: AddPeopleBulkParams) -> Result<String, CommandError> {
        let Some(draft) = draft_from_bulk_entries(&params.entries) else {
            return Err(CommandError::Validation { field: "full name".to_string() });
        };

        let person = self.people.insert(draft).await.map_err(store_error)?;
        info!(person_id = person.id, "contact created from bulk entry");
        Ok(replies::person_added(&person))
    }

    async fn update_task(&self, params: UpdateTaskParams) -> Result<String, CommandError> {
        if params.new_value.is_empty() {
            return Err(CommandError::Validation { field: "new_value".to_string() });
        }

        let stored_value = normalize_task_value(params.field, &params.new_value)?;
        let updated = self
            .tasks
            .update_field(params.task_id, params.field, &stored_value)
            .await
            .map_err(store_error)?;

        if !updated {
            return Err(CommandError::NotFound { what: format!("task #{}", params.task_id) });
        }
        info!(task_id = params.task_id, field = params.field.label(), "task field updated");
        Ok(replies::task_updated(params.task_id, params.field.label()))
    }

    async fn update_person(&self, params: UpdatePersonParams) -> Result<String, CommandError> {
        if params.identifier.is_empty() {
            return Err(CommandError::Validation { field: "identifier".to_string() });
        }
        for (field, value) in &params.updates {
            if value.trim().is_empty() {
                return Err(CommandError::Validation { field: field.label().to_string() });
            }
        }

        let matches =
            self.people.find_by_identifier(&params.identifier).await.map_err(store_error)?;

        match matches.as_slice() {
            [] => Err(CommandError::NotFound {
                what: format!("anyone matching `{}`", params.identifier),
            }),
            [only] => {
                self.people.update_fields(only.id, &params.updates).await.map_err(store_error)?;
                info!(person_id = only.id, fields = params.updates.len(), "contact updated");

                let changed: Vec<&str> =
                    params.updates.iter().map(|(field, _)| field.label()).collect();
                Ok(replies::person_updated(&only.full_name, &changed))
            }
            several => Err(CommandError::AmbiguousEntity {
                candidates: several.iter().map(|person| person.summary_line()).collect(),
            }),
        }
    }
}

/// Field-specific normalization for task updates: enum-valued fields must
/// parse, dates are canonicalized to RFC3339, free text passes through.
fn normalize_task_value(field: TaskField, raw: &str) -> Result<String, CommandError> {
    match field {
        TaskField::Status => TaskStatus::parse(raw)
            .map(|status| status.storage_value().to_string())
            .ok_or_else(|| CommandError::Validation { field: "status".to_string() }),
        TaskField::Priority => TaskPriority::parse(raw)
            .map(|priority| priority.storage_value().to_string())
            .ok_or_else(|| CommandError::Validation { field: "priority".to_string() }),
        TaskField::DueDate => parse_user_date(raw)
            .map(|due| due.to_rfc3339())
            .ok_or_else(|| CommandError::Validation { field: "due_date".to_string() }),
        TaskField::Text | TaskField::AssignTo | TaskField::Label => Ok(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};

    use rolobot_core::domain::person::{PersonDraft, PersonField};
    use rolobot_core::domain::task::{ListPeriod, TaskDraft, TaskField, TaskPriority};
    use rolobot_core::intent::{
        ActionDecision, AddPeopleBulkParams, AddTaskParams, ListTasksParams, TaskFilter,
        UpdatePersonParams, UpdateTaskParams,
    };
    use rolobot_core::{CommandError, TaskStatus};
    use rolobot_db::repositories::{
        InMemoryPersonRepository, InMemoryTaskRepository, PersonRepository, TaskRepository,
    };

    use super::ActionExecutors;

    fn executors() -> (ActionExecutors, Arc<InMemoryPersonRepository>, Arc<InMemoryTaskRepository>)
    {
        let people = Arc::new(InMemoryPersonRepository::default());
        let tasks = Arc::new(InMemoryTaskRepository::default());
        (ActionExecutors::new(people.clone(), tasks.clone()), people, tasks)
    }

    fn person(name: &str, email: Option<&str>) -> PersonDraft {
        PersonDraft {
            full_name: name.to_string(),
            email: email.map(Into::into),
            ..PersonDraft::default()
        }
    }

    #[tokio::test]
    async fn search_caps_results_and_reports_empty_sets() {
        let (executors, people, _) = executors();
        for index in 0..12 {
            people
                .insert(person(&format!("Fintech Angel {index:02}"), None))
                .await
                .expect("seed");
        }

        let listing = executors.search("fintech").await.expect("search");
        assert_eq!(listing.matches("\n").count(), 10, "one line per capped result");

        let empty = executors.search("cryptozoology").await.expect("search");
        assert!(empty.contains("No contacts matched"));
    }

    #[tokio::test]
    async fn add_task_reports_generated_id_and_defaults() {
        let (executors, _, tasks) = executors();

        let reply = executors
            .execute(ActionDecision::AddTask(AddTaskParams {
                text: "call Sam".to_string(),
                assignee: None,
                due_date: None,
                label: None,
                priority: TaskPriority::Medium,
                status: TaskStatus::Pending,
            }))
            .await
            .expect("add");

        assert!(reply.contains("Task #1 added"));
        assert!(reply.contains("medium priority"));
        let stored = tasks.find_by_id(1).await.expect("find").expect("present");
        assert_eq!(stored.text, "call Sam");
    }

    #[tokio::test]
    async fn add_task_without_text_is_a_validation_error() {
        let (executors, _, tasks) = executors();

        let outcome = executors
            .execute(ActionDecision::AddTask(AddTaskParams {
                text: String::new(),
                assignee: None,
                due_date: None,
                label: None,
                priority: TaskPriority::Medium,
                status: TaskStatus::Pending,
            }))
            .await;

        assert!(matches!(outcome, Err(CommandError::Validation { ref field }) if field == "text"));
        assert!(tasks.find_by_id(1).await.expect("find").is_none(), "nothing inserted");
    }

    #[tokio::test]
    async fn removing_a_missing_task_reports_not_found() {
        let (executors, _, tasks) = executors();

        let outcome = executors.remove_task(99).await;
        assert!(matches!(outcome, Err(CommandError::NotFound { .. })));

        let task = tasks.insert(TaskDraft::new("call Sam")).await.expect("insert");
        let reply = executors.remove_task(task.id).await.expect("remove");
        assert!(reply.contains(&format!("#{}", task.id)));
    }

    #[tokio::test]
    async fn alert_ack_is_explicit_about_being_a_stub() {
        let (executors, _, tasks) = executors();
        let task = tasks.insert(TaskDraft::new("call Sam")).await.expect("insert");

        let reply = executors.add_task_alert(task.id).await.expect("ack");
        assert!(reply.contains("aren't implemented"));

        let missing = executors.add_task_alert(404).await;
        assert!(matches!(missing, Err(CommandError::NotFound { .. })));
    }

    #[tokio::test]
    async fn list_tasks_applies_filter_and_period_window() {
        let (executors, _, tasks) = executors();
        let now = Utc::now();

        let mut this_week = TaskDraft::new("prep board deck");
        this_week.priority = TaskPriority::High;
        this_week.due_date = Some(now + Duration::days(2));
        tasks.insert(this_week).await.expect("insert");

        let mut next_month = TaskDraft::new("quarterly review");
        next_month.priority = TaskPriority::High;
        next_month.due_date = Some(now + Duration::days(25));
        tasks.insert(next_month).await.expect("insert");

        let reply = executors
            .list_tasks(ListTasksParams {
                filter: Some(TaskFilter::Priority(TaskPriority::High)),
                period: ListPeriod::Weekly,
            })
            .await
            .expect("list");

        assert!(reply.contains("prep board deck"));
        assert!(!reply.contains("quarterly review"));
    }

    #[tokio::test]
    async fn bulk_add_echoes_captured_fields_and_drops_unknown_keys() {
        let (executors, people, _) = executors();

        let reply = executors
            .add_people_bulk(AddPeopleBulkParams {
                entries: vec![
                    "Full Name: Jane Doe".to_string(),
                    "Email: jane@acme.com".to_string(),
                    "Shoe Size: 38".to_string(),
                ],
            })
            .await
            .expect("bulk add");

        assert!(reply.contains("Jane Doe"));
        assert!(reply.contains("jane@acme.com"));
        assert!(!reply.contains("38"));

        let stored = people.find_by_identifier("jane").await.expect("find");
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn update_task_normalizes_enum_fields_and_rejects_junk() {
        let (executors, _, tasks) = executors();
        let task = tasks.insert(TaskDraft::new("call Sam")).await.expect("insert");

        executors
            .update_task(UpdateTaskParams {
                task_id: task.id,
                field: TaskField::Status,
                new_value: "Done".to_string(),
            })
            .await
            .expect("update");

        let stored = tasks.find_by_id(task.id).await.expect("find").expect("present");
        assert_eq!(stored.status, TaskStatus::Done);

        let junk = executors
            .update_task(UpdateTaskParams {
                task_id: task.id,
                field: TaskField::Priority,
                new_value: "banana".to_string(),
            })
            .await;
        assert!(
            matches!(junk, Err(CommandError::Validation { ref field }) if field == "priority")
        );
    }

    #[tokio::test]
    async fn update_person_disambiguation_policy_holds_exactly() {
        let (executors, people, _) = executors();
        people.insert(person("Jane Doe", Some("a@x.com"))).await.expect("seed");
        people.insert(person("Jane Smith", Some("jane@smith.dev"))).await.expect("seed");

        // zero matches: not found, no mutation
        let missing = executors
            .update_person(UpdatePersonParams {
                identifier: "nobody@nowhere".to_string(),
                updates: vec![(PersonField::Email, "x@y.com".to_string())],
            })
            .await;
        assert!(matches!(missing, Err(CommandError::NotFound { .. })));

        // two matches: candidates listed, no mutation
        let ambiguous = executors
            .update_person(UpdatePersonParams {
                identifier: "jane".to_string(),
                updates: vec![(PersonField::Email, "x@y.com".to_string())],
            })
            .await;
        match ambiguous {
            Err(CommandError::AmbiguousEntity { candidates }) => {
                assert_eq!(candidates.len(), 2);
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }
        let untouched = people.find_by_identifier("a@x.com").await.expect("find");
        assert_eq!(untouched.len(), 1, "no write may land on an ambiguous match");

        // exactly one match: only the named field changes
        let reply = executors
            .update_person(UpdatePersonParams {
                identifier: "a@x.com".to_string(),
                updates: vec![(PersonField::Email, "b@y.com".to_string())],
            })
            .await
            .expect("update");
        assert!(reply.contains("email"));
        assert!(reply.contains("Jane Doe"));

        let updated = people.find_by_identifier("b@y.com").await.expect("find");
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].full_name, "Jane Doe", "name untouched");
    }
}
