use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use rolobot_core::domain::person::{Person, PersonDraft, PersonField};
use rolobot_core::domain::session::{Profile, Session};
use rolobot_core::domain::task::{Task, TaskDraft, TaskField, TaskPriority, TaskStatus};

use super::{
    PersonRepository, RepositoryError, SessionRepository, TaskQuery, TaskRepository,
};

#[derive(Default)]
pub struct InMemorySessionRepository {
    sessions: RwLock<HashMap<i64, Session>>,
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn get_or_create(&self, user_id: i64) -> Result<Session, RepositoryError> {
        let mut sessions = self.sessions.write().await;
        Ok(sessions.entry(user_id).or_insert_with(|| Session::new(user_id)).clone())
    }

    async fn save_conversation(&self, session: &Session) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.write().await;
        let Some(stored) = sessions.get_mut(&session.user_id) else {
            return Err(RepositoryError::Conflict);
        };
        // Same compare-and-swap contract as the SQL implementation: only the
        // conversation columns move, and only from the loaded version.
        if stored.version != session.version {
            return Err(RepositoryError::Conflict);
        }
        stored.state = session.state;
        stored.pending = session.pending.clone();
        stored.version += 1;
        Ok(())
    }

    async fn mark_authenticated(
        &self,
        user_id: i64,
        profile: &Profile,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.write().await;
        let stored = sessions.entry(user_id).or_insert_with(|| Session::new(user_id));
        stored.authenticated = true;
        stored.authenticated_at = Some(at);
        stored.username = profile.username.clone();
        stored.first_name = profile.first_name.clone();
        Ok(())
    }
}

pub struct InMemoryPersonRepository {
    people: RwLock<HashMap<i64, Person>>,
    next_id: AtomicI64,
}

impl Default for InMemoryPersonRepository {
    fn default() -> Self {
        Self { people: RwLock::new(HashMap::new()), next_id: AtomicI64::new(1) }
    }
}

fn contains_insensitive(haystack: Option<&str>, needle: &str) -> bool {
    haystack.map(|value| value.to_lowercase().contains(needle)).unwrap_or(false)
}

#[async_trait]
impl PersonRepository for InMemoryPersonRepository {
    async fn insert(&self, draft: PersonDraft) -> Result<Person, RepositoryError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let person = Person {
            id,
            full_name: draft.full_name,
            email: draft.email,
            company: draft.company,
            categories: draft.categories,
            status: draft.status,
            linkedin_profile: draft.linkedin_profile,
            poc: draft.poc,
            warm_intro: draft.warm_intro,
            notes: draft.notes,
            created_at: Utc::now(),
        };
        self.people.write().await.insert(id, person.clone());
        Ok(person)
    }

    async fn search(&self, query: &str, limit: u32) -> Result<Vec<Person>, RepositoryError> {
        let needle = query.trim().to_lowercase();
        let people = self.people.read().await;

        let mut matches: Vec<Person> = people
            .values()
            .filter(|person| {
                contains_insensitive(Some(&person.full_name), &needle)
                    || contains_insensitive(person.email.as_deref(), &needle)
                    || contains_insensitive(person.company.as_deref(), &needle)
                    || contains_insensitive(person.categories.as_deref(), &needle)
                    || contains_insensitive(person.status.as_deref(), &needle)
                    || contains_insensitive(person.notes.as_deref(), &needle)
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.full_name.cmp(&b.full_name).then(a.id.cmp(&b.id)));
        matches.truncate(limit as usize);
        Ok(matches)
    }

    async fn find_by_identifier(&self, fragment: &str) -> Result<Vec<Person>, RepositoryError> {
        let needle = fragment.trim().to_lowercase();
        let people = self.people.read().await;

        let mut matches: Vec<Person> = people
            .values()
            .filter(|person| {
                contains_insensitive(Some(&person.full_name), &needle)
                    || contains_insensitive(person.email.as_deref(), &needle)
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.full_name.cmp(&b.full_name).then(a.id.cmp(&b.id)));
        Ok(matches)
    }

    async fn update_fields(
        &self,
        id: i64,
        updates: &[(PersonField, String)],
    ) -> Result<(), RepositoryError> {
        let mut people = self.people.write().await;
        let Some(person) = people.get_mut(&id) else {
            return Ok(());
        };

        for (field, value) in updates {
            let value = value.clone();
            match field {
                PersonField::FullName => person.full_name = value,
                PersonField::Email => person.email = Some(value),
                PersonField::Company => person.company = Some(value),
                PersonField::Categories => person.categories = Some(value),
                PersonField::Status => person.status = Some(value),
                PersonField::LinkedinProfile => person.linkedin_profile = Some(value),
                PersonField::Poc => person.poc = Some(value),
                PersonField::WarmIntro => person.warm_intro = Some(value),
                PersonField::Notes => person.notes = Some(value),
            }
        }
        Ok(())
    }
}

pub struct InMemoryTaskRepository {
    tasks: RwLock<HashMap<i64, Task>>,
    next_id: AtomicI64,
}

impl Default for InMemoryTaskRepository {
    fn default() -> Self {
        Self { tasks: RwLock::new(HashMap::new()), next_id: AtomicI64::new(1) }
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn insert(&self, draft: TaskDraft) -> Result<Task, RepositoryError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let task = Task {
            id,
            text: draft.text,
            assignee: draft.assignee,
            due_date: draft.due_date,
            status: draft.status,
            priority: draft.priority,
            label: draft.label,
            created_at: Utc::now(),
        };
        self.tasks.write().await.insert(id, task.clone());
        Ok(task)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Task>, RepositoryError> {
        Ok(self.tasks.read().await.get(&id).cloned())
    }

    async fn delete(&self, id: i64) -> Result<bool, RepositoryError> {
        Ok(self.tasks.write().await.remove(&id).is_some())
    }

    async fn update_field(
        &self,
        id: i64,
        field: TaskField,
        value: &str,
    ) -> Result<bool, RepositoryError> {
        let mut tasks = self.tasks.write().await;
        let Some(task) = tasks.get_mut(&id) else {
            return Ok(false);
        };

        match field {
            TaskField::Text => task.text = value.to_string(),
            TaskField::AssignTo => task.assignee = Some(value.to_string()),
            TaskField::DueDate => {
                let parsed = DateTime::parse_from_rfc3339(value)
                    .map(|due| due.with_timezone(&Utc))
                    .map_err(|err| RepositoryError::Decode(err.to_string()))?;
                task.due_date = Some(parsed);
            }
            TaskField::Status => {
                task.status = TaskStatus::parse(value)
                    .ok_or_else(|| RepositoryError::Decode(format!("unknown status `{value}`")))?;
            }
            TaskField::Priority => {
                task.priority = TaskPriority::parse(value).ok_or_else(|| {
                    RepositoryError::Decode(format!("unknown priority `{value}`"))
                })?;
            }
            TaskField::Label => task.label = Some(value.to_string()),
        }
        Ok(true)
    }

    async fn list(&self, query: &TaskQuery) -> Result<Vec<Task>, RepositoryError> {
        let tasks = self.tasks.read().await;
        let assignee = query.assignee.as_deref().map(str::to_lowercase);

        let mut matches: Vec<Task> = tasks
            .values()
            .filter(|task| query.status.map(|status| task.status == status).unwrap_or(true))
            .filter(|task| {
                query.priority.map(|priority| task.priority == priority).unwrap_or(true)
            })
            .filter(|task| {
                assignee
                    .as_deref()
                    .map(|wanted| {
                        task.assignee
                            .as_deref()
                            .map(|actual| actual.to_lowercase() == wanted)
                            .unwrap_or(false)
                    })
                    .unwrap_or(true)
            })
            .filter(|task| {
                query
                    .due_before
                    .map(|bound| task.due_date.map(|due| due <= bound).unwrap_or(false))
                    .unwrap_or(true)
            })
            .cloned()
            .collect();

        matches.sort_by(|a, b| match (a.due_date, b.due_date) {
            (Some(a_due), Some(b_due)) => a_due.cmp(&b_due).then(a.id.cmp(&b.id)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.id.cmp(&b.id),
        });
        matches.truncate(query.limit as usize);
        Ok(matches)
    }
}
