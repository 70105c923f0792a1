use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use rolobot_core::domain::person::{Person, PersonDraft, PersonField};
use rolobot_core::domain::session::{Profile, Session};
use rolobot_core::domain::task::{Task, TaskDraft, TaskField, TaskPriority, TaskStatus};

pub mod memory;
pub mod person;
pub mod session;
pub mod task;

pub use memory::{InMemoryPersonRepository, InMemorySessionRepository, InMemoryTaskRepository};
pub use person::SqlPersonRepository;
pub use session::SqlSessionRepository;
pub use task::SqlTaskRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    /// The session row moved underneath a compare-and-swap save.
    #[error("session row was modified concurrently")]
    Conflict,
}

/// Durable per-user conversation state.
///
/// `save_conversation` persists only `current_state` and `state_data`, via a
/// compare-and-swap on `version`; the authentication columns are not part of
/// the write, so a conversation save can never reset authentication.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn get_or_create(&self, user_id: i64) -> Result<Session, RepositoryError>;
    async fn save_conversation(&self, session: &Session) -> Result<(), RepositoryError>;
    async fn mark_authenticated(
        &self,
        user_id: i64,
        profile: &Profile,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait PersonRepository: Send + Sync {
    async fn insert(&self, draft: PersonDraft) -> Result<Person, RepositoryError>;
    /// Case-insensitive substring match across the searchable text fields.
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<Person>, RepositoryError>;
    /// Case-insensitive substring match on name/email only, for entity
    /// resolution. Unbounded: the caller decides what multiple hits mean.
    async fn find_by_identifier(&self, fragment: &str) -> Result<Vec<Person>, RepositoryError>;
    async fn update_fields(
        &self,
        id: i64,
        updates: &[(PersonField, String)],
    ) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn insert(&self, draft: TaskDraft) -> Result<Task, RepositoryError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Task>, RepositoryError>;
    /// Returns whether a row was actually deleted.
    async fn delete(&self, id: i64) -> Result<bool, RepositoryError>;
    /// Returns whether a row was actually updated.
    async fn update_field(
        &self,
        id: i64,
        field: TaskField,
        value: &str,
    ) -> Result<bool, RepositoryError>;
    async fn list(&self, query: &TaskQuery) -> Result<Vec<Task>, RepositoryError>;
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TaskQuery {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assignee: Option<String>,
    /// When set, only tasks with a due date at or before this bound match.
    pub due_before: Option<DateTime<Utc>>,
    pub limit: u32,
}
