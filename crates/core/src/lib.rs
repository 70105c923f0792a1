pub mod config;
pub mod domain;
pub mod errors;
pub mod intent;

pub use domain::person::{
    draft_from_bulk_entries, draft_from_pending, Person, PersonDraft, PersonField,
};
pub use domain::session::{
    AddPersonStep, ConversationState, Profile, Session, SessionDecodeError, StateData,
};
pub use domain::task::{
    parse_user_date, ListPeriod, Task, TaskDraft, TaskField, TaskPriority, TaskStatus,
};
pub use errors::CommandError;
pub use intent::{
    ActionDecision, AddPeopleBulkParams, AddTaskAlertParams, AddTaskParams, ListTasksParams,
    RemoveTaskParams, SearchParams, TaskFilter, UpdatePersonParams, UpdateTaskParams,
};
