use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use rolobot_core::domain::task::{Task, TaskDraft, TaskField, TaskPriority, TaskStatus};

use super::{RepositoryError, TaskQuery, TaskRepository};
use crate::DbPool;

pub struct SqlTaskRepository {
    pool: DbPool,
}

impl SqlTaskRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const TASK_COLUMNS: &str = "id, text, assignee, due_date, status, priority, label, created_at";

#[async_trait]
impl TaskRepository for SqlTaskRepository {
    async fn insert(&self, draft: TaskDraft) -> Result<Task, RepositoryError> {
        let created_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO tasks (text, assignee, due_date, status, priority, label, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&draft.text)
        .bind(&draft.assignee)
        .bind(draft.due_date.map(|due| due.to_rfc3339()))
        .bind(draft.status.storage_value())
        .bind(draft.priority.storage_value())
        .bind(&draft.label)
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(Task {
            id: result.last_insert_rowid(),
            text: draft.text,
            assignee: draft.assignee,
            due_date: draft.due_date,
            status: draft.status,
            priority: draft.priority,
            label: draft.label,
            created_at,
        })
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Task>, RepositoryError> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?");
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(decode_task).transpose()
    }

    async fn delete(&self, id: i64) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?").bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_field(
        &self,
        id: i64,
        field: TaskField,
        value: &str,
    ) -> Result<bool, RepositoryError> {
        // Column name comes from the TaskField enum, never from input.
        let sql = format!("UPDATE tasks SET {} = ? WHERE id = ?", field.column_name());
        let result = sqlx::query(&sql).bind(value).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, query: &TaskQuery) -> Result<Vec<Task>, RepositoryError> {
        let mut sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE 1 = 1");
        if query.status.is_some() {
            sql.push_str(" AND status = ?");
        }
        if query.priority.is_some() {
            sql.push_str(" AND priority = ?");
        }
        if query.assignee.is_some() {
            sql.push_str(" AND lower(IFNULL(assignee, '')) = ?");
        }
        if query.due_before.is_some() {
            // RFC3339 UTC timestamps compare correctly as text.
            sql.push_str(" AND due_date IS NOT NULL AND due_date <= ?");
        }
        sql.push_str(" ORDER BY due_date IS NULL, due_date, id LIMIT ?");

        let mut prepared = sqlx::query(&sql);
        if let Some(status) = query.status {
            prepared = prepared.bind(status.storage_value());
        }
        if let Some(priority) = query.priority {
            prepared = prepared.bind(priority.storage_value());
        }
        if let Some(assignee) = &query.assignee {
            prepared = prepared.bind(assignee.to_lowercase());
        }
        if let Some(due_before) = query.due_before {
            prepared = prepared.bind(due_before.to_rfc3339());
        }
        prepared = prepared.bind(i64::from(query.limit));

        let rows = prepared.fetch_all(&self.pool).await?;
        rows.iter().map(decode_task).collect()
    }
}

fn decode_task(row: &SqliteRow) -> Result<Task, RepositoryError> {
    let status_raw = row.get::<String, _>("status");
    let status = TaskStatus::parse(&status_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown task status `{status_raw}`")))?;

    let priority_raw = row.get::<String, _>("priority");
    let priority = TaskPriority::parse(&priority_raw).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown task priority `{priority_raw}`"))
    })?;

    let due_date = row
        .get::<Option<String>, _>("due_date")
        .map(|raw| {
            DateTime::parse_from_rfc3339(&raw)
                .map(|parsed| parsed.with_timezone(&Utc))
                .map_err(|err| RepositoryError::Decode(err.to_string()))
        })
        .transpose()?;

    let created_at = DateTime::parse_from_rfc3339(&row.get::<String, _>("created_at"))
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|err| RepositoryError::Decode(err.to_string()))?;

    Ok(Task {
        id: row.get("id"),
        text: row.get("text"),
        assignee: row.get("assignee"),
        due_date,
        status,
        priority,
        label: row.get("label"),
        created_at,
    })
}
