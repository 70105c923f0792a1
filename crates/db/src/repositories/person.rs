use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use rolobot_core::domain::person::{Person, PersonDraft, PersonField};

use super::{PersonRepository, RepositoryError};
use crate::DbPool;

pub struct SqlPersonRepository {
    pool: DbPool,
}

impl SqlPersonRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const PERSON_COLUMNS: &str = "id, full_name, email, company, categories, status, \
     linkedin_profile, poc, warm_intro, notes, created_at";

#[async_trait]
impl PersonRepository for SqlPersonRepository {
    async fn insert(&self, draft: PersonDraft) -> Result<Person, RepositoryError> {
        let created_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO people (full_name, email, company, categories, status, \
             linkedin_profile, poc, warm_intro, notes, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&draft.full_name)
        .bind(&draft.email)
        .bind(&draft.company)
        .bind(&draft.categories)
        .bind(&draft.status)
        .bind(&draft.linkedin_profile)
        .bind(&draft.poc)
        .bind(&draft.warm_intro)
        .bind(&draft.notes)
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(Person {
            id: result.last_insert_rowid(),
            full_name: draft.full_name,
            email: draft.email,
            company: draft.company,
            categories: draft.categories,
            status: draft.status,
            linkedin_profile: draft.linkedin_profile,
            poc: draft.poc,
            warm_intro: draft.warm_intro,
            notes: draft.notes,
            created_at,
        })
    }

    async fn search(&self, query: &str, limit: u32) -> Result<Vec<Person>, RepositoryError> {
        let pattern = like_pattern(query);
        let sql = format!(
            "SELECT {PERSON_COLUMNS} FROM people WHERE \
             lower(full_name) LIKE ? OR lower(IFNULL(email, '')) LIKE ? OR \
             lower(IFNULL(company, '')) LIKE ? OR lower(IFNULL(categories, '')) LIKE ? OR \
             lower(IFNULL(status, '')) LIKE ? OR lower(IFNULL(notes, '')) LIKE ? \
             ORDER BY full_name, id LIMIT ?"
        );

        let rows = sqlx::query(&sql)
            .bind(&pattern)
            .bind(&pattern)
            .bind(&pattern)
            .bind(&pattern)
            .bind(&pattern)
            .bind(&pattern)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(decode_person).collect()
    }

    async fn find_by_identifier(&self, fragment: &str) -> Result<Vec<Person>, RepositoryError> {
        let pattern = like_pattern(fragment);
        let sql = format!(
            "SELECT {PERSON_COLUMNS} FROM people WHERE \
             lower(full_name) LIKE ? OR lower(IFNULL(email, '')) LIKE ? ORDER BY full_name, id"
        );

        let rows =
            sqlx::query(&sql).bind(&pattern).bind(&pattern).fetch_all(&self.pool).await?;

        rows.iter().map(decode_person).collect()
    }

    async fn update_fields(
        &self,
        id: i64,
        updates: &[(PersonField, String)],
    ) -> Result<(), RepositoryError> {
        if updates.is_empty() {
            return Ok(());
        }

        // Column names come from the PersonField enum, never from input.
        let mut sql = String::from("UPDATE people SET ");
        for (index, (field, _)) in updates.iter().enumerate() {
            if index > 0 {
                sql.push_str(", ");
            }
            sql.push_str(field.column_name());
            sql.push_str(" = ?");
        }
        sql.push_str(" WHERE id = ?");

        let mut query = sqlx::query(&sql);
        for (_, value) in updates {
            query = query.bind(value);
        }
        query.bind(id).execute(&self.pool).await?;
        Ok(())
    }
}

fn like_pattern(fragment: &str) -> String {
    format!("%{}%", fragment.trim().to_lowercase())
}

fn decode_person(row: &SqliteRow) -> Result<Person, RepositoryError> {
    let created_at = DateTime::parse_from_rfc3339(&row.get::<String, _>("created_at"))
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|err| RepositoryError::Decode(err.to_string()))?;

    Ok(Person {
        id: row.get("id"),
        full_name: row.get("full_name"),
        email: row.get("email"),
        company: row.get("company"),
        categories: row.get("categories"),
        status: row.get("status"),
        linkedin_profile: row.get("linkedin_profile"),
        poc: row.get("poc"),
        warm_intro: row.get("warm_intro"),
        notes: row.get("notes"),
        created_at,
    })
}
