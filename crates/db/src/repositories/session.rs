use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use rolobot_core::domain::session::{ConversationState, Profile, Session, StateData};

use super::{RepositoryError, SessionRepository};
use crate::DbPool;

pub struct SqlSessionRepository {
    pool: DbPool,
}

impl SqlSessionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const SELECT_SESSION: &str = "SELECT id, username, first_name, is_authenticated, \
     authenticated_at, current_state, state_data, version FROM sessions WHERE id = ?";

#[async_trait]
impl SessionRepository for SqlSessionRepository {
    async fn get_or_create(&self, user_id: i64) -> Result<Session, RepositoryError> {
        sqlx::query(
            "INSERT INTO sessions (id, current_state, state_data, version, updated_at) \
             VALUES (?, 'idle', '{}', 0, ?) ON CONFLICT(id) DO NOTHING",
        )
        .bind(user_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        let row = sqlx::query(SELECT_SESSION).bind(user_id).fetch_one(&self.pool).await?;
        decode_session(&row)
    }

    async fn save_conversation(&self, session: &Session) -> Result<(), RepositoryError> {
        // The auth columns are deliberately absent from the SET list: a
        // conversation save must never reset authentication.
        let result = sqlx::query(
            "UPDATE sessions SET current_state = ?, state_data = ?, version = version + 1, \
             updated_at = ? WHERE id = ? AND version = ?",
        )
        .bind(session.state.storage_value())
        .bind(StateData::from_session(session).encode())
        .bind(Utc::now().to_rfc3339())
        .bind(session.user_id)
        .bind(session.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict);
        }
        Ok(())
    }

    async fn mark_authenticated(
        &self,
        user_id: i64,
        profile: &Profile,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE sessions SET is_authenticated = 1, authenticated_at = ?, username = ?, \
             first_name = ?, updated_at = ? WHERE id = ?",
        )
        .bind(at.to_rfc3339())
        .bind(&profile.username)
        .bind(&profile.first_name)
        .bind(Utc::now().to_rfc3339())
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn decode_session(row: &SqliteRow) -> Result<Session, RepositoryError> {
    let raw_state_data = row.get::<String, _>("state_data");
    let state_data = StateData::decode(&raw_state_data)
        .map_err(|err| RepositoryError::Decode(err.to_string()))?;

    let raw_state = row.get::<String, _>("current_state");
    let state = ConversationState::from_storage(&raw_state, state_data.step)
        .map_err(|err| RepositoryError::Decode(err.to_string()))?;

    let authenticated_at = row
        .get::<Option<String>, _>("authenticated_at")
        .map(|raw| {
            DateTime::parse_from_rfc3339(&raw)
                .map(|parsed| parsed.with_timezone(&Utc))
                .map_err(|err| RepositoryError::Decode(err.to_string()))
        })
        .transpose()?;

    Ok(Session {
        user_id: row.get("id"),
        username: row.get("username"),
        first_name: row.get("first_name"),
        authenticated: row.get::<i64, _>("is_authenticated") != 0,
        authenticated_at,
        state,
        pending: state_data.pending,
        version: row.get("version"),
    })
}
