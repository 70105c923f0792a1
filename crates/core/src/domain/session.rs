use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::person::PersonField;

/// Durable per-user conversation record. One row per external user id,
/// created on first contact and mutated once per processed message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub user_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub authenticated: bool,
    pub authenticated_at: Option<DateTime<Utc>>,
    pub state: ConversationState,
    /// Wizard accumulator keyed by person column name. Committed to the
    /// records store only on the wizard's final step.
    pub pending: BTreeMap<String, String>,
    /// Optimistic-concurrency token for conversation saves.
    pub version: i64,
}

impl Session {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            username: None,
            first_name: None,
            authenticated: false,
            authenticated_at: None,
            state: ConversationState::Idle,
            pending: BTreeMap::new(),
            version: 0,
        }
    }

    /// Drops any in-flight wizard progress and returns to idle.
    pub fn reset_conversation(&mut self) {
        self.state = ConversationState::Idle;
        self.pending.clear();
    }
}

/// Chat profile captured from the transport on successful authentication.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Profile {
    pub username: Option<String>,
    pub first_name: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    #[default]
    Idle,
    Authenticating,
    Searching,
    AddingPerson(AddPersonStep),
}

impl ConversationState {
    /// Storage discriminant for the `current_state` column. The wizard
    /// cursor travels separately inside `state_data`.
    pub fn storage_value(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Authenticating => "authenticating",
            Self::Searching => "searching",
            Self::AddingPerson(_) => "adding_person",
        }
    }

    pub fn from_storage(
        value: &str,
        step: Option<AddPersonStep>,
    ) -> Result<Self, SessionDecodeError> {
        match value {
            "idle" => Ok(Self::Idle),
            "authenticating" => Ok(Self::Authenticating),
            "searching" => Ok(Self::Searching),
            "adding_person" => Ok(Self::AddingPerson(step.unwrap_or(AddPersonStep::Name))),
            other => Err(SessionDecodeError::UnknownState(other.to_string())),
        }
    }

    pub fn wizard_step(&self) -> Option<AddPersonStep> {
        match self {
            Self::AddingPerson(step) => Some(*step),
            _ => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionDecodeError {
    #[error("unknown conversation state `{0}`")]
    UnknownState(String),
    #[error("malformed state data: {0}")]
    MalformedStateData(String),
}

/// Wizard cursor for the guided add-person flow. The order is fixed; the
/// wizard commits exactly once, after the final answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddPersonStep {
    Name,
    Email,
    Company,
    Categories,
    Status,
    Linkedin,
    Poc,
    WarmIntro,
    Notes,
}

impl AddPersonStep {
    pub const FIRST: AddPersonStep = AddPersonStep::Name;

    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Name => Some(Self::Email),
            Self::Email => Some(Self::Company),
            Self::Company => Some(Self::Categories),
            Self::Categories => Some(Self::Status),
            Self::Status => Some(Self::Linkedin),
            Self::Linkedin => Some(Self::Poc),
            Self::Poc => Some(Self::WarmIntro),
            Self::WarmIntro => Some(Self::Notes),
            Self::Notes => None,
        }
    }

    pub fn field(&self) -> PersonField {
        match self {
            Self::Name => PersonField::FullName,
            Self::Email => PersonField::Email,
            Self::Company => PersonField::Company,
            Self::Categories => PersonField::Categories,
            Self::Status => PersonField::Status,
            Self::Linkedin => PersonField::LinkedinProfile,
            Self::Poc => PersonField::Poc,
            Self::WarmIntro => PersonField::WarmIntro,
            Self::Notes => PersonField::Notes,
        }
    }

    pub fn prompt(&self) -> &'static str {
        match self {
            Self::Name => "What's the person's full name?",
            Self::Email => "Email address? (or `skip`)",
            Self::Company => "Company? (or `skip`)",
            Self::Categories => "Categories, comma separated? (or `skip`)",
            Self::Status => "Relationship status? (or `skip`)",
            Self::Linkedin => "LinkedIn profile URL? (or `skip`)",
            Self::Poc => "Point of contact? (or `skip`)",
            Self::WarmIntro => "Warm intro available? (or `skip`)",
            Self::Notes => "Any notes? (or `skip`)",
        }
    }
}

/// JSON payload persisted in the `state_data` column.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<AddPersonStep>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub pending: BTreeMap<String, String>,
}

impl StateData {
    pub fn from_session(session: &Session) -> Self {
        Self { step: session.state.wizard_step(), pending: session.pending.clone() }
    }

    pub fn encode(&self) -> String {
        // BTreeMap + skip-empty fields keep the column stable and diffable.
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn decode(raw: &str) -> Result<Self, SessionDecodeError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(raw)
            .map_err(|err| SessionDecodeError::MalformedStateData(err.to_string()))
    }
}
