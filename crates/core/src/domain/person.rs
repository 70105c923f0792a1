use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A contact record owned by the shared records store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: i64,
    pub full_name: String,
    pub email: Option<String>,
    pub company: Option<String>,
    pub categories: Option<String>,
    pub status: Option<String>,
    pub linkedin_profile: Option<String>,
    pub poc: Option<String>,
    pub warm_intro: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Person {
    /// One-line summary with enough detail to tell two candidates apart.
    pub fn summary_line(&self) -> String {
        let mut line = self.full_name.clone();
        if let Some(company) = self.company.as_deref().filter(|value| !value.is_empty()) {
            line.push_str(&format!(" ({company})"));
        }
        if let Some(email) = self.email.as_deref().filter(|value| !value.is_empty()) {
            line.push_str(&format!(" <{email}>"));
        }
        line
    }
}

/// Field set for a person record not yet inserted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PersonDraft {
    pub full_name: String,
    pub email: Option<String>,
    pub company: Option<String>,
    pub categories: Option<String>,
    pub status: Option<String>,
    pub linkedin_profile: Option<String>,
    pub poc: Option<String>,
    pub warm_intro: Option<String>,
    pub notes: Option<String>,
}

/// The writable person fields. Updates coming from free text are checked
/// against this allow-list before any store write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonField {
    FullName,
    Email,
    Company,
    Categories,
    Status,
    LinkedinProfile,
    Poc,
    WarmIntro,
    Notes,
}

impl PersonField {
    pub const ALL: [PersonField; 9] = [
        PersonField::FullName,
        PersonField::Email,
        PersonField::Company,
        PersonField::Categories,
        PersonField::Status,
        PersonField::LinkedinProfile,
        PersonField::Poc,
        PersonField::WarmIntro,
        PersonField::Notes,
    ];

    pub fn column_name(&self) -> &'static str {
        match self {
            Self::FullName => "full_name",
            Self::Email => "email",
            Self::Company => "company",
            Self::Categories => "categories",
            Self::Status => "status",
            Self::LinkedinProfile => "linkedin_profile",
            Self::Poc => "poc",
            Self::WarmIntro => "warm_intro",
            Self::Notes => "notes",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::FullName => "full name",
            Self::Email => "email",
            Self::Company => "company",
            Self::Categories => "categories",
            Self::Status => "status",
            Self::LinkedinProfile => "linkedin profile",
            Self::Poc => "point of contact",
            Self::WarmIntro => "warm intro",
            Self::Notes => "notes",
        }
    }

    /// Resolves a free-text field name to a known person field.
    /// Returns `None` for anything outside the allow-list.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "full_name" | "name" => Some(Self::FullName),
            "email" => Some(Self::Email),
            "company" => Some(Self::Company),
            "categories" | "category" => Some(Self::Categories),
            "status" => Some(Self::Status),
            "linkedin_profile" | "linkedin" => Some(Self::LinkedinProfile),
            "poc" | "point_of_contact" => Some(Self::Poc),
            "warm_intro" => Some(Self::WarmIntro),
            "notes" | "note" => Some(Self::Notes),
            _ => None,
        }
    }
}

/// Builds a draft from the wizard's accumulated answers, keyed by person
/// column name. Returns `None` when no full name was captured.
pub fn draft_from_pending(pending: &BTreeMap<String, String>) -> Option<PersonDraft> {
    let full_name = pending.get("full_name").map(|value| value.trim()).filter(|v| !v.is_empty())?;

    let field = |key: &str| pending.get(key).map(|value| value.trim().to_string());
    Some(PersonDraft {
        full_name: full_name.to_string(),
        email: field("email"),
        company: field("company"),
        categories: field("categories"),
        status: field("status"),
        linkedin_profile: field("linkedin_profile"),
        poc: field("poc"),
        warm_intro: field("warm_intro"),
        notes: field("notes"),
    })
}

/// Maps the `"Key: value"` lines of a bulk-add payload onto a draft.
/// Unknown keys are dropped, never stored. Returns `None` when no line
/// yields a full name, since a person record is meaningless without one.
pub fn draft_from_bulk_entries(entries: &[String]) -> Option<PersonDraft> {
    let mut draft = PersonDraft::default();
    let mut has_name = false;

    for entry in entries {
        let Some((raw_key, raw_value)) = entry.split_once(':') else {
            continue;
        };
        let value = raw_value.trim();
        if value.is_empty() {
            continue;
        }
        let Some(field) = PersonField::parse(raw_key) else {
            continue;
        };
        match field {
            PersonField::FullName => {
                draft.full_name = value.to_string();
                has_name = true;
            }
            PersonField::Email => draft.email = Some(value.to_string()),
            PersonField::Company => draft.company = Some(value.to_string()),
            PersonField::Categories => draft.categories = Some(value.to_string()),
            PersonField::Status => draft.status = Some(value.to_string()),
            PersonField::LinkedinProfile => draft.linkedin_profile = Some(value.to_string()),
            // Bulk payloads only carry the six aliased keys; the remaining
            // fields are wizard/update-only and fall through as unknown.
            PersonField::Poc | PersonField::WarmIntro | PersonField::Notes => {}
        }
    }

    has_name.then_some(draft)
}
