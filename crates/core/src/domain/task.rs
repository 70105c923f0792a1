use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub text: String,
    pub assignee: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub label: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskDraft {
    pub text: String,
    pub assignee: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub label: Option<String>,
}

impl TaskDraft {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            assignee: None,
            due_date: None,
            status: TaskStatus::default(),
            priority: TaskPriority::default(),
            label: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in progress",
            Self::Done => "done",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "pending" | "todo" | "open" => Some(Self::Pending),
            "in_progress" | "doing" | "started" => Some(Self::InProgress),
            "done" | "completed" | "closed" => Some(Self::Done),
            _ => None,
        }
    }

    pub fn storage_value(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" | "normal" => Some(Self::Medium),
            "high" | "urgent" => Some(Self::High),
            _ => None,
        }
    }

    pub fn storage_value(&self) -> &'static str {
        self.label()
    }
}

/// The task fields an update action may touch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskField {
    Text,
    AssignTo,
    DueDate,
    Status,
    Label,
    Priority,
}

impl TaskField {
    pub fn column_name(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::AssignTo => "assignee",
            Self::DueDate => "due_date",
            Self::Status => "status",
            Self::Label => "label",
            Self::Priority => "priority",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::AssignTo => "assignee",
            Self::DueDate => "due date",
            Self::Status => "status",
            Self::Label => "label",
            Self::Priority => "priority",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "text" => Some(Self::Text),
            "assign_to" | "assignee" => Some(Self::AssignTo),
            "due_date" => Some(Self::DueDate),
            "status" => Some(Self::Status),
            "label" => Some(Self::Label),
            "priority" => Some(Self::Priority),
            _ => None,
        }
    }
}

/// Parses the date spellings accepted at the chat boundary: a bare
/// `YYYY-MM-DD` (midnight UTC) or a full RFC3339 timestamp.
pub fn parse_user_date(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }
    chrono::NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Reporting window for task listings, resolved against a supplied "now"
/// so listings are deterministic under test.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListPeriod {
    Daily,
    Weekly,
    Monthly,
    #[default]
    All,
}

impl ListPeriod {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "daily" | "today" => Some(Self::Daily),
            "weekly" | "week" => Some(Self::Weekly),
            "monthly" | "month" => Some(Self::Monthly),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    /// Upper bound on `due_date` for this window, or `None` for unbounded.
    pub fn due_before(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Daily => Some(now + Duration::days(1)),
            Self::Weekly => Some(now + Duration::days(7)),
            Self::Monthly => Some(now + Duration::days(31)),
            Self::All => None,
        }
    }
}
