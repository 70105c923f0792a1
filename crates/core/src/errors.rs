use thiserror::Error;

/// Failure taxonomy for one inbound message. Every variant is caught at the
/// engine boundary and converted into exactly one outbound reply; none of
/// them may leave a partial mutation behind.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("missing required parameter `{field}`")]
    Validation { field: String },
    #[error("identifier matched {} records", .candidates.len())]
    AmbiguousEntity { candidates: Vec<String> },
    #[error("{what} not found")]
    NotFound { what: String },
    #[error("authentication required")]
    AuthRequired,
    #[error("a previous message for this user is still being processed")]
    Busy,
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl CommandError {
    /// The single user-visible reply for this failure.
    pub fn reply_text(&self) -> String {
        match self {
            Self::Transport(_) => {
                "Something went wrong talking to a backing service. Please try again.".to_string()
            }
            Self::Validation { field } => {
                format!("I need a value for `{field}` to do that.")
            }
            Self::AmbiguousEntity { candidates } => {
                let mut reply =
                    String::from("I found more than one matching contact, so I didn't change anything:\n");
                for (index, candidate) in candidates.iter().enumerate() {
                    reply.push_str(&format!("{}. {candidate}\n", index + 1));
                }
                reply.push_str("Please resend with a more specific name or email.");
                reply
            }
            Self::NotFound { what } => format!("I couldn't find {what}."),
            Self::AuthRequired => {
                "Please authenticate first: send /start and enter the passphrase.".to_string()
            }
            Self::Busy => {
                "I'm still working on your previous message. Give it a moment and try again."
                    .to_string()
            }
            Self::Persistence(_) => {
                "I couldn't save that right now. Please try again.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CommandError;

    #[test]
    fn validation_reply_names_the_missing_field() {
        let reply = CommandError::Validation { field: "text".to_string() }.reply_text();
        assert!(reply.contains("`text`"));
    }

    #[test]
    fn ambiguous_reply_lists_every_candidate() {
        let error = CommandError::AmbiguousEntity {
            candidates: vec![
                "Jane Doe (Acme) — jane@acme.com".to_string(),
                "Jane Smith — jane@smith.dev".to_string(),
            ],
        };

        let reply = error.reply_text();
        assert!(reply.contains("1. Jane Doe"));
        assert!(reply.contains("2. Jane Smith"));
        assert!(reply.contains("more specific"));
    }

    #[test]
    fn persistence_reply_does_not_leak_internals() {
        let reply =
            CommandError::Persistence("UNIQUE constraint failed: people.id".to_string())
                .reply_text();
        assert!(!reply.contains("UNIQUE"));
    }
}
