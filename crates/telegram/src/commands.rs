use serde::Serialize;

/// Prefix that runs a search directly from idle without the classifier.
pub const QUICK_SEARCH_PREFIX: char = '?';

/// The slash commands the bot understands. Everything else is state-driven
/// free text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlashCommand {
    Start,
    Help,
    Search,
    Add,
    Cancel,
}

impl SlashCommand {
    /// Parses a leading slash command, tolerating the `@botname` suffix
    /// used when addressing the bot inside a group chat.
    pub fn parse(text: &str) -> Option<Self> {
        let first_token = text.trim().split_whitespace().next()?;
        let command = first_token.strip_prefix('/')?;
        let bare = command.split('@').next().unwrap_or(command);

        match bare.to_ascii_lowercase().as_str() {
            "start" => Some(Self::Start),
            "help" => Some(Self::Help),
            "search" => Some(Self::Search),
            "add" => Some(Self::Add),
            "cancel" => Some(Self::Cancel),
            _ => None,
        }
    }
}

/// Entry for the platform-visible command menu.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CommandSpec {
    pub command: &'static str,
    pub description: &'static str,
}

/// The five commands registered with the platform on successful start.
pub fn command_menu() -> [CommandSpec; 5] {
    [
        CommandSpec { command: "start", description: "Start the bot and sign in" },
        CommandSpec { command: "search", description: "Search your contacts" },
        CommandSpec { command: "add", description: "Add a contact step by step" },
        CommandSpec { command: "help", description: "Show what the bot can do" },
        CommandSpec { command: "cancel", description: "Abort the current flow" },
    ]
}

/// Extracts the query from a quick-search message (`?fintech investors`).
/// Returns `Some("")` when the prefix is present with nothing behind it so
/// the caller can prompt for a query instead of searching for nothing.
pub fn quick_search_query(text: &str) -> Option<&str> {
    text.trim().strip_prefix(QUICK_SEARCH_PREFIX).map(str::trim)
}
