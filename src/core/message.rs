/// Separator used when a resource link is folded into a stored assistant turn.
pub const URL_SEPARATOR: &str = "| url: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TurnRole {
    User,
    Assistant,
}

impl TurnRole {
    /// Role name as the chat completion API spells it.
    pub fn as_str(self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
        }
    }
}

/// One entry of the conversation. Fields are private so a turn cannot be
/// edited after it has been recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    role: TurnRole,
    content: String,
    resource_url: Option<String>,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
            resource_url: None,
        }
    }

    /// Build an assistant turn. When a URL is present it is appended to the
    /// stored content as `"<message>| url: <url>"`, which is what gets sent
    /// back to the model on later turns.
    pub fn assistant(message: &str, resource_url: Option<&str>) -> Self {
        let content = match resource_url {
            Some(url) => format!("{message}{URL_SEPARATOR}{url}"),
            None => message.to_string(),
        };
        Self {
            role: TurnRole::Assistant,
            content,
            resource_url: resource_url.map(str::to_string),
        }
    }

    pub fn role(&self) -> TurnRole {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn resource_url(&self) -> Option<&str> {
        self.resource_url.as_deref()
    }
}

/// Chronological, append-only record of one session's exchanges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationHistory {
    turns: Vec<Turn>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user_message(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::user(content));
    }

    pub fn add_assistant_message(&mut self, message: &str, resource_url: Option<&str>) {
        self.turns.push(Turn::assistant(message, resource_url));
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
