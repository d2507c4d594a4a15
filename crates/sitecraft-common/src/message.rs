use serde::{Deserialize, Serialize};

/// Sentinel content of the system marker recorded once a plan was proposed.
pub const PLANNING_PROPOSED: &str = "__ARCH_PROPOSED__";

/// Sentinel content of the system marker recorded once a plan was approved.
pub const PLANNING_APPROVED: &str = "__ARCH_APPROVED__";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::System => write!(f, "system"),
        }
    }
}

/// A single transcript entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, rename = "isError", skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            is_error: false,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            is_error: false,
        }
    }

    pub fn assistant_error(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            is_error: true,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            is_error: false,
        }
    }

    /// True for the planning sentinels, which are never shown to users.
    pub fn is_marker(&self) -> bool {
        self.role == Role::System
            && (self.content == PLANNING_PROPOSED || self.content == PLANNING_APPROVED)
    }
}

/// Append-only conversation history.
///
/// Marker messages are never removed once appended; the only removal is
/// [`Transcript::discard_last_user`], used when a turn is aborted before the
/// assistant answered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Messages a user should see: everything except planning markers.
    pub fn visible(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| !m.is_marker())
    }

    pub fn has_marker(&self, marker: &str) -> bool {
        self.messages
            .iter()
            .any(|m| m.role == Role::System && m.content == marker)
    }

    /// Drop the trailing user message, if the transcript ends with one.
    pub fn discard_last_user(&mut self) -> Option<Message> {
        match self.messages.last() {
            Some(m) if m.role == Role::User => self.messages.pop(),
            _ => None,
        }
    }
}
