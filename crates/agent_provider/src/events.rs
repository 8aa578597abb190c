use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Top-level events emitted on a thread's turn stream.
///
/// This is the wire vocabulary of `codex exec --experimental-json`; the HTTP
/// transport synthesizes the same shapes so consumers never need to know which
/// transport served a turn. Events of a type this crate does not model, or
/// whose body does not fit the modeled shape, are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ThreadEvent {
    #[serde(rename = "thread.started")]
    ThreadStarted { thread_id: String },
    #[serde(rename = "turn.started")]
    TurnStarted {},
    #[serde(rename = "item.started")]
    ItemStarted { item: ThreadItem },
    #[serde(rename = "item.updated")]
    ItemUpdated { item: ThreadItem },
    #[serde(rename = "item.completed")]
    ItemCompleted { item: ThreadItem },
    #[serde(rename = "turn.completed")]
    TurnCompleted { usage: Usage },
    #[serde(rename = "turn.failed")]
    TurnFailed { error: ThreadError },
    /// Fatal stream error reported by the exec process outside of a turn.
    #[serde(rename = "error")]
    Error { message: String },
    #[serde(untagged)]
    Other(Value),
}

impl ThreadEvent {
    #[must_use]
    pub fn turn_failed(message: impl Into<String>) -> Self {
        Self::TurnFailed {
            error: ThreadError {
                message: message.into(),
            },
        }
    }

    /// Returns true when no further events are expected for the turn.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::TurnCompleted { .. } | Self::TurnFailed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadError {
    pub message: String,
}

/// Token accounting for a completed turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub cached_input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

/// One unit of produced content within a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadItem {
    pub id: String,
    #[serde(flatten)]
    pub details: ThreadItemDetails,
}

impl ThreadItem {
    #[must_use]
    pub fn agent_message(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            details: ThreadItemDetails::AgentMessage { text: text.into() },
        }
    }

    /// Returns the assistant text when this item is an agent message.
    #[must_use]
    pub fn agent_text(&self) -> Option<&str> {
        match &self.details {
            ThreadItemDetails::AgentMessage { text } => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ThreadItemDetails {
    AgentMessage {
        text: String,
    },
    Reasoning {
        text: String,
    },
    CommandExecution {
        command: String,
        #[serde(default)]
        aggregated_output: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
        #[serde(default)]
        status: ItemStatus,
    },
    FileChange {
        changes: Vec<FileUpdateChange>,
        #[serde(default)]
        status: ItemStatus,
    },
    McpToolCall {
        server: String,
        tool: String,
        #[serde(default)]
        status: ItemStatus,
    },
    WebSearch {
        query: String,
    },
    TodoList {
        items: Vec<TodoItem>,
    },
    Error {
        message: String,
    },
    /// Any other item shape, including its `type` field.
    #[serde(untagged)]
    Other(Map<String, Value>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    #[default]
    InProgress,
    Completed,
    Failed,
    #[serde(untagged)]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileUpdateChange {
    pub path: String,
    pub kind: PatchChangeKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchChangeKind {
    Add,
    Delete,
    Update,
    #[serde(untagged)]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub text: String,
    pub completed: bool,
}
