//! Transport-neutral contract for executing a single turn of a thread.
//!
//! This crate defines the normalized event vocabulary, the turn input record,
//! the failure taxonomy, and the capability trait both transports implement.
//! It excludes transport details (process plumbing, HTTP payloads, SSE framing).

use std::fmt;
use std::pin::Pin;

use futures_core::Stream;
use serde::{Deserialize, Serialize};

mod cancel;
mod error;
mod events;
mod options;

pub use cancel::{CancelSignal, DEFAULT_CANCEL_REASON};
pub use error::TurnError;
pub use events::{
    FileUpdateChange, ItemStatus, PatchChangeKind, ThreadError, ThreadEvent, ThreadItem,
    ThreadItemDetails, TodoItem, Usage,
};
pub use options::{
    config_overrides, overrides_to_json, ApprovalMode, ConfigOverride, ModelReasoningEffort,
    SandboxMode, ThreadOptions, TurnArguments,
};

/// Lazy, single-consumer sequence of events for one turn.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<ThreadEvent, TurnError>> + Send>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One exchanged message in a thread's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: Role,
    pub text: String,
}

impl ConversationMessage {
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// Which mechanism executes a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Process,
    Http,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Process => f.write_str("process"),
            Self::Http => f.write_str("http"),
        }
    }
}

/// Capability shared by both transports: turn arguments in, event stream out.
///
/// Implementations must not do any work before the returned stream is polled.
pub trait TurnTransport: Send + Sync + 'static {
    fn kind(&self) -> TransportKind;

    fn run_turn(&self, args: TurnArguments) -> EventStream;
}
