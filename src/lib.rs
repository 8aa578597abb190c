//! Run agent turns against a local `codex exec` process or a remote
//! `responses` endpoint and observe both through one typed event stream.
//!
//! # Overview
//! - [`CodexBridge`] owns the history store and both transports, and picks one
//!   per turn with [`select_transport`].
//! - [`Thread`] runs successive turns that share a thread id, either streamed
//!   ([`Thread::run_streamed`]) or collected ([`Thread::run`]).
//! - Events use the exec JSON vocabulary ([`ThreadEvent`]) on both paths.
//!
//! # Failure reporting
//! Process-path failures are raised as stream errors. HTTP-path failures end
//! the stream with a `turn.failed` event, except cancellation and an unusable
//! output schema, which are raised. [`Thread::run`] maps `turn.failed` to
//! [`TurnError::TurnFailed`], so callers of `run` only check the `Result`.

pub mod config;
pub mod engine;
pub mod thread;

pub use crate::config::BridgeOptions;
pub use crate::engine::{select_transport, CodexBridge};
pub use crate::thread::{Input, StreamedTurn, Thread, Turn, TurnOptions, UserInput};

pub use agent_provider::{
    ApprovalMode, CancelSignal, ConversationMessage, EventStream, ModelReasoningEffort, Role,
    SandboxMode, ThreadError, ThreadEvent, ThreadItem, ThreadItemDetails, ThreadOptions,
    TransportKind, TurnArguments, TurnError, TurnTransport, Usage,
};
pub use session_store::{HistoryPolicy, HistoryStore};
