//! Thread-level API: multi-turn conversations over one engine.

use std::io::Write as _;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use agent_provider::{
    CancelSignal, EventStream, ThreadEvent, ThreadItem, ThreadOptions, TurnArguments, TurnError,
    Usage,
};
use async_stream::try_stream;
use futures_util::StreamExt;
use serde_json::Value;
use tempfile::NamedTempFile;

use crate::engine::CodexBridge;

/// One piece of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInput {
    Text(String),
    LocalImage { path: PathBuf },
}

/// Input for a turn: plain text or a list of text and image parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Text(String),
    Items(Vec<UserInput>),
}

impl Input {
    /// Prompt text with parts separated by a blank line, and the image paths in order.
    #[must_use]
    pub fn into_parts(self) -> (String, Vec<PathBuf>) {
        match self {
            Self::Text(text) => (text, Vec::new()),
            Self::Items(items) => {
                let mut texts = Vec::new();
                let mut images = Vec::new();
                for item in items {
                    match item {
                        UserInput::Text(text) => texts.push(text),
                        UserInput::LocalImage { path } => images.push(path),
                    }
                }
                (texts.join("\n\n"), images)
            }
        }
    }
}

impl From<&str> for Input {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Input {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<UserInput>> for Input {
    fn from(items: Vec<UserInput>) -> Self {
        Self::Items(items)
    }
}

/// Per-turn options.
#[derive(Debug, Clone, Default)]
pub struct TurnOptions {
    /// JSON schema the final response must conform to.
    pub output_schema: Option<Value>,
    pub cancel: CancelSignal,
}

impl TurnOptions {
    #[must_use]
    pub fn with_output_schema(mut self, schema: Value) -> Self {
        self.output_schema = Some(schema);
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Outcome of a turn run to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Turn {
    pub items: Vec<ThreadItem>,
    /// Text of the last agent message, empty when there was none.
    pub final_response: String,
    pub usage: Option<Usage>,
}

/// A turn whose events are consumed as they arrive.
pub struct StreamedTurn {
    pub events: EventStream,
}

/// A conversation whose turns share one thread id.
#[derive(Debug, Clone)]
pub struct Thread {
    bridge: CodexBridge,
    id: Arc<Mutex<Option<String>>>,
    options: ThreadOptions,
}

impl Thread {
    pub(crate) fn new(bridge: CodexBridge, id: Option<String>, options: ThreadOptions) -> Self {
        Self {
            bridge,
            id: Arc::new(Mutex::new(id)),
            options,
        }
    }

    /// Thread id; `None` until the first turn reports `thread.started`.
    pub fn id(&self) -> Option<String> {
        lock_unpoisoned(&self.id).clone()
    }

    pub fn options(&self) -> &ThreadOptions {
        &self.options
    }

    pub fn bridge(&self) -> &CodexBridge {
        &self.bridge
    }

    /// Starts a turn with item progress enabled; nothing runs until `events` is polled.
    pub fn run_streamed(&self, input: impl Into<Input>, options: TurnOptions) -> StreamedTurn {
        let (text, images) = input.into().into_parts();
        let mut args = TurnArguments::new(text);
        args.thread_id = self.id();
        args.options = self.options.clone();
        args.images = images;
        args.emit_item_progress = true;
        args.cancel = options.cancel;

        let bridge = self.bridge.clone();
        let id = Arc::clone(&self.id);
        let output_schema = options.output_schema;

        let events = try_stream! {
            // Held until the stream is dropped so the transport can read it throughout.
            let schema_file = match output_schema {
                Some(schema) => Some(write_schema_file(&schema)?),
                None => None,
            };
            args.output_schema_file = schema_file.as_ref().map(|file| file.path().to_path_buf());

            let mut inner = bridge.run_turn(args);
            while let Some(item) = inner.next().await {
                let event = item?;
                if let ThreadEvent::ThreadStarted { thread_id } = &event {
                    *lock_unpoisoned(&id) = Some(thread_id.clone());
                }
                yield event;
            }
            drop(schema_file);
        };

        StreamedTurn {
            events: Box::pin(events),
        }
    }

    /// Runs a turn to completion, collecting its completed items.
    ///
    /// A `turn.failed` event is returned as [`TurnError::TurnFailed`], so both
    /// transports report failure the same way here.
    pub async fn run(&self, input: impl Into<Input>, options: TurnOptions) -> Result<Turn, TurnError> {
        let mut events = self.run_streamed(input, options).events;
        let mut turn = Turn::default();

        while let Some(event) = events.next().await {
            match event? {
                ThreadEvent::ItemCompleted { item } => {
                    if let Some(text) = item.agent_text() {
                        turn.final_response = text.to_string();
                    }
                    turn.items.push(item);
                }
                ThreadEvent::TurnCompleted { usage } => turn.usage = Some(usage),
                ThreadEvent::TurnFailed { error } => return Err(TurnError::TurnFailed(error.message)),
                _ => {}
            }
        }

        Ok(turn)
    }
}

fn write_schema_file(schema: &Value) -> Result<NamedTempFile, TurnError> {
    let mut file = tempfile::Builder::new()
        .prefix("codex-output-schema-")
        .suffix(".json")
        .tempfile()
        .map_err(|error| TurnError::io("creating output schema file", error))?;
    let path = file.path().to_path_buf();
    let schema_error = |message: String| TurnError::OutputSchema {
        path: path.clone(),
        message,
    };

    let contents = serde_json::to_vec(schema).map_err(|error| schema_error(error.to_string()))?;
    file.write_all(&contents)
        .and_then(|()| file.flush())
        .map_err(|error| schema_error(error.to_string()))?;
    Ok(file)
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn item_input_joins_text_and_collects_images() {
        let input = Input::from(vec![
            UserInput::Text("Describe these".to_string()),
            UserInput::LocalImage {
                path: PathBuf::from("/tmp/one.png"),
            },
            UserInput::Text("briefly".to_string()),
            UserInput::LocalImage {
                path: PathBuf::from("/tmp/two.png"),
            },
        ]);

        assert_eq!(
            input.into_parts(),
            (
                "Describe these\n\nbriefly".to_string(),
                vec![PathBuf::from("/tmp/one.png"), PathBuf::from("/tmp/two.png")]
            )
        );
    }

    #[test]
    fn schema_file_holds_the_serialized_schema() {
        let schema = json!({"type": "object", "required": ["answer"]});
        let file = write_schema_file(&schema).expect("schema file");

        let written: Value = serde_json::from_str(
            &std::fs::read_to_string(file.path()).expect("read schema file"),
        )
        .expect("valid json");
        assert_eq!(written, schema);
    }
}
