//! `responses`-backed implementation of the shared `agent_provider` contract.
//!
//! This adapter replays a thread's stored history into each request and
//! translates the upstream SSE stream into the same `ThreadEvent` vocabulary
//! the exec transport produces natively. Upstream and network failures end the
//! stream with `turn.failed`; only cancellation and an unusable output schema
//! are raised as errors.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use agent_provider::{
    config_overrides, overrides_to_json, ConversationMessage, EventStream, Role, ThreadEvent,
    ThreadItem, TransportKind, TurnArguments, TurnError, TurnTransport, Usage,
};
use async_stream::try_stream;
use codex_api::{
    CodexApiClient, CodexApiConfig, CodexApiError, InputEntry, ResponseUsage, ResponsesEvent,
    ResponsesRequest,
};
use futures_core::Stream;
use serde_json::Value;
use session_store::HistoryStore;

/// Message reported when the upstream stream closes without a terminal event.
pub const INCOMPLETE_STREAM_MESSAGE: &str = "stream closed before response.completed";

/// `TurnTransport` that runs each turn as one streaming `responses` request.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    history: Arc<HistoryStore>,
    timeout: Option<Duration>,
    headers: BTreeMap<String, String>,
}

impl HttpTransport {
    #[must_use]
    pub fn new(history: Arc<HistoryStore>) -> Self {
        Self {
            history,
            timeout: None,
            headers: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.history
    }

    fn client_for(&self, args: &TurnArguments) -> Result<CodexApiClient, TurnError> {
        let base_url = args
            .remote_endpoint()
            .ok_or_else(|| TurnError::Transport("no base URL configured".to_string()))?;

        let mut config = CodexApiConfig::new(base_url).with_headers(self.headers.clone());
        if let Some(api_key) = &args.api_key {
            config = config.with_api_key(api_key);
        }
        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }

        CodexApiClient::new(config).map_err(|error| TurnError::Transport(error.to_string()))
    }
}

impl TurnTransport for HttpTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Http
    }

    fn run_turn(&self, args: TurnArguments) -> EventStream {
        Box::pin(http_turn(self.clone(), args))
    }
}

fn http_turn(
    transport: HttpTransport,
    args: TurnArguments,
) -> impl Stream<Item = Result<ThreadEvent, TurnError>> + Send {
    try_stream! {
        ensure_not_cancelled(&args)?;
        let schema = match &args.output_schema_file {
            Some(path) => Some(load_output_schema(path).await?),
            None => None,
        };

        let thread_id = args
            .thread_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let mut pending = transport.history.get(&thread_id);
        pending.push(ConversationMessage::user(args.input.clone()));
        let request = build_request(&args, &pending, schema);

        yield ThreadEvent::ThreadStarted {
            thread_id: thread_id.clone(),
        };
        yield ThreadEvent::TurnStarted {};

        let client = match transport.client_for(&args) {
            Ok(client) => client,
            Err(error) => {
                yield ThreadEvent::turn_failed(error.to_string());
                return;
            }
        };
        tracing::debug!(
            %thread_id,
            endpoint = client.endpoint(),
            replayed = pending.len() - 1,
            "starting remote turn"
        );

        let token = args.cancel.token().clone();
        let mut events = match client.open_stream(&request, Some(&token)).await {
            Ok(events) => events,
            Err(error) => {
                let message = reportable(turn_error(error, &args))?;
                yield ThreadEvent::turn_failed(message);
                return;
            }
        };

        let mut next_item = 0_usize;
        loop {
            let event = match events.next_event(Some(&token)).await {
                Ok(Some(event)) => event,
                Ok(None) => {
                    tracing::warn!(%thread_id, "responses stream ended without a terminal event");
                    let error = TurnError::StreamDisconnected(INCOMPLETE_STREAM_MESSAGE.to_string());
                    yield ThreadEvent::turn_failed(error.to_string());
                    return;
                }
                Err(error) => {
                    let message = reportable(turn_error(error, &args))?;
                    yield ThreadEvent::turn_failed(message);
                    return;
                }
            };

            match event {
                ResponsesEvent::OutputItemDone { item } if item.is_message() => {
                    let thread_item = ThreadItem::agent_message(format!("item_{next_item}"), item.text.clone());
                    next_item += 1;
                    pending.push(ConversationMessage::assistant(item.text));
                    if args.emit_item_progress {
                        yield ThreadEvent::ItemStarted {
                            item: thread_item.clone(),
                        };
                    }
                    yield ThreadEvent::ItemCompleted { item: thread_item };
                }
                ResponsesEvent::Completed { usage } => {
                    transport.history.commit(&thread_id, pending);
                    yield ThreadEvent::TurnCompleted {
                        usage: usage_from(usage),
                    };
                    return;
                }
                ResponsesEvent::Failed { message } => {
                    yield ThreadEvent::turn_failed(message.unwrap_or_else(|| "response failed".to_string()));
                    return;
                }
                ResponsesEvent::Error { code, message } => {
                    yield ThreadEvent::turn_failed(upstream_error_message(code, message));
                    return;
                }
                ResponsesEvent::OutputItemDone { item } => {
                    tracing::trace!(item_type = %item.item_type, "ignoring non-message output item");
                }
                ResponsesEvent::OutputTextDelta { .. } | ResponsesEvent::Unknown { .. } => {}
            }
        }
    }
}

/// Request body for one turn: replayed history with the new user message last.
pub fn build_request(
    args: &TurnArguments,
    messages: &[ConversationMessage],
    output_schema: Option<Value>,
) -> ResponsesRequest {
    let input = messages
        .iter()
        .map(|message| match message.role {
            Role::User => InputEntry::user(message.text.clone()),
            Role::Assistant => InputEntry::assistant(message.text.clone()),
        })
        .collect();

    let mut request = ResponsesRequest::new(input);
    if let Some(model) = &args.options.model {
        request = request.with_model(model);
    }
    if let Some(schema) = output_schema {
        request = request.with_output_schema(schema);
    }
    request.images = args
        .images
        .iter()
        .map(|path| path.display().to_string())
        .collect();

    let mut config = overrides_to_json(&config_overrides(&args.options));
    if let Some(mode) = args.options.sandbox_mode {
        config.insert("sandbox_mode".to_string(), Value::from(mode.as_str()));
    }
    request.config = config;
    request
}

/// Reads and parses the output schema file; the schema must be a JSON object.
pub async fn load_output_schema(path: &Path) -> Result<Value, TurnError> {
    let schema_error = |message: String| TurnError::OutputSchema {
        path: path.to_path_buf(),
        message,
    };

    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|error| schema_error(error.to_string()))?;
    let schema: Value = serde_json::from_str(&raw).map_err(|error| schema_error(error.to_string()))?;
    if !schema.is_object() {
        return Err(schema_error("schema must be a JSON object".to_string()));
    }
    Ok(schema)
}

fn ensure_not_cancelled(args: &TurnArguments) -> Result<(), TurnError> {
    if args.cancel.is_cancelled() {
        return Err(TurnError::Cancelled(args.cancel.reason()));
    }
    Ok(())
}

/// Message for a `turn.failed` event; cancellation is passed back to be raised.
fn reportable(error: TurnError) -> Result<String, TurnError> {
    if error.is_cancelled() {
        return Err(error);
    }
    Ok(error.to_string())
}

fn turn_error(error: CodexApiError, args: &TurnArguments) -> TurnError {
    match error {
        CodexApiError::Cancelled => TurnError::Cancelled(args.cancel.reason()),
        CodexApiError::Status(status, message) => TurnError::HttpStatus {
            status: status.as_u16(),
            message,
        },
        CodexApiError::MissingBody => TurnError::MissingResponseBody,
        CodexApiError::Request(error) => TurnError::StreamDisconnected(error.to_string()),
        other => TurnError::Transport(other.to_string()),
    }
}

fn upstream_error_message(code: Option<String>, message: Option<String>) -> String {
    match (code, message) {
        (_, Some(message)) => message,
        (Some(code), None) => format!("upstream error: {code}"),
        (None, None) => "upstream error".to_string(),
    }
}

fn usage_from(usage: ResponseUsage) -> Usage {
    Usage {
        input_tokens: usage.input_tokens,
        cached_input_tokens: usage.cached_input_tokens,
        output_tokens: usage.output_tokens,
    }
}
