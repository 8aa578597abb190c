
use codex_bridge::{
    BridgeOptions, CodexBridge, ConversationMessage, HistoryPolicy, ThreadEvent,
    ThreadItemDetails, ThreadOptions, TurnError, TurnOptions, Usage,
};
use futures_util::StreamExt;
use mock_server::{MockResponses, Reply};
use pretty_assertions::assert_eq;
use serde_json::json;

fn hi_reply() -> Reply {
    Reply::Sse(vec![
        json!({"type": "response.created"}),
        json!({"type": "response.output_item.done", "item": {
            "type": "message",
            "content": [{"type": "output_text", "text": "Hi!"}]
        }}),
        json!({"type": "response.completed", "response": {"usage": {
            "input_tokens": 42,
            "output_tokens": 5,
            "cached_tokens": 12
        }}}),
    ])
}

fn bridge_for(server: &MockResponses) -> CodexBridge {
    CodexBridge::new(
        BridgeOptions::default()
            .with_base_url(&server.base_url)
            .with_api_key("test-key"),
    )
}

#[tokio::test]
async fn run_returns_items_and_usage() {
    let server = MockResponses::start(vec![hi_reply()]).await;
    let bridge = bridge_for(&server);
    let thread = bridge.start_thread(ThreadOptions::default());

    let turn = thread
        .run("Hello, world!", TurnOptions::default())
        .await
        .expect("turn should complete");

    assert_eq!(turn.items.len(), 1);
    assert_eq!(
        turn.items[0].details,
        ThreadItemDetails::AgentMessage {
            text: "Hi!".to_string(),
        }
    );
    assert_eq!(turn.final_response, "Hi!");
    assert_eq!(
        turn.usage,
        Some(Usage {
            input_tokens: 42,
            cached_input_tokens: 12,
            output_tokens: 5,
        })
    );

    let thread_id = thread.id().expect("thread id assigned by first turn");
    assert_eq!(
        bridge.history().get(&thread_id),
        vec![
            ConversationMessage::user("Hello, world!"),
            ConversationMessage::assistant("Hi!"),
        ]
    );
}

#[tokio::test]
async fn second_turn_replays_previous_assistant_message() {
    let server = MockResponses::start(vec![hi_reply(), hi_reply()]).await;
    let bridge = bridge_for(&server);
    let thread = bridge.start_thread(ThreadOptions::default());

    thread
        .run("Hello, world!", TurnOptions::default())
        .await
        .expect("first turn");
    let first_id = thread.id();
    thread
        .run("What did you say?", TurnOptions::default())
        .await
        .expect("second turn");
    assert_eq!(thread.id(), first_id);

    let bodies = server.bodies();
    assert_eq!(
        bodies[1]["input"][1],
        json!({"role": "assistant", "content": [{"type": "output_text", "text": "Hi!"}]})
    );
    assert_eq!(
        bodies[1]["input"][2]["content"][0]["text"],
        json!("What did you say?")
    );
}

#[tokio::test]
async fn streamed_turn_reports_progress_and_incomplete_stream() {
    let server = MockResponses::start(vec![Reply::Sse(vec![json!({
        "type": "response.output_item.done",
        "item": {"type": "message", "content": [{"type": "output_text", "text": "Hi"}]}
    })])])
    .await;
    let bridge = bridge_for(&server);
    let thread = bridge.start_thread(ThreadOptions::default());

    let streamed = thread.run_streamed("Hello", TurnOptions::default());
    let events: Vec<ThreadEvent> = streamed
        .events
        .map(|event| event.expect("http failures arrive as events"))
        .collect()
        .await;

    let kinds: Vec<&str> = events
        .iter()
        .map(|event| match event {
            ThreadEvent::ThreadStarted { .. } => "thread.started",
            ThreadEvent::TurnStarted {} => "turn.started",
            ThreadEvent::ItemStarted { .. } => "item.started",
            ThreadEvent::ItemCompleted { .. } => "item.completed",
            ThreadEvent::TurnFailed { .. } => "turn.failed",
            _ => "other",
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            "thread.started",
            "turn.started",
            "item.started",
            "item.completed",
            "turn.failed"
        ]
    );
    let Some(ThreadEvent::TurnFailed { error }) = events.last() else {
        panic!("expected turn.failed");
    };
    assert!(error.message.contains("stream disconnected before completion"));
    assert!(bridge.history().thread_ids().is_empty());
}

#[tokio::test]
async fn run_surfaces_turn_failed_as_error() {
    let server = MockResponses::start(vec![Reply::Status(
        401,
        r#"{"error":{"message":"bad key"}}"#.to_string(),
    )])
    .await;
    let bridge = bridge_for(&server);
    let thread = bridge.start_thread(ThreadOptions::default());

    let error = thread
        .run("Hello", TurnOptions::default())
        .await
        .expect_err("status failure");
    assert!(matches!(error, TurnError::TurnFailed(ref message) if message == "HTTP 401: bad key"));
    assert!(thread.id().is_some());
}

#[tokio::test]
async fn output_schema_is_sent_as_strict_format() {
    let server = MockResponses::start(vec![hi_reply()]).await;
    let bridge = bridge_for(&server);
    let thread = bridge.start_thread(ThreadOptions::default().with_model("gpt-test"));
    let schema = json!({
        "type": "object",
        "properties": {"summary": {"type": "string"}},
        "required": ["summary"],
        "additionalProperties": false
    });

    thread
        .run(
            "Summarize",
            TurnOptions::default().with_output_schema(schema.clone()),
        )
        .await
        .expect("turn should complete");

    let body = &server.bodies()[0];
    assert_eq!(body["model"], json!("gpt-test"));
    assert_eq!(
        body["text"]["format"],
        json!({
            "type": "json_schema",
            "name": "codex_output_schema",
            "schema": schema,
            "strict": true
        })
    );
}

#[tokio::test]
async fn bounded_policy_trims_committed_history() {
    let server = MockResponses::start(vec![hi_reply(), hi_reply()]).await;
    let bridge = CodexBridge::new(
        BridgeOptions::default()
            .with_base_url(&server.base_url)
            .with_history_policy(HistoryPolicy::bounded(3)),
    );
    let thread = bridge.resume_thread("bounded", ThreadOptions::default());

    thread.run("one", TurnOptions::default()).await.expect("first turn");
    thread.run("two", TurnOptions::default()).await.expect("second turn");

    assert_eq!(
        bridge.history().get("bounded"),
        vec![
            ConversationMessage::assistant("Hi!"),
            ConversationMessage::user("two"),
            ConversationMessage::assistant("Hi!"),
        ]
    );
}

#[tokio::test]
async fn pre_cancelled_turn_is_raised_without_a_request() {
    let server = MockResponses::start(vec![hi_reply()]).await;
    let bridge = bridge_for(&server);
    let thread = bridge.start_thread(ThreadOptions::default());
    let options = TurnOptions::default();
    options.cancel.cancel_with_reason("caller gave up");

    let error = thread
        .run("Hello", options)
        .await
        .expect_err("cancelled turn");
    assert!(matches!(error, TurnError::Cancelled(ref reason) if reason == "caller gave up"));
    assert!(server.bodies().is_empty());
    assert!(thread.id().is_none());
}
