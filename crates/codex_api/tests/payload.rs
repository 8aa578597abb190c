use codex_api::payload::OUTPUT_SCHEMA_NAME;
use codex_api::{InputEntry, ResponsesRequest};
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn minimal_request_shape() {
    let request = ResponsesRequest::new(vec![InputEntry::user("Hello")]);
    let body = serde_json::to_value(&request).expect("serialize payload");

    assert_eq!(
        body,
        json!({
            "input": [
                {"role": "user", "content": [{"type": "input_text", "text": "Hello"}]}
            ],
            "stream": true,
            "config": {}
        })
    );
}

#[test]
fn replayed_history_uses_output_text_for_assistant_turns() {
    let request = ResponsesRequest::new(vec![
        InputEntry::user("first"),
        InputEntry::assistant("reply"),
        InputEntry::user("second"),
    ])
    .with_model("gpt-test");
    let body = serde_json::to_value(&request).expect("serialize payload");

    assert_eq!(body["model"], json!("gpt-test"));
    assert_eq!(
        body["input"][1],
        json!({"role": "assistant", "content": [{"type": "output_text", "text": "reply"}]})
    );
    assert_eq!(body["input"][2]["content"][0]["text"], json!("second"));
}

#[test]
fn output_schema_becomes_strict_json_schema_format() {
    let schema = json!({"type": "object", "properties": {"answer": {"type": "string"}}});
    let request =
        ResponsesRequest::new(vec![InputEntry::user("q")]).with_output_schema(schema.clone());
    let body = serde_json::to_value(&request).expect("serialize payload");

    assert_eq!(
        body["text"],
        json!({
            "format": {
                "type": "json_schema",
                "name": OUTPUT_SCHEMA_NAME,
                "schema": schema,
                "strict": true
            }
        })
    );
}

#[test]
fn images_are_serialized_when_present() {
    let mut request = ResponsesRequest::new(vec![InputEntry::user("look")]);
    request.images.push("/tmp/one.png".to_owned());
    let body = serde_json::to_value(&request).expect("serialize payload");
    assert_eq!(body["images"], json!(["/tmp/one.png"]));
}
