use codex_api::error::parse_error_message;
use codex_api::CodexApiError;
use reqwest::StatusCode;

#[test]
fn error_message_prefers_structured_payload() {
    assert_eq!(
        parse_error_message(
            StatusCode::BAD_REQUEST,
            r#"{"error":{"message":"invalid request"}}"#
        ),
        "invalid request"
    );
}

#[test]
fn error_message_falls_back_to_body_then_reason() {
    assert_eq!(
        parse_error_message(StatusCode::BAD_GATEWAY, "upstream exploded"),
        "upstream exploded"
    );
    assert_eq!(
        parse_error_message(StatusCode::SERVICE_UNAVAILABLE, "  "),
        "Service Unavailable"
    );
}

#[test]
fn status_error_exposes_code_and_display() {
    let error = CodexApiError::Status(StatusCode::NOT_FOUND, "missing".to_owned());
    assert_eq!(error.status_code(), Some(StatusCode::NOT_FOUND));
    assert_eq!(error.to_string(), "HTTP 404 Not Found missing");
    assert_eq!(CodexApiError::MissingBody.status_code(), None);
}
