use codex_api::{responses_endpoint, CodexApiError};

#[test]
fn appends_responses_to_base_url() {
    assert_eq!(
        responses_endpoint("http://127.0.0.1:8080/v1").expect("valid base"),
        "http://127.0.0.1:8080/v1/responses"
    );
}

#[test]
fn trailing_slashes_are_dropped() {
    assert_eq!(
        responses_endpoint("https://api.example.com/v1//").expect("valid base"),
        "https://api.example.com/v1/responses"
    );
}

#[test]
fn existing_responses_endpoint_is_kept() {
    assert_eq!(
        responses_endpoint("https://api.example.com/v1/responses/").expect("valid base"),
        "https://api.example.com/v1/responses"
    );
}

#[test]
fn rejects_unparseable_and_non_http_urls() {
    assert!(matches!(
        responses_endpoint("not a url"),
        Err(CodexApiError::InvalidBaseUrl(_))
    ));
    assert!(matches!(
        responses_endpoint("ftp://example.com"),
        Err(CodexApiError::InvalidBaseUrl(_))
    ));
}
