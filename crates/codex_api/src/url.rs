use url::Url;

use crate::error::CodexApiError;

/// Resolve a base URL to its `responses` endpoint.
///
/// Normalization rules:
/// 1) trailing slashes are dropped
/// 2) a path already ending in `/responses` is kept unchanged
/// 3) `/responses` is appended otherwise
pub fn responses_endpoint(base_url: &str) -> Result<String, CodexApiError> {
    let trimmed = base_url.trim().trim_end_matches('/');
    let parsed =
        Url::parse(trimmed).map_err(|error| CodexApiError::InvalidBaseUrl(format!("{trimmed}: {error}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(CodexApiError::InvalidBaseUrl(format!(
            "{trimmed}: unsupported scheme '{}'",
            parsed.scheme()
        )));
    }

    if trimmed.ends_with("/responses") {
        return Ok(trimmed.to_string());
    }
    Ok(format!("{trimmed}/responses"))
}
