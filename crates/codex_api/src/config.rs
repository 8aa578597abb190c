use std::collections::BTreeMap;
use std::time::Duration;

/// Environment variable that overrides the `originator` identity.
pub const ORIGINATOR_OVERRIDE_ENV: &str = "CODEX_INTERNAL_ORIGINATOR_OVERRIDE";
/// Originator sent when no override is configured.
pub const DEFAULT_ORIGINATOR: &str = "codex_sdk_rs";

/// Transport configuration for `responses` requests.
#[derive(Debug, Clone)]
pub struct CodexApiConfig {
    /// Base URL; requests go to `<base_url>/responses`.
    pub base_url: String,
    /// Optional bearer token passed to `Authorization`.
    pub api_key: Option<String>,
    /// Client-origin identifier added to outgoing headers.
    pub originator: String,
    /// Optional `User-Agent` override.
    pub user_agent: Option<String>,
    /// Additional headers merged into request headers.
    pub extra_headers: BTreeMap<String, String>,
    /// Optional request timeout.
    pub timeout: Option<Duration>,
}

impl CodexApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            originator: resolve_originator(),
            user_agent: None,
            extra_headers: BTreeMap::new(),
            timeout: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_originator(mut self, originator: impl Into<String>) -> Self {
        self.originator = originator.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn insert_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(key.into(), value.into());
        self
    }

    pub fn with_headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        self.extra_headers.extend(headers);
        self
    }
}

/// Originator from the environment override, else [`DEFAULT_ORIGINATOR`].
pub fn resolve_originator() -> String {
    std::env::var(ORIGINATOR_OVERRIDE_ENV)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_ORIGINATOR.to_owned())
}
