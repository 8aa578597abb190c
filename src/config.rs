//! Bridge configuration, optionally read from the environment.

use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;

use session_store::HistoryPolicy;

pub const BASE_URL_ENV: &str = "CODEX_BRIDGE_BASE_URL";
pub const API_KEY_ENV: &str = "CODEX_API_KEY";
pub const EXECUTABLE_ENV: &str = "CODEX_EXECUTABLE";
pub const MAX_HISTORY_ENV: &str = "CODEX_BRIDGE_MAX_HISTORY_MESSAGES";

/// Engine-wide settings shared by every thread a [`crate::CodexBridge`] runs.
#[derive(Debug, Clone, Default)]
pub struct BridgeOptions {
    /// `codex` binary for process turns; `codex` on `PATH` when unset.
    pub executable_path: Option<PathBuf>,
    /// Remote endpoint. When set, turns run over HTTP.
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    /// Replaces the inherited environment of spawned processes.
    pub env: Option<BTreeMap<String, String>>,
    pub history_policy: HistoryPolicy,
}

impl BridgeOptions {
    pub fn from_env() -> Self {
        Self {
            executable_path: env_string_opt(EXECUTABLE_ENV).map(PathBuf::from),
            base_url: env_string_opt(BASE_URL_ENV),
            api_key: env_string_opt(API_KEY_ENV),
            env: None,
            history_policy: match env_usize_opt(MAX_HISTORY_ENV) {
                Some(limit) => HistoryPolicy::bounded(limit),
                None => HistoryPolicy::unbounded(),
            },
        }
    }

    #[must_use]
    pub fn with_executable_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    #[must_use]
    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }

    #[must_use]
    pub fn with_history_policy(mut self, policy: HistoryPolicy) -> Self {
        self.history_policy = policy;
        self
    }
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let value = value.trim();
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    })
}

fn env_usize_opt(key: &str) -> Option<usize> {
    let raw = env_string_opt(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::warn!(key, value = %raw, %error, "ignoring unparseable environment value");
            None
        }
    }
}
