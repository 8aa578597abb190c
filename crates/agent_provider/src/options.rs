use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::cancel::CancelSignal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SandboxMode {
    ReadOnly,
    WorkspaceWrite,
    DangerFullAccess,
}

impl SandboxMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReadOnly => "read-only",
            Self::WorkspaceWrite => "workspace-write",
            Self::DangerFullAccess => "danger-full-access",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApprovalMode {
    Never,
    OnRequest,
    OnFailure,
    Untrusted,
}

impl ApprovalMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Never => "never",
            Self::OnRequest => "on-request",
            Self::OnFailure => "on-failure",
            Self::Untrusted => "untrusted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelReasoningEffort {
    Minimal,
    Low,
    Medium,
    High,
    Xhigh,
}

impl ModelReasoningEffort {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Xhigh => "xhigh",
        }
    }
}

/// Per-thread execution options shared by every turn of a thread.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadOptions {
    pub model: Option<String>,
    pub sandbox_mode: Option<SandboxMode>,
    pub working_directory: Option<PathBuf>,
    pub additional_directories: Vec<PathBuf>,
    pub skip_git_repo_check: bool,
    pub model_reasoning_effort: Option<ModelReasoningEffort>,
    pub network_access_enabled: Option<bool>,
    pub web_search_enabled: Option<bool>,
    pub approval_policy: Option<ApprovalMode>,
}

impl ThreadOptions {
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    #[must_use]
    pub fn with_sandbox_mode(mut self, mode: SandboxMode) -> Self {
        self.sandbox_mode = Some(mode);
        self
    }

    #[must_use]
    pub fn with_working_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_additional_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.additional_directories.push(path.into());
        self
    }

    #[must_use]
    pub fn skip_git_repo_check(mut self, skip: bool) -> Self {
        self.skip_git_repo_check = skip;
        self
    }

    #[must_use]
    pub fn with_reasoning_effort(mut self, effort: ModelReasoningEffort) -> Self {
        self.model_reasoning_effort = Some(effort);
        self
    }

    #[must_use]
    pub fn with_network_access(mut self, enabled: bool) -> Self {
        self.network_access_enabled = Some(enabled);
        self
    }

    #[must_use]
    pub fn with_web_search(mut self, enabled: bool) -> Self {
        self.web_search_enabled = Some(enabled);
        self
    }

    #[must_use]
    pub fn with_approval_policy(mut self, policy: ApprovalMode) -> Self {
        self.approval_policy = Some(policy);
        self
    }
}

/// Immutable input to one turn execution.
#[derive(Debug, Clone, Default)]
pub struct TurnArguments {
    pub input: String,
    /// Existing thread to continue; `None` starts a new one.
    pub thread_id: Option<String>,
    pub options: ThreadOptions,
    pub images: Vec<PathBuf>,
    pub output_schema_file: Option<PathBuf>,
    /// Remote endpoint. Its presence selects the HTTP transport.
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    /// Emit `item.started` before each synthesized `item.completed`.
    pub emit_item_progress: bool,
    pub cancel: CancelSignal,
}

impl TurnArguments {
    #[must_use]
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            ..Self::default()
        }
    }

    /// Trimmed remote endpoint, when one is configured.
    #[must_use]
    pub fn remote_endpoint(&self) -> Option<&str> {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

/// One `--config key=value` style override.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigOverride {
    pub key: &'static str,
    pub value: Value,
}

impl ConfigOverride {
    /// Renders the override as a `key=value` argument with a TOML literal value.
    #[must_use]
    pub fn to_cli_arg(&self) -> String {
        // JSON scalars double as TOML literals: strings come out quoted, bools bare.
        format!("{}={}", self.key, self.value)
    }
}

/// Config overrides derived from thread options, in a fixed order.
///
/// Both transports derive their configuration from this list, so a given
/// `ThreadOptions` value configures them identically.
#[must_use]
pub fn config_overrides(options: &ThreadOptions) -> Vec<ConfigOverride> {
    let mut overrides = Vec::new();

    if let Some(effort) = options.model_reasoning_effort {
        overrides.push(ConfigOverride {
            key: "model_reasoning_effort",
            value: Value::from(effort.as_str()),
        });
    }
    if let Some(enabled) = options.network_access_enabled {
        overrides.push(ConfigOverride {
            key: "sandbox_workspace_write.network_access",
            value: Value::Bool(enabled),
        });
    }
    if let Some(enabled) = options.web_search_enabled {
        overrides.push(ConfigOverride {
            key: "features.web_search_request",
            value: Value::Bool(enabled),
        });
    }
    if let Some(policy) = options.approval_policy {
        overrides.push(ConfigOverride {
            key: "approval_policy",
            value: Value::from(policy.as_str()),
        });
    }

    overrides
}

/// Nests dotted override keys into a JSON object.
#[must_use]
pub fn overrides_to_json(overrides: &[ConfigOverride]) -> Map<String, Value> {
    let mut root = Map::new();

    for entry in overrides {
        let mut segments = entry.key.split('.').peekable();
        let mut cursor = &mut root;
        while let Some(segment) = segments.next() {
            if segments.peek().is_none() {
                cursor.insert(segment.to_string(), entry.value.clone());
                break;
            }
            let child = cursor
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            let Value::Object(next) = child else {
                break;
            };
            cursor = next;
        }
    }

    root
}
