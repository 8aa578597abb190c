use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name under which a caller-supplied output schema is sent.
pub const OUTPUT_SCHEMA_NAME: &str = "codex_output_schema";

/// Request payload for the streaming `responses` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponsesRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub input: Vec<InputEntry>,
    /// Default: true.
    #[serde(default = "default_true")]
    pub stream: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<TextControls>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    /// Mirrors the `--config` overrides the exec transport would pass.
    #[serde(default)]
    pub config: Map<String, Value>,
}

fn default_true() -> bool {
    true
}

impl ResponsesRequest {
    pub fn new(input: Vec<InputEntry>) -> Self {
        Self {
            model: None,
            input,
            stream: true,
            text: None,
            images: Vec::new(),
            config: Map::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_output_schema(mut self, schema: Value) -> Self {
        self.text = Some(TextControls {
            format: OutputFormat::json_schema(schema),
        });
        self
    }
}

/// One conversation entry in the request `input` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputEntry {
    pub role: String,
    pub content: Vec<ContentPart>,
}

impl InputEntry {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_owned(),
            content: vec![ContentPart::InputText { text: text.into() }],
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_owned(),
            content: vec![ContentPart::OutputText { text: text.into() }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    InputText { text: String },
    OutputText { text: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextControls {
    pub format: OutputFormat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputFormat {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub schema: Value,
    pub strict: bool,
}

impl OutputFormat {
    pub fn json_schema(schema: Value) -> Self {
        Self {
            kind: "json_schema".to_owned(),
            name: OUTPUT_SCHEMA_NAME.to_owned(),
            schema,
            strict: true,
        }
    }
}
