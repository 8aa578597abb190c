use serde_json::Value;

/// Responses stream event after normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponsesEvent {
    OutputTextDelta { delta: String },
    OutputItemDone { item: OutputItem },
    /// `response.completed`, and its `response.done` alias.
    Completed { usage: ResponseUsage },
    Failed { message: Option<String> },
    Error {
        code: Option<String>,
        message: Option<String>,
    },
    /// Event type this client does not interpret.
    Unknown { event_type: String },
}

/// A finished output item, reduced to what the bridge needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputItem {
    pub id: Option<String>,
    pub item_type: String,
    /// Concatenated `text` of the item's content parts.
    pub text: String,
}

impl OutputItem {
    pub fn is_message(&self) -> bool {
        self.item_type == "message"
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponseUsage {
    pub input_tokens: u64,
    pub cached_input_tokens: u64,
    pub output_tokens: u64,
}

impl ResponsesEvent {
    /// Maps one decoded SSE record. Records without a `type` yield `None`.
    pub fn from_value(value: Value) -> Option<Self> {
        let event_type = value.get("type")?.as_str()?;

        Some(match event_type {
            "response.output_text.delta" => Self::OutputTextDelta {
                delta: str_field(&value, "delta").unwrap_or_default(),
            },
            "response.output_item.done" => {
                let item = value.get("item").unwrap_or(&Value::Null);
                Self::OutputItemDone {
                    item: OutputItem {
                        id: str_field(item, "id"),
                        item_type: str_field(item, "type").unwrap_or_else(|| "message".to_owned()),
                        text: item_text(item),
                    },
                }
            }
            "response.completed" | "response.done" => Self::Completed {
                usage: value
                    .get("response")
                    .and_then(|response| response.get("usage"))
                    .map(parse_usage)
                    .unwrap_or_default(),
            },
            "response.failed" => Self::Failed {
                message: value
                    .get("response")
                    .and_then(|response| response.get("error"))
                    .and_then(|error| str_field(error, "message")),
            },
            "error" => Self::Error {
                code: str_field(&value, "code"),
                message: str_field(&value, "message").or_else(|| {
                    value
                        .get("error")
                        .and_then(|error| str_field(error, "message"))
                }),
            },
            other => Self::Unknown {
                event_type: other.to_owned(),
            },
        })
    }
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(ToString::to_string)
}

fn item_text(item: &Value) -> String {
    if let Some(parts) = item.get("content").and_then(Value::as_array) {
        return parts
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect();
    }
    str_field(item, "text").unwrap_or_default()
}

fn parse_usage(usage: &Value) -> ResponseUsage {
    let cached = usage
        .get("input_tokens_details")
        .and_then(|details| details.get("cached_tokens"))
        .or_else(|| usage.get("cached_tokens"))
        .or_else(|| usage.get("cached_input_tokens"));

    ResponseUsage {
        input_tokens: coerce_u64(usage.get("input_tokens")),
        cached_input_tokens: coerce_u64(cached),
        output_tokens: coerce_u64(usage.get("output_tokens")),
    }
}

/// Integer coercion for upstream token counts; anything unusable becomes 0.
fn coerce_u64(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(number)) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|f| f.is_finite() && *f > 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Some(Value::String(text)) => text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite() && *f > 0.0)
            .map(|f| f as u64)
            .unwrap_or(0),
        _ => 0,
    }
}
