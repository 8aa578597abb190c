use std::path::PathBuf;

use thiserror::Error;

/// Failure taxonomy shared by both transports.
///
/// Process-path failures are raised as stream errors. HTTP-path failures other
/// than cancellation and the output-schema preflight are rendered with this
/// type's `Display` into a terminal `turn.failed` event instead.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error(
        "working directory {path} is not inside a trusted repository; \
         set skip_git_repo_check to run here anyway"
    )]
    UntrustedDirectory { path: PathBuf },

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("child process {channel} is unavailable")]
    ProcessIoUnavailable { channel: &'static str },

    #[error("I/O error while {operation}: {source}")]
    Io {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("codex exec exited with {}: {stderr}", describe_exit(*code))]
    ProcessExit { code: Option<i32>, stderr: String },

    #[error("failed to parse event line {line:?}: {source}")]
    EventParse {
        line: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Cancelled(String),

    #[error("failed to load output schema from {path}: {message}")]
    OutputSchema { path: PathBuf, message: String },

    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("response body is missing")]
    MissingResponseBody,

    #[error("stream disconnected before completion: {0}")]
    StreamDisconnected(String),

    #[error("transport setup failed: {0}")]
    Transport(String),

    #[error("turn failed: {0}")]
    TurnFailed(String),
}

impl TurnError {
    #[must_use]
    pub fn io(operation: &'static str, source: std::io::Error) -> Self {
        Self::Io { operation, source }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("code {code}"),
        None => "a signal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::TurnError;

    #[test]
    fn process_exit_message_embeds_code_and_stderr() {
        let error = TurnError::ProcessExit {
            code: Some(2),
            stderr: "fatal: bad flag\n".to_string(),
        };

        let message = error.to_string();
        assert!(message.contains("code 2"));
        assert!(message.contains("fatal: bad flag\n"));
    }

    #[test]
    fn signal_exit_is_described_without_code() {
        let error = TurnError::ProcessExit {
            code: None,
            stderr: String::new(),
        };

        assert_eq!(error.to_string(), "codex exec exited with a signal: ");
    }

    #[test]
    fn cancelled_carries_reason_verbatim() {
        let error = TurnError::Cancelled("user pressed ctrl-c".to_string());
        assert!(error.is_cancelled());
        assert_eq!(error.to_string(), "user pressed ctrl-c");
    }
}
