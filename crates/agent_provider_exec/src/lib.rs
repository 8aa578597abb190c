//! Process-backed implementation of the shared `agent_provider` contract.
//!
//! Each turn spawns `codex exec --experimental-json`, writes the prompt to the
//! child's stdin, and yields every stdout line as a parsed [`ThreadEvent`].
//! Failures are raised as stream errors; the child never outlives the stream.

use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::process::ExitStatus;

use agent_provider::{
    CancelSignal, EventStream, ThreadEvent, TransportKind, TurnArguments, TurnError,
    TurnTransport,
};
use async_stream::try_stream;
use futures_core::Stream;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr};
use tokio::task::JoinHandle;

mod command;
mod trust;

pub use command::{
    build_exec_args, exec_environment, API_KEY_ENV, BASE_URL_ENV, DEFAULT_ORIGINATOR,
    ORIGINATOR_OVERRIDE_ENV,
};
pub use trust::{find_repository_root, REPOSITORY_MARKERS};

/// Executable looked up on `PATH` when none is configured.
pub const DEFAULT_EXECUTABLE: &str = "codex";

/// Static configuration for spawning the `codex` binary.
#[derive(Debug, Clone)]
pub struct ExecConfig {
    pub executable: PathBuf,
    /// Replaces the inherited environment when set.
    pub env: Option<BTreeMap<String, String>>,
    /// Forwarded to the child as `OPENAI_BASE_URL`.
    pub base_url: Option<String>,
    /// Forwarded as `CODEX_API_KEY` unless the turn supplies its own key.
    pub api_key: Option<String>,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from(DEFAULT_EXECUTABLE),
            env: None,
            base_url: None,
            api_key: None,
        }
    }
}

impl ExecConfig {
    #[must_use]
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = Some(env);
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
}

/// `TurnTransport` that runs each turn in a `codex exec` child process.
#[derive(Debug, Clone, Default)]
pub struct ExecTransport {
    config: ExecConfig,
}

impl ExecTransport {
    #[must_use]
    pub fn new(config: ExecConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecConfig {
        &self.config
    }
}

impl TurnTransport for ExecTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Process
    }

    fn run_turn(&self, args: TurnArguments) -> EventStream {
        Box::pin(exec_turn(self.config.clone(), args))
    }
}

fn exec_turn(
    config: ExecConfig,
    args: TurnArguments,
) -> impl Stream<Item = Result<ThreadEvent, TurnError>> + Send {
    try_stream! {
        let cancel = args.cancel.clone();
        ensure_not_cancelled(&cancel)?;
        ensure_trusted(&args)?;

        let mut child = command::build_command(&config, &args)
            .spawn()
            .map_err(|source| TurnError::Spawn {
                program: config.executable.clone(),
                source,
            })?;
        tracing::debug!(
            program = %config.executable.display(),
            pid = child.id(),
            resume = args.thread_id.is_some(),
            "spawned codex exec"
        );

        let mut stderr_task = take_stderr(&mut child).await?;
        let written = until_cancelled(&cancel, write_input(&mut child, &args.input)).await;
        match written {
            Some(written) => written?,
            None => {
                terminate(&mut child).await;
                Err(TurnError::Cancelled(cancel.reason()))?
            }
        }

        let stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => {
                terminate(&mut child).await;
                Err(TurnError::ProcessIoUnavailable { channel: "stdout" })?
            }
        };
        let mut lines = BufReader::new(stdout).lines();

        loop {
            let line = until_cancelled(&cancel, lines.next_line()).await;
            let line = match line {
                Some(line) => line,
                None => {
                    terminate(&mut child).await;
                    Err(TurnError::Cancelled(cancel.reason()))?
                }
            };
            let Some(line) = line.map_err(|error| TurnError::io("reading codex stdout", error))? else {
                break;
            };
            if let Some(event) = parse_event_line(&line)? {
                yield event;
            }
        }

        let status = until_cancelled(&cancel, child.wait()).await;
        let status = match status {
            Some(status) => status,
            None => {
                terminate(&mut child).await;
                Err(TurnError::Cancelled(cancel.reason()))?
            }
        };
        let status = status.map_err(|error| TurnError::io("waiting for codex exec", error))?;
        if !status.success() {
            // A surviving grandchild can hold stderr open past the exit.
            let joined = until_cancelled(&cancel, &mut stderr_task).await;
            let stderr = match joined {
                Some(joined) => joined.unwrap_or_default(),
                None => {
                    stderr_task.abort();
                    Err(TurnError::Cancelled(cancel.reason()))?
                }
            };
            check_exit(status, stderr)?;
        }
    }
}

/// Resolves `future` unless the signal fires first.
async fn until_cancelled<F: Future>(cancel: &CancelSignal, future: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        output = future => Some(output),
    }
}

fn ensure_not_cancelled(cancel: &CancelSignal) -> Result<(), TurnError> {
    if cancel.is_cancelled() {
        return Err(TurnError::Cancelled(cancel.reason()));
    }
    Ok(())
}

fn ensure_trusted(args: &TurnArguments) -> Result<(), TurnError> {
    let options = &args.options;
    let Some(dir) = options.working_directory.as_deref() else {
        return Ok(());
    };
    if options.skip_git_repo_check || find_repository_root(dir).is_some() {
        return Ok(());
    }
    Err(TurnError::UntrustedDirectory {
        path: dir.to_path_buf(),
    })
}

/// Starts draining stderr in the background so a chatty child never blocks.
async fn take_stderr(child: &mut Child) -> Result<JoinHandle<String>, TurnError> {
    let Some(stderr) = child.stderr.take() else {
        terminate(child).await;
        return Err(TurnError::ProcessIoUnavailable { channel: "stderr" });
    };
    Ok(tokio::spawn(drain_stderr(stderr)))
}

async fn drain_stderr(mut stderr: ChildStderr) -> String {
    let mut buffer = Vec::new();
    if let Err(error) = stderr.read_to_end(&mut buffer).await {
        tracing::debug!(%error, "stopped reading codex stderr");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Writes the prompt and closes stdin so the child sees end of input.
async fn write_input(child: &mut Child, input: &str) -> Result<(), TurnError> {
    let Some(mut stdin) = child.stdin.take() else {
        terminate(child).await;
        return Err(TurnError::ProcessIoUnavailable { channel: "stdin" });
    };

    let written = match stdin.write_all(input.as_bytes()).await {
        Ok(()) => stdin.shutdown().await,
        Err(error) => Err(error),
    };
    match written {
        Ok(()) => Ok(()),
        // Child exited without reading its input; the exit status is reported instead.
        Err(error) if error.kind() == std::io::ErrorKind::BrokenPipe => {
            tracing::debug!("codex exec closed stdin before reading the prompt");
            Ok(())
        }
        Err(error) => Err(TurnError::io("writing codex stdin", error)),
    }
}

/// Parses one stdout line; blank lines yield `None`. Any JSON value is an
/// event, so only text that is not JSON at all is rejected.
fn parse_event_line(line: &str) -> Result<Option<ThreadEvent>, TurnError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(trimmed)
        .map(Some)
        .map_err(|source| TurnError::EventParse {
            line: line.to_owned(),
            source,
        })
}

fn check_exit(status: ExitStatus, stderr: String) -> Result<(), TurnError> {
    if status.success() {
        return Ok(());
    }
    tracing::debug!(code = ?status.code(), "codex exec exited unsuccessfully");
    Err(TurnError::ProcessExit {
        code: status.code(),
        stderr,
    })
}

async fn terminate(child: &mut Child) {
    if let Err(error) = child.kill().await {
        tracing::debug!(%error, "failed to kill codex exec child");
    }
}
