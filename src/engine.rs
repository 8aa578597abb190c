//! Transport selection and the engine entry point.

use std::sync::Arc;

use agent_provider::{EventStream, ThreadOptions, TransportKind, TurnArguments, TurnTransport};
use agent_provider_codex_api::HttpTransport;
use agent_provider_exec::{ExecConfig, ExecTransport};
use session_store::HistoryStore;

use crate::config::BridgeOptions;
use crate::thread::Thread;

/// HTTP when the turn names a remote endpoint, the local process otherwise.
#[must_use]
pub fn select_transport(args: &TurnArguments) -> TransportKind {
    if args.remote_endpoint().is_some() {
        TransportKind::Http
    } else {
        TransportKind::Process
    }
}

/// Runs turns over whichever transport each call selects.
///
/// Cloning is cheap; clones share the same history store and transports.
#[derive(Debug, Clone)]
pub struct CodexBridge {
    inner: Arc<BridgeInner>,
}

#[derive(Debug)]
struct BridgeInner {
    options: BridgeOptions,
    history: Arc<HistoryStore>,
    process: ExecTransport,
    http: HttpTransport,
}

impl CodexBridge {
    /// Creates an engine with a fresh history store governed by the configured policy.
    #[must_use]
    pub fn new(options: BridgeOptions) -> Self {
        let history = Arc::new(HistoryStore::with_policy(options.history_policy));
        Self::with_history(options, history)
    }

    /// Creates an engine that replays and commits through `history`.
    #[must_use]
    pub fn with_history(options: BridgeOptions, history: Arc<HistoryStore>) -> Self {
        let mut exec = ExecConfig::default();
        if let Some(path) = &options.executable_path {
            exec.executable = path.clone();
        }
        exec.env = options.env.clone();
        exec.api_key = options.api_key.clone();

        Self {
            inner: Arc::new(BridgeInner {
                process: ExecTransport::new(exec),
                http: HttpTransport::new(Arc::clone(&history)),
                history,
                options,
            }),
        }
    }

    pub fn options(&self) -> &BridgeOptions {
        &self.inner.options
    }

    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.inner.history
    }

    /// Transport that [`select_transport`] picks for `args`.
    pub fn transport_for(&self, args: &TurnArguments) -> &dyn TurnTransport {
        match select_transport(args) {
            TransportKind::Http => &self.inner.http,
            TransportKind::Process => &self.inner.process,
        }
    }

    /// Runs one turn and returns its lazy event stream.
    ///
    /// Engine-level endpoint and key fill in whatever the arguments leave unset.
    pub fn run_turn(&self, mut args: TurnArguments) -> EventStream {
        if args.remote_endpoint().is_none() {
            args.base_url = self.inner.options.base_url.clone();
        }
        if args.api_key.is_none() {
            args.api_key = self.inner.options.api_key.clone();
        }

        let transport = self.transport_for(&args);
        tracing::debug!(
            transport = %transport.kind(),
            thread_id = args.thread_id.as_deref().unwrap_or("<new>"),
            "dispatching turn"
        );
        transport.run_turn(args)
    }

    /// A new thread; its id is assigned by the first turn.
    #[must_use]
    pub fn start_thread(&self, options: ThreadOptions) -> Thread {
        Thread::new(self.clone(), None, options)
    }

    /// Continues an existing thread.
    #[must_use]
    pub fn resume_thread(&self, thread_id: impl Into<String>, options: ThreadOptions) -> Thread {
        Thread::new(self.clone(), Some(thread_id.into()), options)
    }
}

impl Default for CodexBridge {
    fn default() -> Self {
        Self::new(BridgeOptions::default())
    }
}
