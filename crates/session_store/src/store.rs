use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use agent_provider::ConversationMessage;

/// Retention policy applied when a thread's history is committed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryPolicy {
    /// Keep at most this many messages per thread, dropping the oldest first.
    /// `None` keeps everything for the lifetime of the store.
    pub max_messages_per_thread: Option<usize>,
}

impl HistoryPolicy {
    #[must_use]
    pub fn unbounded() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn bounded(max_messages_per_thread: usize) -> Self {
        Self {
            max_messages_per_thread: Some(max_messages_per_thread),
        }
    }
}

/// Per-thread conversation history replayed into remote turns.
///
/// `get` never mutates; `commit` swaps a thread's whole list under one lock, so
/// readers see either the previous list or the new one, never a partial append.
/// Interleaved get/commit cycles on the same thread are not coordinated here.
#[derive(Debug, Default)]
pub struct HistoryStore {
    policy: HistoryPolicy,
    threads: Mutex<HashMap<String, Arc<[ConversationMessage]>>>,
}

impl HistoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_policy(policy: HistoryPolicy) -> Self {
        Self {
            policy,
            threads: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> HistoryPolicy {
        self.policy
    }

    /// Ordered messages for `thread_id`, or an empty list when unknown.
    pub fn get(&self, thread_id: &str) -> Vec<ConversationMessage> {
        lock_unpoisoned(&self.threads)
            .get(thread_id)
            .map(|messages| messages.to_vec())
            .unwrap_or_default()
    }

    /// Replaces the stored list for `thread_id`.
    pub fn commit(&self, thread_id: &str, mut messages: Vec<ConversationMessage>) {
        if let Some(limit) = self.policy.max_messages_per_thread {
            if messages.len() > limit {
                let overflow = messages.len() - limit;
                messages.drain(..overflow);
            }
        }

        let count = messages.len();
        lock_unpoisoned(&self.threads).insert(thread_id.to_string(), Arc::from(messages));
        tracing::debug!(thread_id, messages = count, "committed thread history");
    }

    pub fn remove(&self, thread_id: &str) -> bool {
        lock_unpoisoned(&self.threads).remove(thread_id).is_some()
    }

    pub fn thread_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = lock_unpoisoned(&self.threads).keys().cloned().collect();
        ids.sort();
        ids
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
