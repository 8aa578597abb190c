use std::sync::{Arc, Mutex, MutexGuard};

use tokio_util::sync::CancellationToken;

pub const DEFAULT_CANCEL_REASON: &str = "turn was cancelled";

/// Cancellation signal threaded through one turn.
///
/// Clones share state: cancelling any clone cancels them all. The first reason
/// recorded wins.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    token: CancellationToken,
    reason: Arc<Mutex<Option<String>>>,
}

impl CancelSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancel_with_reason(DEFAULT_CANCEL_REASON);
    }

    pub fn cancel_with_reason(&self, reason: impl Into<String>) {
        {
            let mut slot = lock_unpoisoned(&self.reason);
            if slot.is_none() {
                *slot = Some(reason.into());
            }
        }
        self.token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Returns the recorded reason, or the default when none was given.
    #[must_use]
    pub fn reason(&self) -> String {
        lock_unpoisoned(&self.reason)
            .clone()
            .unwrap_or_else(|| DEFAULT_CANCEL_REASON.to_string())
    }

    /// Resolves once the signal fires.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// Underlying token, for transport primitives that race I/O against it.
    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{CancelSignal, DEFAULT_CANCEL_REASON};

    #[test]
    fn first_reason_wins_across_clones() {
        let signal = CancelSignal::new();
        let clone = signal.clone();

        clone.cancel_with_reason("shutting down");
        signal.cancel_with_reason("second");

        assert!(signal.is_cancelled());
        assert_eq!(signal.reason(), "shutting down");
    }

    #[test]
    fn default_reason_is_used_when_none_given() {
        let signal = CancelSignal::new();
        assert!(!signal.is_cancelled());

        signal.cancel();
        assert_eq!(signal.reason(), DEFAULT_CANCEL_REASON);
    }

    #[tokio::test]
    async fn cancelled_future_resolves_after_cancel() {
        let signal = CancelSignal::new();
        let waiter = signal.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            signal.cancel();
        });

        tokio::time::timeout(Duration::from_secs(2), waiter.cancelled())
            .await
            .expect("cancelled() should resolve once the signal fires");
    }
}
