// src/watch/pending.rs

//! The shared coordination cell between the directory watcher and the
//! debounced reloader.
//!
//! This is a monitor in the classic sense: one boolean ("at least one
//! unprocessed filesystem event has occurred") guarded by one mutex, plus a
//! wakeup signal. The watcher is the only writer of `true`, the reloader the
//! only writer of `false`.
//!
//! Invariants:
//! - false → true only on an observed filesystem event (`mark`)
//! - true → false only right after a reload attempt (`clear`)
//! - duplicate `mark`s are idempotent, so no backpressure is needed

use tokio::sync::{Mutex, Notify};

/// Shared "something changed" flag. Passed by `Arc` to both workers at
/// construction; carries no payload.
#[derive(Debug, Default)]
pub struct PendingChange {
    changed: Mutex<bool>,
    notify: Notify,
}

impl PendingChange {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that at least one filesystem event has occurred and wake the
    /// reloader if it is waiting.
    pub async fn mark(&self) {
        *self.changed.lock().await = true;
        // notify_one stores a permit when nobody is waiting yet, so a mark
        // that races with the reloader between its flag check and its wait
        // is not lost.
        self.notify.notify_one();
    }

    /// Block until the flag is true. The mutex is released while waiting;
    /// the flag is left set for the caller to act on.
    pub async fn wait(&self) {
        loop {
            if *self.changed.lock().await {
                return;
            }
            self.notify.notified().await;
        }
    }

    /// Reset the flag. Called by the reloader after a reload attempt,
    /// regardless of its outcome.
    pub async fn clear(&self) {
        *self.changed.lock().await = false;
    }

    #[cfg(test)]
    pub async fn is_marked(&self) -> bool {
        *self.changed.lock().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::PendingChange;

    #[tokio::test]
    async fn wait_returns_immediately_when_already_marked() {
        let pending = PendingChange::new();
        pending.mark().await;
        // Must not hang.
        tokio::time::timeout(Duration::from_secs(1), pending.wait())
            .await
            .expect("wait should return once marked");
        assert!(pending.is_marked().await);
    }

    #[tokio::test]
    async fn wait_blocks_until_marked() {
        let pending = Arc::new(PendingChange::new());

        let waiter = {
            let pending = Arc::clone(&pending);
            tokio::spawn(async move {
                pending.wait().await;
            })
        };

        // Give the waiter a chance to park on the flag.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        pending.mark().await;
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake after mark")
            .unwrap();
    }

    #[tokio::test]
    async fn clear_resets_the_flag() {
        let pending = PendingChange::new();
        pending.mark().await;
        pending.clear().await;
        assert!(!pending.is_marked().await);

        // A cleared flag blocks the next wait until marked again.
        let wait = pending.wait();
        tokio::pin!(wait);
        let timed_out = tokio::time::timeout(Duration::from_millis(50), &mut wait)
            .await
            .is_err();
        assert!(timed_out, "wait should block after clear");
    }

    #[tokio::test]
    async fn duplicate_marks_are_idempotent() {
        let pending = PendingChange::new();
        pending.mark().await;
        pending.mark().await;
        pending.mark().await;
        pending.wait().await;
        pending.clear().await;
        assert!(!pending.is_marked().await);
    }
}
