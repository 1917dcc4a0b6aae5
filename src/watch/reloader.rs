// src/watch/reloader.rs

//! Turns a burst of pending-change signals into exactly one reload call.
//!
//! The reloader sleeps a fixed settle duration after the first wakeup so a
//! multi-file write burst (cert, chain, key written one at a time) has
//! finished before anything is re-read. Events arriving during the settle
//! window fold into the upcoming reload. An event landing between the reload
//! call and the flag reset is dropped until a later, unrelated event arrives;
//! the mitigation is a settle delay longer than the issuing process's
//! inter-file write gap.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::watch::ReloadCertificates;
use crate::watch::pending::PendingChange;

/// Single consumer of the [`PendingChange`] flag. One instance per watched
/// directory, so the reload call is never invoked concurrently with itself.
pub struct DebouncedReloader {
    settle: Duration,
    pending: Arc<PendingChange>,
    reload: Arc<dyn ReloadCertificates>,
}

impl DebouncedReloader {
    pub fn new(
        settle: Duration,
        pending: Arc<PendingChange>,
        reload: Arc<dyn ReloadCertificates>,
    ) -> Self {
        Self {
            settle,
            pending,
            reload,
        }
    }

    /// Spawn the reload loop. Runs until process shutdown.
    pub fn spawn(self) {
        tokio::spawn(async move {
            debug!("listening for certificate changes");
            loop {
                self.pending.wait().await;

                debug!(
                    settle_ms = self.settle.as_millis() as u64,
                    "change detected, waiting for certificate files to settle"
                );
                tokio::time::sleep(self.settle).await;

                info!("reloading certificates");
                match self.reload.reload() {
                    Ok(()) => info!("certificates reloaded"),
                    Err(err) => {
                        // Not retried here; the next filesystem event (e.g.
                        // the last file of the burst landing) triggers the
                        // next attempt.
                        error!(error = ?err, "certificate reload failed, waiting for further changes");
                    }
                }

                // Cleared unconditionally, and only after the attempt.
                self.pending.clear().await;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use anyhow::{Result, anyhow};
    use tokio::time::Instant;

    use super::DebouncedReloader;
    use crate::watch::ReloadCertificates;
    use crate::watch::pending::PendingChange;

    struct RecordingReloader {
        calls: Mutex<Vec<Instant>>,
        fail_next: AtomicBool,
    }

    impl RecordingReloader {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                fail_next: AtomicBool::new(false),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl ReloadCertificates for RecordingReloader {
        fn reload(&self) -> Result<()> {
            self.calls.lock().unwrap().push(Instant::now());
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(anyhow!("certificate set is mid-write"));
            }
            Ok(())
        }
    }

    const SETTLE: Duration = Duration::from_millis(3000);

    fn spawn_reloader(pending: &Arc<PendingChange>, reload: &Arc<RecordingReloader>) {
        let reload: Arc<dyn ReloadCertificates> = Arc::clone(reload) as _;
        DebouncedReloader::new(SETTLE, Arc::clone(pending), reload).spawn();
    }

    #[tokio::test(start_paused = true)]
    async fn single_event_reloads_once_after_settle() {
        let pending = Arc::new(PendingChange::new());
        let reload = RecordingReloader::new();
        spawn_reloader(&pending, &reload);

        let marked_at = Instant::now();
        pending.mark().await;

        // Just short of the settle delay: nothing yet.
        tokio::time::sleep(Duration::from_millis(2900)).await;
        assert_eq!(reload.call_count(), 0);

        tokio::time::sleep(Duration::from_millis(500)).await;
        let calls = reload.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(calls[0] - marked_at >= SETTLE);
    }

    #[tokio::test(start_paused = true)]
    async fn burst_within_settle_window_reloads_once() {
        let pending = Arc::new(PendingChange::new());
        let reload = RecordingReloader::new();
        spawn_reloader(&pending, &reload);

        // Events at t=0, t=500, t=2900 within one settle window.
        pending.mark().await;
        tokio::time::sleep(Duration::from_millis(500)).await;
        pending.mark().await;
        tokio::time::sleep(Duration::from_millis(2400)).await;
        pending.mark().await;

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(reload.call_count(), 1);
        assert!(!pending.is_marked().await);
    }

    #[tokio::test(start_paused = true)]
    async fn separated_bursts_reload_once_each() {
        let pending = Arc::new(PendingChange::new());
        let reload = RecordingReloader::new();
        spawn_reloader(&pending, &reload);

        pending.mark().await;
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(reload.call_count(), 1);

        pending.mark().await;
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(reload.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_reload_clears_flag_and_next_event_retries() {
        let pending = Arc::new(PendingChange::new());
        let reload = RecordingReloader::new();
        reload.fail_next.store(true, Ordering::SeqCst);
        spawn_reloader(&pending, &reload);

        pending.mark().await;
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(reload.call_count(), 1);
        assert!(!pending.is_marked().await, "flag cleared despite failure");

        // The last file of the burst lands 5s later; second attempt succeeds.
        tokio::time::sleep(Duration::from_secs(5)).await;
        pending.mark().await;
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(reload.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn no_events_means_no_reloads() {
        let pending = Arc::new(PendingChange::new());
        let reload = RecordingReloader::new();
        spawn_reloader(&pending, &reload);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(reload.call_count(), 0);
    }
}
