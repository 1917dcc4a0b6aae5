// src/watch/watcher.rs

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::watch::pending::PendingChange;

/// Watches one certificate directory (non-recursive) and coalesces every
/// filesystem event into the shared [`PendingChange`] flag.
///
/// Events are not inspected for meaning: a reload re-reads the whole
/// directory anyway, so the only information worth carrying is "something
/// changed". Individual events are still logged at debug level for
/// diagnostics.
pub struct DirectoryWatcher {
    dir: PathBuf,
    pending: Arc<PendingChange>,
}

impl DirectoryWatcher {
    pub fn new(dir: impl Into<PathBuf>, pending: Arc<PendingChange>) -> Self {
        Self {
            dir: dir.into(),
            pending,
        }
    }

    /// Register the watch and spawn the event loop.
    ///
    /// Registration happens synchronously so that an I/O failure here (the
    /// directory existed moments ago, so this means environment
    /// misconfiguration) surfaces as a startup error instead of a silent
    /// no-op. The spawned loop runs for the rest of the process lifetime.
    pub fn start(self) -> Result<()> {
        // Channel from the blocking notify callback into the async world.
        // Errors from the watch backend are forwarded too, so the loop can
        // log them and keep going.
        let (event_tx, event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                // The receiver only disappears at process shutdown.
                let _ = event_tx.send(res);
            },
            Config::default(),
        )
        .context("creating filesystem watcher")?;

        watcher
            .watch(&self.dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("watching certificate directory {}", self.dir.display()))?;

        info!(dir = %self.dir.display(), "watching certificate directory for changes");

        tokio::spawn(event_loop(watcher, event_rx, self.pending));

        Ok(())
    }
}

/// Consume notify events forever: block until at least one arrives, drain the
/// rest of the burst, then set the pending flag once and wake the reloader.
async fn event_loop(
    watcher: RecommendedWatcher,
    mut event_rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
    pending: Arc<PendingChange>,
) {
    // Held here so the watch registration stays alive as long as the loop.
    let _watcher = watcher;

    loop {
        let Some(first) = event_rx.recv().await else {
            debug!("watch event channel closed, watcher loop ended");
            return;
        };

        let mut batch = vec![first];
        while let Ok(more) = event_rx.try_recv() {
            batch.push(more);
        }

        let mut observed = false;
        for res in batch {
            match res {
                Ok(event) => {
                    observed = true;
                    for path in &event.paths {
                        let file = path
                            .file_name()
                            .map(|n| n.to_string_lossy().into_owned())
                            .unwrap_or_default();
                        debug!(kind = ?event.kind, file = %file, "certificate directory event");
                    }
                }
                Err(err) => {
                    error!(error = %err, "error while watching certificate directory, retrying");
                }
            }
        }

        if observed {
            pending.mark().await;
        }
    }
}
