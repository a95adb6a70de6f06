//! Change observer
//!
//! Attaches to a located subtitle container and turns its subtree
//! mutations into a stream of full trimmed text snapshots. Captions are
//! short-lived whole replacements, so re-reading the container text on
//! every mutation is cheap and avoids reassembling fragmented diffs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::locate::SubtitleHandle;
use crate::page::Page;

/// Disconnect guard for an active observation. `disconnect` is
/// idempotent and safe after the container has left the document;
/// dropping the guard disconnects as well.
pub struct ObserverHandle {
    stopped: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl ObserverHandle {
    pub fn disconnect(&mut self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            if let Some(task) = self.task.take() {
                task.abort();
            }
        }
    }

    pub fn is_disconnected(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl Drop for ObserverHandle {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Stream of text snapshots from an observed container. Ends when the
/// container is detached or the observation is disconnected.
pub struct TextStream {
    rx: mpsc::Receiver<String>,
    guard: ObserverHandle,
}

impl TextStream {
    /// Next snapshot, or `None` once the stream has ended
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Stop observing. Idempotent.
    pub fn disconnect(&mut self) {
        self.guard.disconnect();
    }
}

const SNAPSHOT_CHANNEL_CAPACITY: usize = 16;

/// Observe subtree mutations under `handle` and stream non-empty trimmed
/// text snapshots. The stream is primed with the container's current
/// text — the locator only returns containers that already show a
/// caption, and that caption must not wait for the next mutation. The
/// subscription is taken before the task starts, so mutations racing
/// the call are not lost either.
pub fn observe(page: &Page, handle: &SubtitleHandle) -> TextStream {
    let mut mutations = page.subscribe();
    let (tx, rx) = mpsc::channel(SNAPSHOT_CHANNEL_CAPACITY);
    let stopped = Arc::new(AtomicBool::new(false));

    let page = page.clone();
    let container = handle.node;
    let task = tokio::spawn(async move {
        if let Some(text) = page.text_content(container) {
            let trimmed = text.trim();
            if !trimmed.is_empty() && tx.send(trimmed.to_string()).await.is_err() {
                return;
            }
        }

        loop {
            let relevant = match mutations.recv().await {
                Ok(record) => page.contains(container, record.target),
                // Overrun: records were dropped, but a fresh snapshot
                // carries everything we need.
                Err(RecvError::Lagged(_)) => true,
                Err(RecvError::Closed) => break,
            };

            if !page.is_attached(container) {
                break;
            }
            if !relevant {
                continue;
            }

            let Some(text) = page.text_content(container) else {
                break;
            };
            let trimmed = text.trim();
            if trimmed.is_empty() {
                continue;
            }
            if tx.send(trimmed.to_string()).await.is_err() {
                break;
            }
        }
    });

    TextStream {
        rx,
        guard: ObserverHandle {
            stopped,
            task: Some(task),
        },
    }
}
