//! Run progress counters and the periodic metadata snapshot.
//!
//! While a run is in flight a reporter thread uploads a small JSON document
//! describing how far along it is, so a remote reader can tell a finished
//! sync from one that is still going (or died half way).

use crate::backend::{ObjectBody, StorageBackend};
use crate::config::MetadataConfig;
use chrono::Utc;
use crossbeam_channel::{RecvTimeoutError, Sender, bounded};
use serde::{Deserialize, Serialize};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use tracing::{Dispatch, debug, warn};

const TIMESTAMP_FORMAT: &str = "%A %B %d, %Y %H:%M:%S";

/// Lock-free counters shared by the planner and the workers.
#[derive(Debug, Default)]
pub struct Progress {
    discovered_files: AtomicU64,
    discovered_bytes: AtomicU64,
    settled_files: AtomicU64,
    settled_bytes: AtomicU64,
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a file entering the upload queue.
    pub fn discover(&self, bytes: u64) {
        self.discovered_files.fetch_add(1, Ordering::Relaxed);
        self.discovered_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Records a file that no longer needs uploading (uploaded or skipped).
    pub fn settle(&self, bytes: u64) {
        self.settled_files.fetch_add(1, Ordering::Relaxed);
        self.settled_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetadataSnapshot {
        let discovered_files = self.discovered_files.load(Ordering::Relaxed);
        let discovered_bytes = self.discovered_bytes.load(Ordering::Relaxed);
        let settled_files = self.settled_files.load(Ordering::Relaxed);
        let settled_bytes = self.settled_bytes.load(Ordering::Relaxed);

        MetadataSnapshot {
            timestamp: Utc::now().format(TIMESTAMP_FORMAT).to_string(),
            objects_uploaded: settled_files,
            objects_pending: discovered_files.saturating_sub(settled_files),
            size_uploaded: settled_bytes,
            size_pending: discovered_bytes.saturating_sub(settled_bytes),
        }
    }
}

/// Progress document written to the bucket. Failed files stay pending.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataSnapshot {
    pub timestamp: String,
    pub objects_uploaded: u64,
    pub objects_pending: u64,
    pub size_uploaded: u64,
    pub size_pending: u64,
}

/// Uploads the current snapshot. Failures are logged, never returned.
pub fn publish_snapshot(backend: &dyn StorageBackend, progress: &Progress, key: &str) {
    let snapshot = progress.snapshot();
    let bytes = match serde_json::to_vec_pretty(&snapshot) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("failed to serialize metadata snapshot: {e}");
            return;
        }
    };

    match backend.put(key, ObjectBody::from_bytes(bytes)) {
        Ok(()) => debug!(
            key,
            uploaded = snapshot.objects_uploaded,
            pending = snapshot.objects_pending,
            "published metadata snapshot"
        ),
        Err(e) => warn!(key, "failed to publish metadata snapshot: {e}"),
    }
}

/// Decides whether the reporter may write to `key`.
///
/// The key is free when nothing is stored there, when it holds a snapshot
/// from an earlier run, or when `overwrite` is set. Anything else is someone
/// else's object and stays untouched. A failed lookup counts as taken.
pub fn snapshot_key_writable(backend: &dyn StorageBackend, key: &str, overwrite: bool) -> bool {
    if overwrite {
        return true;
    }
    match backend.get(key) {
        Ok(None) => true,
        Ok(Some(existing)) => {
            let previous = serde_json::from_slice::<MetadataSnapshot>(&existing).is_ok();
            if !previous {
                warn!(key, "object exists and is not a progress snapshot, not publishing metadata");
            }
            previous
        }
        Err(e) => {
            warn!(key, "cannot check metadata key, not publishing metadata: {e}");
            false
        }
    }
}

/// Background thread publishing a snapshot every interval.
pub struct MetadataReporter {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
    backend: Arc<dyn StorageBackend>,
    progress: Arc<Progress>,
    key: String,
}

impl MetadataReporter {
    pub fn spawn(
        backend: Arc<dyn StorageBackend>,
        progress: Arc<Progress>,
        config: &MetadataConfig,
        dispatch: Dispatch,
    ) -> io::Result<Self> {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let interval = config.interval();
        let key = config.filename.clone();

        let handle = {
            let backend = Arc::clone(&backend);
            let progress = Arc::clone(&progress);
            let key = key.clone();
            thread::Builder::new()
                .name("bucketsync-metadata".into())
                .spawn(move || {
                    tracing::dispatcher::with_default(&dispatch, || {
                        loop {
                            match stop_rx.recv_timeout(interval) {
                                Err(RecvTimeoutError::Timeout) => {
                                    publish_snapshot(backend.as_ref(), &progress, &key)
                                }
                                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                            }
                        }
                    })
                })?
        };

        Ok(Self {
            stop_tx,
            handle,
            backend,
            progress,
            key,
        })
    }

    /// Stops the timer and publishes the final snapshot.
    pub fn finish(self) {
        let _ = self.stop_tx.send(());
        if self.handle.join().is_err() {
            warn!("metadata reporter thread panicked");
        }
        publish_snapshot(self.backend.as_ref(), &self.progress, &self.key);
    }
}
