// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job registry — pending page jobs keyed by id, each waiting on a one-shot
// reply. Owned by a worker pool and dropped with it.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::processor::PageOutcome;

/// Monotonically issued job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(pub u64);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

#[derive(Debug, Default)]
pub struct JobRegistry {
    next: AtomicU64,
    pending: Mutex<HashMap<JobId, oneshot::Sender<PageOutcome>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh id and the receiver its outcome will arrive on.
    pub fn register(&self) -> (JobId, oneshot::Receiver<PageOutcome>) {
        let id = JobId(self.next.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = oneshot::channel();
        if let Ok(mut pending) = self.pending.lock() {
            pending.insert(id, tx);
        }
        (id, rx)
    }

    /// Deliver `outcome` and forget the job. Returns false when the job was
    /// abandoned or its receiver has gone away.
    pub fn resolve(&self, id: JobId, outcome: PageOutcome) -> bool {
        let sender = self.pending.lock().ok().and_then(|mut p| p.remove(&id));
        match sender {
            Some(tx) => {
                let delivered = tx.send(outcome).is_ok();
                if !delivered {
                    debug!(%id, "Receiver dropped before job resolved");
                }
                delivered
            }
            None => {
                debug!(%id, "Resolved job is no longer registered");
                false
            }
        }
    }

    /// Best-effort cancel: the waiter is released with an error, but a worker
    /// already running the job finishes and its result is discarded.
    pub fn abandon(&self, id: JobId) -> bool {
        let removed = self
            .pending
            .lock()
            .ok()
            .and_then(|mut p| p.remove(&id))
            .is_some();
        if removed {
            warn!(%id, "Job abandoned");
        }
        removed
    }

    pub fn pending(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolve_delivers_once_and_clears() {
        let registry = JobRegistry::new();
        let (id, rx) = registry.register();
        assert_eq!(registry.pending(), 1);

        assert!(registry.resolve(id, PageOutcome::failed(1, "boom")));
        assert_eq!(registry.pending(), 0);
        assert_eq!(rx.await.expect("outcome").page_number(), 1);

        assert!(!registry.resolve(id, PageOutcome::failed(1, "again")));
    }

    #[tokio::test]
    async fn abandoned_job_releases_waiter_and_drops_late_result() {
        let registry = JobRegistry::new();
        let (id, rx) = registry.register();
        assert!(registry.abandon(id));
        assert!(rx.await.is_err());
        assert!(!registry.resolve(id, PageOutcome::failed(1, "late")));
        assert!(!registry.abandon(id));
    }

    #[test]
    fn ids_are_monotonic() {
        let registry = JobRegistry::new();
        let (a, _) = registry.register();
        let (b, _) = registry.register();
        let (c, _) = registry.register();
        assert!(a < b && b < c);
        assert_eq!(c.to_string(), "job-2");
    }
}
