// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Worker pool — N tokio tasks, each draining its own bounded queue and
// running page work on the blocking thread pool. Jobs are dealt round-robin
// by id; replies travel back through the pool's job registry.

use std::sync::Arc;

use folio_core::config::PoolConfig;
use folio_core::error::{FolioError, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::buffer::PageBuffer;
use crate::processor::{PageOutcome, PageProcessor};
use crate::registry::{JobId, JobRegistry};

struct Job {
    id: JobId,
    page_number: u32,
    buffer: PageBuffer,
    dpi: f32,
}

pub struct WorkerPool {
    senders: Vec<mpsc::Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    registry: Arc<JobRegistry>,
}

impl WorkerPool {
    /// Start the workers. Must be called inside a tokio runtime.
    #[instrument(skip_all, fields(workers = config.workers, queue_depth = config.queue_depth))]
    pub fn spawn(processor: Arc<PageProcessor>, config: &PoolConfig) -> Self {
        let registry = Arc::new(JobRegistry::new());
        let count = config.workers.max(1);
        let depth = config.queue_depth.max(1);

        let mut senders = Vec::with_capacity(count);
        let mut workers = Vec::with_capacity(count);
        for index in 0..count {
            let (tx, rx) = mpsc::channel(depth);
            senders.push(tx);
            workers.push(tokio::spawn(run_worker(
                index,
                rx,
                Arc::clone(&processor),
                Arc::clone(&registry),
            )));
        }
        info!(workers = count, "Worker pool started");
        Self {
            senders,
            workers,
            registry,
        }
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub fn worker_count(&self) -> usize {
        self.senders.len()
    }

    /// Queue a page. Waits while the target worker's queue is full.
    pub async fn submit(
        &self,
        page_number: u32,
        buffer: PageBuffer,
        dpi: f32,
    ) -> Result<(JobId, oneshot::Receiver<PageOutcome>)> {
        let (id, rx) = self.registry.register();
        let worker = (id.0 % self.senders.len() as u64) as usize;
        let job = Job {
            id,
            page_number,
            buffer,
            dpi,
        };
        if self.senders[worker].send(job).await.is_err() {
            self.registry.abandon(id);
            return Err(FolioError::PoolClosed);
        }
        debug!(%id, page_number, worker, "Job queued");
        Ok((id, rx))
    }

    /// Close the queues and wait for in-flight jobs to finish.
    pub async fn shutdown(self) {
        let Self {
            senders, workers, ..
        } = self;
        drop(senders);
        for handle in workers {
            if let Err(err) = handle.await {
                warn!(%err, "Worker task ended abnormally");
            }
        }
        info!("Worker pool stopped");
    }
}

async fn run_worker(
    index: usize,
    mut rx: mpsc::Receiver<Job>,
    processor: Arc<PageProcessor>,
    registry: Arc<JobRegistry>,
) {
    while let Some(job) = rx.recv().await {
        let Job {
            id,
            page_number,
            buffer,
            dpi,
        } = job;
        let processor = Arc::clone(&processor);
        let outcome = tokio::task::spawn_blocking(move || {
            processor.process_encoded(page_number, buffer.as_slice(), dpi)
        })
        .await
        .unwrap_or_else(|err| {
            warn!(%id, page_number, %err, "Page task panicked");
            PageOutcome::failed(page_number, format!("page task failed: {}", err))
        });
        registry.resolve(id, outcome);
    }
    debug!(worker = index, "Worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::tests::{StubAdapter, png};
    use folio_core::FolioConfig;

    fn pool(workers: usize) -> WorkerPool {
        let processor = Arc::new(PageProcessor::new(
            Arc::new(StubAdapter::echo_width()),
            &FolioConfig::default(),
        ));
        WorkerPool::spawn(
            processor,
            &PoolConfig {
                workers,
                queue_depth: 2,
                ..PoolConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn every_submitted_page_is_answered() {
        let pool = pool(3);
        assert_eq!(pool.worker_count(), 3);
        let mut receivers = Vec::new();
        for page in 1..=7u32 {
            let buffer = PageBuffer::Owned(png(20 + page, 20));
            receivers.push(pool.submit(page, buffer, 300.0).await.expect("submit"));
        }
        for (expected, (_, rx)) in (1..=7u32).zip(receivers) {
            let outcome = rx.await.expect("answered");
            assert_eq!(outcome.page_number(), expected);
            let PageOutcome::Done(page) = outcome else {
                panic!("page {expected} should process");
            };
            let text = &page.result.blocks().next().expect("block").text;
            assert_eq!(text, &format!("page width {}", 20 + expected));
        }
        assert_eq!(pool.registry().pending(), 0);
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn abandoned_job_result_is_dropped() {
        let pool = pool(1);
        let (id, rx) = pool
            .submit(1, PageBuffer::Owned(png(10, 10)), 300.0)
            .await
            .expect("submit");
        pool.registry().abandon(id);
        assert!(rx.await.is_err());
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn bad_page_is_reported_not_raised() {
        let pool = pool(2);
        let (_, rx) = pool
            .submit(9, PageBuffer::Owned(b"garbage".to_vec()), 300.0)
            .await
            .expect("submit");
        assert!(matches!(rx.await.expect("answered"), PageOutcome::Failed(f) if f.page_number == 9));
        pool.shutdown().await;
    }
}
