// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document conversion — drives every page of a rasterizer through the page
// processor, sequentially or across a worker pool, then re-sequences the
// results by page number and exports them.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use folio_core::error::{ErrorClass, FolioError, Result};
use folio_core::{ConversionId, DocumentResult, FolioConfig, PageFailure};
use folio_document::{
    ContainerWriter, ExportFormatter, PageArtifact, Rasterizer, RecognitionAdapter,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::buffer::{PageBuffer, sha256_hex};
use crate::pool::WorkerPool;
use crate::processor::{PageOutcome, PageProcessor};

/// SHA-256 of a page's encoded source bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageDigest {
    pub page_number: u32,
    pub sha256: String,
}

/// Everything one conversion produces.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    pub result: DocumentResult,
    /// Assembled pages, in the same order as `result.pages`.
    pub artifacts: Vec<PageArtifact>,
    /// Digests of every page that was read from the source, in page order.
    pub digests: Vec<PageDigest>,
}

impl ConversionOutput {
    /// Serialise the assembled pages with `writer`.
    pub fn write(&self, writer: &dyn ContainerWriter, title: &str) -> Result<Vec<u8>> {
        writer.write(&self.artifacts, title)
    }
}

pub struct Converter {
    config: FolioConfig,
    processor: Arc<PageProcessor>,
    exporter: ExportFormatter,
}

impl Converter {
    /// Validates `config` before anything runs.
    pub fn new(adapter: Arc<dyn RecognitionAdapter>, config: FolioConfig) -> Result<Self> {
        config.validate()?;
        let processor = Arc::new(PageProcessor::new(adapter, &config));
        let exporter = ExportFormatter::from_config(&config);
        Ok(Self {
            config,
            processor,
            exporter,
        })
    }

    pub fn config(&self) -> &FolioConfig {
        &self.config
    }

    /// Process every page on the calling thread.
    #[instrument(skip_all, fields(pages = source.page_count()))]
    pub fn convert(&self, source: &dyn Rasterizer) -> Result<ConversionOutput> {
        let started_at = Utc::now();
        let total = source.page_count();
        if total == 0 {
            return Err(FolioError::NoPages);
        }
        info!(pages = total, "Sequential conversion started");

        let dpi = self.config.assembly.default_dpi;
        let mut outcomes = Vec::with_capacity(total);
        let mut digests = Vec::with_capacity(total);
        for index in 0..total {
            let page_number = index as u32 + 1;
            match source.encoded_page(index, dpi) {
                Ok(encoded) => {
                    digests.push(PageDigest {
                        page_number,
                        sha256: sha256_hex(&encoded.bytes),
                    });
                    outcomes.push(self.processor.process_encoded(
                        page_number,
                        &encoded.bytes,
                        encoded.dpi,
                    ));
                }
                Err(err) => outcomes.push(page_failure(page_number, err)?),
            }
        }
        self.finish(outcomes, digests, total, started_at)
    }

    /// Shard pages over a fresh worker pool. Page order in the output matches
    /// the source regardless of completion order.
    #[instrument(skip_all, fields(pages = source.page_count(), workers = self.config.pool.workers))]
    pub async fn convert_concurrent(&self, source: &dyn Rasterizer) -> Result<ConversionOutput> {
        let started_at = Utc::now();
        let total = source.page_count();
        if total == 0 {
            return Err(FolioError::NoPages);
        }
        info!(pages = total, "Concurrent conversion started");

        let pool = WorkerPool::spawn(Arc::clone(&self.processor), &self.config.pool);
        let dpi = self.config.assembly.default_dpi;
        let threshold = self.config.pool.share_threshold_bytes;

        let mut outcomes = Vec::with_capacity(total);
        let mut digests = Vec::with_capacity(total);
        let mut waiting = Vec::with_capacity(total);
        for index in 0..total {
            let page_number = index as u32 + 1;
            let encoded = match source.encoded_page(index, dpi) {
                Ok(encoded) => encoded,
                Err(err) => {
                    outcomes.push(page_failure(page_number, err)?);
                    continue;
                }
            };

            // Two readers: the worker and the digest.
            let buffer = PageBuffer::prepare(encoded.bytes, 2, threshold);
            let sha256 = match buffer.share() {
                Some(handle) => {
                    let submitted = pool.submit(page_number, buffer, encoded.dpi).await;
                    waiting.push((page_number, submitted));
                    sha256_hex(handle.as_slice())
                }
                None => {
                    let sha256 = sha256_hex(buffer.as_slice());
                    let submitted = pool.submit(page_number, buffer, encoded.dpi).await;
                    waiting.push((page_number, submitted));
                    sha256
                }
            };
            digests.push(PageDigest {
                page_number,
                sha256,
            });
        }

        for (page_number, submitted) in waiting {
            let outcome = match submitted {
                Ok((id, rx)) => rx.await.unwrap_or_else(|_| {
                    PageOutcome::failed(page_number, FolioError::JobAbandoned(id.0).to_string())
                }),
                Err(err) => page_failure(page_number, err)?,
            };
            outcomes.push(outcome);
        }
        pool.shutdown().await;

        self.finish(outcomes, digests, total, started_at)
    }

    fn finish(
        &self,
        mut outcomes: Vec<PageOutcome>,
        digests: Vec<PageDigest>,
        total: usize,
        started_at: DateTime<Utc>,
    ) -> Result<ConversionOutput> {
        outcomes.sort_by_key(PageOutcome::page_number);

        let mut pages = Vec::with_capacity(outcomes.len());
        let mut artifacts = Vec::with_capacity(outcomes.len());
        let mut failed_pages: Vec<PageFailure> = Vec::new();
        for outcome in outcomes {
            match outcome {
                PageOutcome::Done(page) => {
                    let page = *page;
                    pages.push(page.result);
                    artifacts.push(page.artifact);
                }
                PageOutcome::Failed(failure) => failed_pages.push(failure),
            }
        }
        if pages.is_empty() {
            return Err(FolioError::AllPagesFailed(total));
        }

        let bundle = self.exporter.export(&pages);
        let result = DocumentResult {
            id: ConversionId::new(),
            pages,
            text: bundle.text,
            tables: bundle.tables,
            confidence_map: bundle.confidence_map,
            failed_pages,
            started_at,
            finished_at: Utc::now(),
        };
        debug!(
            pages = result.pages.len(),
            failed = result.failed_pages.len(),
            unrecognized = result.unrecognized_pages().len(),
            "Conversion finished"
        );
        info!(id = %result.id, partial = result.is_partial(), "Document converted");
        Ok(ConversionOutput {
            result,
            artifacts,
            digests,
        })
    }
}

/// Record a page-scoped error against its page; anything wider aborts the job.
fn page_failure(page_number: u32, err: FolioError) -> Result<PageOutcome> {
    match err.class() {
        ErrorClass::PerPage => {
            warn!(page_number, %err, "Page could not be read");
            Ok(PageOutcome::failed(page_number, err.to_string()))
        }
        ErrorClass::WholeJob | ErrorClass::Config => Err(err),
    }
}
