// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// folio-pipeline — Turns a rasterized document into a `DocumentResult`.
//
// Pages are independent: the converter runs them one after another or deals
// them to a worker pool whose jobs are tracked in an owned registry, then
// puts the results back in page order before export.

pub mod buffer;
pub mod convert;
pub mod pool;
pub mod processor;
pub mod registry;

pub use buffer::{PageBuffer, sha256_hex};
pub use convert::{ConversionOutput, Converter, PageDigest};
pub use pool::WorkerPool;
pub use processor::{PageOutcome, PageProcessor, ProcessedPage};
pub use registry::{JobId, JobRegistry};
