// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — reading scanned PDFs and writing searchable ones.

pub mod reader;
pub mod writer;

pub use reader::EmbeddedImageRasterizer;
pub use writer::{ContainerWriter, SearchablePdfWriter};
