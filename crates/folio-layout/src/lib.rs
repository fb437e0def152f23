// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// folio-layout — Geometric layout reconstruction over recognised text blocks.
//
// Partitions a page into header, footer, column and table-candidate zones,
// extracts table grids, and regroups running text into paragraphs, headings
// and list items. Pure computation: no I/O, no shared state.

pub mod nodes;
pub mod reflow;
pub mod table;
pub mod zones;

pub use nodes::build_nodes;
pub use reflow::{Paragraph, reflow, reflow_paragraphs};
pub use table::{cluster_rows, extract, is_tabular, reading_order};
pub use zones::ZoneClassifier;
