// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Table extraction — row clustering over block positions, the tabularity
// test, and grid extraction for a single table-candidate zone.
//
// A grid of cells shows several side-by-side fragments per row, whereas
// single-column prose usually holds one block per row. Nothing here merges
// columns across separate zones; each call sees exactly one zone.

use std::cmp::Ordering;
use std::collections::HashSet;

use folio_core::config::TableConfig;
use folio_core::{TextBlock, Zone};
use tracing::debug;

/// Order blocks by `(y, x)`. Stable, so identical positions keep input order.
fn by_position(a: &TextBlock, b: &TextBlock) -> Ordering {
    a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x))
}

/// Group blocks into visual rows.
///
/// Blocks are sorted by `(y, x)`. Walking in that order, a block whose `y`
/// lies more than `row_gap_px` below the first block of the current row
/// starts a new row. Each row is then sorted by `x`.
///
/// Re-clustering the flattened output yields the same rows.
pub fn cluster_rows(blocks: &[TextBlock], row_gap_px: f32) -> Vec<Vec<TextBlock>> {
    let mut sorted: Vec<TextBlock> = blocks.to_vec();
    sorted.sort_by(by_position);

    let mut rows: Vec<Vec<TextBlock>> = Vec::new();
    let mut current: Vec<TextBlock> = Vec::new();
    let mut row_top = f32::NEG_INFINITY;

    for block in sorted {
        if !current.is_empty() && block.y - row_top > row_gap_px {
            rows.push(std::mem::take(&mut current));
        }
        if current.is_empty() {
            row_top = block.y;
        }
        current.push(block);
    }
    if !current.is_empty() {
        rows.push(current);
    }

    for row in &mut rows {
        row.sort_by(|a, b| a.x.total_cmp(&b.x));
    }
    rows
}

/// Blocks in reading order: top-to-bottom by row, left-to-right within a row.
pub fn reading_order(blocks: &[TextBlock], config: &TableConfig) -> Vec<TextBlock> {
    cluster_rows(blocks, config.row_gap_px)
        .into_iter()
        .flatten()
        .collect()
}

/// Number of distinct `row_bin_px` bins the blocks' `y` values fall into.
fn unique_row_count(blocks: &[TextBlock], row_bin_px: f32) -> usize {
    blocks
        .iter()
        .map(|b| (b.y / row_bin_px).round() as i64)
        .collect::<HashSet<_>>()
        .len()
}

/// Whether the zone's blocks form a grid rather than flowing prose.
///
/// True iff `block_count > unique_rows * tabular_ratio`. An empty zone is
/// never tabular. For a fixed row count the result is monotonic in the block
/// count.
pub fn is_tabular(zone: &Zone, config: &TableConfig) -> bool {
    if zone.blocks.is_empty() {
        return false;
    }
    let rows = unique_row_count(&zone.blocks, config.row_bin_px);
    let tabular = zone.blocks.len() as f32 > rows as f32 * config.tabular_ratio;
    debug!(
        blocks = zone.blocks.len(),
        rows,
        ratio = config.tabular_ratio,
        tabular,
        "Tabularity test"
    );
    tabular
}

/// Extract the zone as a grid of cell strings, one inner vector per row.
///
/// Cells are trimmed and embedded line breaks become spaces.
pub fn extract(zone: &Zone, config: &TableConfig) -> Vec<Vec<String>> {
    let grid: Vec<Vec<String>> = cluster_rows(&zone.blocks, config.row_gap_px)
        .into_iter()
        .map(|row| row.iter().map(|b| clean_cell(&b.text)).collect())
        .collect();
    debug!(rows = grid.len(), "Table extracted");
    grid
}

fn clean_cell(text: &str) -> String {
    text.trim().replace("\r\n", " ").replace(['\n', '\r'], " ")
}
