// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Export formatter — flattened reading-order text, CSV for detected tables and
// the confidence diagnostics, all derived from the same `PageResult`s that
// feed the searchable PDF.

use std::path::{Path, PathBuf};

use csv::WriterBuilder;
use folio_core::config::{ExportConfig, FolioConfig, ReflowConfig, TableConfig};
use folio_core::error::{FolioError, Result};
use folio_core::{ConfidenceEntry, NodeContent, PageResult, ReflowNode, TableGrid};
use folio_layout::build_nodes;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Document-level export artifacts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportBundle {
    pub text: String,
    /// `None` when disabled or when no table was detected.
    pub tables: Option<Vec<TableGrid>>,
    pub confidence_map: Option<Vec<ConfidenceEntry>>,
}

pub struct ExportFormatter {
    config: ExportConfig,
    table: TableConfig,
    reflow: ReflowConfig,
}

impl ExportFormatter {
    pub fn new(config: ExportConfig, table: TableConfig, reflow: ReflowConfig) -> Self {
        Self {
            config,
            table,
            reflow,
        }
    }

    pub fn from_config(config: &FolioConfig) -> Self {
        Self::new(
            config.export.clone(),
            config.table.clone(),
            config.reflow.clone(),
        )
    }

    /// Reflowed nodes for one page.
    pub fn nodes(&self, page: &PageResult) -> Vec<ReflowNode> {
        build_nodes(page, &self.table, &self.reflow)
    }

    /// Produce every artifact from pages already ordered by page number.
    #[instrument(skip_all, fields(pages = pages.len()))]
    pub fn export(&self, pages: &[PageResult]) -> ExportBundle {
        let per_page: Vec<Vec<ReflowNode>> = pages.iter().map(|p| self.nodes(p)).collect();

        let text = per_page
            .iter()
            .map(|nodes| flatten(nodes))
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(&self.config.page_separator);

        let tables = if self.config.tables {
            let grids: Vec<TableGrid> = per_page.iter().flatten().filter_map(table_grid).collect();
            (!grids.is_empty()).then_some(grids)
        } else {
            None
        };

        let confidence_map = self.config.confidence_map.then(|| confidence_map(pages));

        info!(
            text_len = text.len(),
            tables = tables.as_ref().map_or(0, Vec::len),
            "Export complete"
        );
        ExportBundle {
            text,
            tables,
            confidence_map,
        }
    }
}

/// Nodes of one page as plain text: blocks separated by a blank line, table
/// cells by tabs.
pub fn flatten(nodes: &[ReflowNode]) -> String {
    nodes
        .iter()
        .map(|node| match &node.content {
            NodeContent::Text(text) => text.clone(),
            NodeContent::Grid(rows) => rows
                .iter()
                .map(|row| row.join("\t"))
                .collect::<Vec<_>>()
                .join("\n"),
        })
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn table_grid(node: &ReflowNode) -> Option<TableGrid> {
    match &node.content {
        NodeContent::Grid(rows) => Some(TableGrid {
            page_number: node.page_number,
            rows: rows.clone(),
        }),
        NodeContent::Text(_) => None,
    }
}

/// Every block's text and confidence, page by page in zone order.
pub fn confidence_map(pages: &[PageResult]) -> Vec<ConfidenceEntry> {
    pages
        .iter()
        .flat_map(|p| p.blocks())
        .map(|b| ConfidenceEntry {
            text: b.text.clone(),
            confidence: b.confidence,
        })
        .collect()
}

/// Confidence diagnostics as pretty-printed JSON.
pub fn confidence_json(entries: &[ConfidenceEntry]) -> Result<String> {
    Ok(serde_json::to_string_pretty(entries)?)
}

/// Serialise one grid as CSV. Ragged rows are written as-is.
pub fn table_to_csv(grid: &TableGrid) -> Result<String> {
    let mut writer = WriterBuilder::new().flexible(true).from_writer(Vec::new());
    for row in &grid.rows {
        writer
            .write_record(row)
            .map_err(|err| FolioError::Export(format!("failed to write CSV row: {}", err)))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| FolioError::Export(format!("failed to flush CSV: {}", err)))?;
    String::from_utf8(bytes)
        .map_err(|err| FolioError::Export(format!("CSV output is not UTF-8: {}", err)))
}

/// Write each grid to `dir` as `page-<n>-table-<k>.csv`; returns the paths.
#[instrument(skip(tables), fields(tables = tables.len(), dir = %dir.as_ref().display()))]
pub fn write_tables_csv(tables: &[TableGrid], dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    let mut paths = Vec::with_capacity(tables.len());
    let mut previous_page = None;
    let mut index_on_page = 0;
    for grid in tables {
        if previous_page == Some(grid.page_number) {
            index_on_page += 1;
        } else {
            previous_page = Some(grid.page_number);
            index_on_page = 1;
        }
        let path = dir.join(format!("page-{}-table-{}.csv", grid.page_number, index_on_page));
        std::fs::write(&path, table_to_csv(grid)?)?;
        debug!(path = %path.display(), rows = grid.rows.len(), "Table written");
        paths.push(path);
    }
    Ok(paths)
}
