// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Node builder — turns a classified page into reflow nodes in emission order.

use folio_core::config::{ReflowConfig, TableConfig};
use folio_core::{NodeKind, PageResult, ReflowNode, ZoneKind};
use tracing::{debug, instrument};

use crate::reflow::{Paragraph, reflow_paragraphs};
use crate::table::{extract, is_tabular};

const BULLETS: &[char] = &[
    '-', '–', '—', '•', '·', '*', '○', '▪', '◦', '▸', '►', '■', '●', '□', '◆', '◇', '▶', '➤',
];

/// Build the page's nodes: table-candidate zones that pass the tabularity
/// test become one `Table` node each, every other zone is reflowed into
/// headings, list items and paragraphs.
#[instrument(skip_all, fields(page = page.page_number, zones = page.zones.len()))]
pub fn build_nodes(page: &PageResult, table: &TableConfig, reflow: &ReflowConfig) -> Vec<ReflowNode> {
    let median = median_block_height(page);
    let mut nodes = Vec::new();

    for zone in &page.zones {
        if zone.kind == ZoneKind::Generic && is_tabular(zone, table) {
            nodes.push(ReflowNode::table(extract(zone, table), page.page_number));
            continue;
        }
        for paragraph in reflow_paragraphs(&zone.blocks, reflow) {
            if paragraph.text.is_empty() {
                continue;
            }
            let kind = classify_paragraph(&paragraph, median, reflow);
            nodes.push(ReflowNode::text(kind, paragraph.text, page.page_number));
        }
    }

    debug!(nodes = nodes.len(), median_height = median, "Nodes built");
    nodes
}

fn classify_paragraph(paragraph: &Paragraph, median_height: f32, config: &ReflowConfig) -> NodeKind {
    if starts_with_list_marker(&paragraph.text) {
        NodeKind::ListItem
    } else if paragraph.lines == 1
        && median_height > 0.0
        && paragraph.line_height >= median_height * config.heading_height_ratio
        && paragraph.text.chars().count() <= config.heading_max_chars
    {
        NodeKind::Heading
    } else {
        NodeKind::Paragraph
    }
}

fn median_block_height(page: &PageResult) -> f32 {
    let mut heights: Vec<f32> = page.blocks().map(|b| b.height).collect();
    if heights.is_empty() {
        return 0.0;
    }
    heights.sort_by(f32::total_cmp);
    heights[heights.len() / 2]
}

/// Bullet glyphs, `1.` / `12)` enumerations and `a.` / `B)` letter markers,
/// each followed by whitespace.
fn starts_with_list_marker(text: &str) -> bool {
    let Some((marker, rest)) = text.split_once(char::is_whitespace) else {
        return false;
    };
    if rest.trim().is_empty() {
        return false;
    }
    if marker.chars().count() == 1 && marker.starts_with(BULLETS) {
        return true;
    }
    let Some(body) = marker.strip_suffix(['.', ')']) else {
        return false;
    };
    let is_number = !body.is_empty() && body.len() <= 3 && body.chars().all(|c| c.is_ascii_digit());
    let is_letter = body.chars().count() == 1 && body.chars().all(|c| c.is_ascii_alphabetic());
    is_number || is_letter
}
