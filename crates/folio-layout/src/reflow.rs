// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Reflow grouper — merges sequential blocks into paragraphs.
//
// A paragraph break shows up as vertical whitespace noticeably larger than
// the current line height. The threshold is a multiple of the previous
// block's height, so it holds across font sizes within one document.
//
// Boundary: a gap of exactly `paragraph_gap_ratio * line_height` does NOT
// break; the gap must be strictly greater.

use folio_core::config::ReflowConfig;
use folio_core::{Rect, TextBlock};

/// A regrouped paragraph and the geometry it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    pub text: String,
    /// Rectangle enclosing every contributing block.
    pub bounds: Rect,
    /// Tallest contributing block height, in pixels.
    pub line_height: f32,
    /// Number of visual lines the paragraph spans.
    pub lines: usize,
}

#[derive(Default)]
struct Buffer {
    parts: Vec<String>,
    rects: Vec<Rect>,
    line_height: f32,
    lines: usize,
    line_top: f32,
}

impl Buffer {
    fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    fn push(&mut self, block: &TextBlock) {
        if self.rects.is_empty() || block.y > self.line_top + self.line_height / 2.0 {
            self.lines += 1;
            self.line_top = block.y;
        }
        let text = block.text.trim();
        if !text.is_empty() {
            self.parts.push(text.to_string());
        }
        self.rects.push(block.rect());
        self.line_height = self.line_height.max(block.height);
    }

    fn flush(&mut self) -> Option<Paragraph> {
        let taken = std::mem::take(self);
        let bounds = Rect::enclosing(taken.rects)?;
        Some(Paragraph {
            text: taken.parts.join(" "),
            bounds,
            line_height: taken.line_height,
            lines: taken.lines,
        })
    }
}

/// Group blocks (already in reading order) into paragraphs with geometry.
pub fn reflow_paragraphs(blocks: &[TextBlock], config: &ReflowConfig) -> Vec<Paragraph> {
    let mut paragraphs = Vec::new();
    let mut buffer = Buffer::default();
    let mut last_y = 0.0f32;
    let mut last_height = 0.0f32;

    for block in blocks {
        let gap = block.y - (last_y + last_height);
        if !buffer.is_empty() && gap > last_height * config.paragraph_gap_ratio {
            paragraphs.extend(buffer.flush());
        }
        buffer.push(block);
        last_y = block.y;
        last_height = block.height;
    }
    paragraphs.extend(buffer.flush());

    paragraphs
}

/// Group blocks (already in reading order) into paragraph strings.
pub fn reflow(blocks: &[TextBlock], config: &ReflowConfig) -> Vec<String> {
    reflow_paragraphs(blocks, config)
        .into_iter()
        .map(|p| p.text)
        .collect()
}
