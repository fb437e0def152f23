// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Folio layout pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::Rect;

/// Unique identifier for one document conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversionId(pub Uuid);

impl ConversionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConversionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A fragment of recognised text in image-pixel space (origin top-left).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Recognition certainty, 0.0..=1.0.
    pub confidence: f32,
}

impl TextBlock {
    pub fn new(
        text: impl Into<String>,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        confidence: f32,
    ) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            width,
            height,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// Kinds of non-text marks reported by the recognition adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GraphicKind {
    /// Horizontal rule.
    HLine,
    /// Vertical rule.
    VLine,
    /// Border or box.
    Rect,
    Logo,
    /// Signature box.
    Signature,
}

/// A vector-like mark on the page, same coordinate space as [`TextBlock`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GraphicElement {
    pub kind: GraphicKind,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl GraphicElement {
    pub fn new(kind: GraphicKind, x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            kind,
            x,
            y,
            width,
            height,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// Everything the recognition adapter reports for one page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recognition {
    pub blocks: Vec<TextBlock>,
    pub graphics: Vec<GraphicElement>,
}

impl Recognition {
    pub fn new(blocks: Vec<TextBlock>, graphics: Vec<GraphicElement>) -> Self {
        Self { blocks, graphics }
    }

    /// Arithmetic mean of block confidences; an empty set scores 0.
    pub fn mean_confidence(&self) -> f32 {
        let sum: f32 = self.blocks.iter().map(|b| b.confidence).sum();
        sum / self.blocks.len().max(1) as f32
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty() && self.graphics.is_empty()
    }

    /// Multiply every coordinate by `factor`; used to map results from an
    /// upscaled raster back onto the source raster.
    pub fn scaled(self, factor: f32) -> Self {
        let blocks = self
            .blocks
            .into_iter()
            .map(|b| {
                let r = b.rect().scale(factor);
                TextBlock {
                    x: r.x,
                    y: r.y,
                    width: r.width,
                    height: r.height,
                    ..b
                }
            })
            .collect();
        let graphics = self
            .graphics
            .into_iter()
            .map(|g| {
                let r = g.rect().scale(factor);
                GraphicElement::new(g.kind, r.x, r.y, r.width, r.height)
            })
            .collect();
        Self { blocks, graphics }
    }
}

/// Named preprocessing presets the recognition adapter understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PreprocessProfile {
    /// High-contrast, adaptively thresholded black-and-white.
    Binarized,
    /// Softer grayscale that keeps faint strokes.
    Nuanced,
}

impl PreprocessProfile {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Binarized => "binarized",
            Self::Nuanced => "nuanced",
        }
    }
}

impl std::fmt::Display for PreprocessProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Classified spatial region kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZoneKind {
    Header,
    Footer,
    Column,
    /// Table candidate; checked for tabularity before extraction.
    Generic,
}

/// A classified region of a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub kind: ZoneKind,
    /// Blocks in reading order.
    pub blocks: Vec<TextBlock>,
    /// Minimal rectangle enclosing `blocks`.
    pub bounds: Rect,
}

impl Zone {
    /// Build a zone whose bounds enclose `blocks`.
    pub fn new(kind: ZoneKind, blocks: Vec<TextBlock>) -> Self {
        let bounds = Rect::enclosing(blocks.iter().map(TextBlock::rect)).unwrap_or_default();
        Self {
            kind,
            blocks,
            bounds,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Structural role of a reflowed node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Heading,
    Paragraph,
    Table,
    ListItem,
}

/// Payload of a reflowed node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeContent {
    Text(String),
    Grid(Vec<Vec<String>>),
}

/// One semantic unit of reflowed output, in emission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReflowNode {
    pub kind: NodeKind,
    pub content: NodeContent,
    pub page_number: u32,
}

impl ReflowNode {
    pub fn text(kind: NodeKind, text: impl Into<String>, page_number: u32) -> Self {
        Self {
            kind,
            content: NodeContent::Text(text.into()),
            page_number,
        }
    }

    pub fn table(rows: Vec<Vec<String>>, page_number: u32) -> Self {
        Self {
            kind: NodeKind::Table,
            content: NodeContent::Grid(rows),
            page_number,
        }
    }
}

/// The canonical per-page spatial model. Every export of a page derives from
/// the same `PageResult`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    /// 1-indexed page number.
    pub page_number: u32,
    /// Raster width in pixels.
    pub width: f32,
    /// Raster height in pixels.
    pub height: f32,
    pub zones: Vec<Zone>,
    /// False when every recognition pass failed.
    pub recognized: bool,
    /// Profile whose result was kept, if any.
    pub profile: Option<PreprocessProfile>,
    pub mean_confidence: f32,
}

impl PageResult {
    /// A page with no recognised content.
    pub fn unrecognized(page_number: u32, width: f32, height: f32) -> Self {
        Self {
            page_number,
            width,
            height,
            zones: Vec::new(),
            recognized: false,
            profile: None,
            mean_confidence: 0.0,
        }
    }

    /// Every block on the page, zone by zone.
    pub fn blocks(&self) -> impl Iterator<Item = &TextBlock> {
        self.zones.iter().flat_map(|z| z.blocks.iter())
    }

    pub fn block_count(&self) -> usize {
        self.zones.iter().map(|z| z.blocks.len()).sum()
    }
}

/// A detected table and the page it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableGrid {
    pub page_number: u32,
    pub rows: Vec<Vec<String>>,
}

/// Diagnostic pairing of recognised text and its confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceEntry {
    pub text: String,
    pub confidence: f32,
}

/// A page that could not be processed at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageFailure {
    pub page_number: u32,
    pub reason: String,
}

/// Aggregate result of converting one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentResult {
    pub id: ConversionId,
    /// Successful pages, ordered by page number.
    pub pages: Vec<PageResult>,
    /// Flattened reading-order text.
    pub text: String,
    pub tables: Option<Vec<TableGrid>>,
    pub confidence_map: Option<Vec<ConfidenceEntry>>,
    /// Pages that failed to decode, ordered by page number.
    pub failed_pages: Vec<PageFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl DocumentResult {
    /// Page numbers that decoded but where every recognition pass failed.
    pub fn unrecognized_pages(&self) -> Vec<u32> {
        self.pages
            .iter()
            .filter(|p| !p.recognized)
            .map(|p| p.page_number)
            .collect()
    }

    /// True when at least one page failed or was unrecognised.
    pub fn is_partial(&self) -> bool {
        !self.failed_pages.is_empty() || self.pages.iter().any(|p| !p.recognized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_confidence_of_empty_recognition_is_zero() {
        assert_eq!(Recognition::default().mean_confidence(), 0.0);
    }

    #[test]
    fn mean_confidence_is_arithmetic_mean() {
        let rec = Recognition::new(
            vec![
                TextBlock::new("a", 0.0, 0.0, 1.0, 1.0, 0.5),
                TextBlock::new("b", 0.0, 0.0, 1.0, 1.0, 1.0),
            ],
            Vec::new(),
        );
        assert!((rec.mean_confidence() - 0.75).abs() < 1e-6);
    }

    #[test]
    fn scaled_recognition_keeps_text_and_confidence() {
        let rec = Recognition::new(
            vec![TextBlock::new("total", 200.0, 100.0, 80.0, 24.0, 0.8)],
            vec![GraphicElement::new(GraphicKind::HLine, 0.0, 400.0, 1000.0, 4.0)],
        )
        .scaled(0.5);
        assert_eq!(rec.blocks[0].rect(), Rect::new(100.0, 50.0, 40.0, 12.0));
        assert_eq!(rec.blocks[0].text, "total");
        assert_eq!(rec.blocks[0].confidence, 0.8);
        assert_eq!(rec.graphics[0].rect(), Rect::new(0.0, 200.0, 500.0, 2.0));
    }

    #[test]
    fn confidence_is_clamped() {
        assert_eq!(TextBlock::new("x", 0.0, 0.0, 1.0, 1.0, 93.0).confidence, 1.0);
        assert_eq!(TextBlock::new("x", 0.0, 0.0, 1.0, 1.0, -1.0).confidence, 0.0);
    }

    #[test]
    fn zone_bounds_enclose_blocks() {
        let zone = Zone::new(
            ZoneKind::Column,
            vec![
                TextBlock::new("a", 10.0, 10.0, 50.0, 12.0, 0.9),
                TextBlock::new("b", 5.0, 40.0, 20.0, 12.0, 0.9),
            ],
        );
        assert_eq!(zone.bounds, Rect::new(5.0, 10.0, 55.0, 42.0));
    }

    #[test]
    fn node_content_serializes_untagged() {
        let node = ReflowNode::text(NodeKind::Heading, "Invoice", 1);
        let json = serde_json::to_value(&node).expect("serialize");
        assert_eq!(json["content"], "Invoice");
        assert_eq!(json["kind"], "Heading");
    }
}
