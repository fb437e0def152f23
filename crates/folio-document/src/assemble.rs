// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document assembler — turns a recognised page into a container-neutral page
// artifact: a background layer, an invisible text overlay and vector
// primitives, all positioned in output space through `PageSpace::to_output`.

use folio_core::config::{AssemblyConfig, BackgroundMode, MrcConfig};
use folio_core::{GraphicElement, GraphicKind, PageResult, PageSpace, Rect, TextBlock};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::mrc::MrcLayers;
use crate::scrub::PreparedRaster;

/// Average Helvetica glyph advance as a fraction of the font size.
const HELVETICA_AVG_ADVANCE: f32 = 0.5;

/// Stroke treatment for vector primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrokeStyle {
    Rule,
    Border,
    Signature,
    Redaction,
}

impl StrokeStyle {
    /// RGB stroke/fill colour in 0..=1.
    pub fn color(&self) -> [f32; 3] {
        match self {
            Self::Rule | Self::Border | Self::Redaction => [0.0, 0.0, 0.0],
            Self::Signature => [0.1, 0.2, 0.6],
        }
    }

    pub fn width_pt(&self) -> f32 {
        match self {
            Self::Rule => 0.75,
            Self::Border => 0.5,
            Self::Signature => 1.0,
            Self::Redaction => 0.0,
        }
    }
}

/// A vector mark in output space (points, origin bottom-left).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum VectorPrimitive {
    Line {
        from: (f32, f32),
        to: (f32, f32),
        style: StrokeStyle,
    },
    Rect {
        rect: Rect,
        style: StrokeStyle,
        filled: bool,
    },
}

/// One invisible text run. `(x, y)` is the baseline origin in points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextPlacement {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub font_size_pt: f32,
    /// Percent; 100 is the font's natural width.
    pub horizontal_scale: f32,
}

#[derive(Debug, Clone)]
pub enum BackgroundLayer {
    Single(RgbImage),
    Mrc(MrcLayers),
}

/// Everything a container writer needs to emit one page.
#[derive(Debug, Clone)]
pub struct PageArtifact {
    pub page_number: u32,
    pub page_space: PageSpace,
    pub background: BackgroundLayer,
    pub text: Vec<TextPlacement>,
    pub vectors: Vec<VectorPrimitive>,
}

pub struct DocumentAssembler {
    config: AssemblyConfig,
    mrc: MrcConfig,
}

impl DocumentAssembler {
    pub fn new(config: AssemblyConfig, mrc: MrcConfig) -> Self {
        Self { config, mrc }
    }

    /// Build the artifact for one page.
    ///
    /// `page`, `graphics` and `redacted` are in source-pixel space of
    /// `raster`; `dpi` is the raster's resolution.
    #[instrument(skip_all, fields(page = page.page_number, mode = ?self.config.background))]
    pub fn assemble(
        &self,
        page: &PageResult,
        graphics: &[GraphicElement],
        raster: &PreparedRaster,
        redacted: &[Rect],
        dpi: f32,
    ) -> PageArtifact {
        let space = PageSpace::from_raster(raster.width(), raster.height(), dpi);

        let background = match self.config.background {
            BackgroundMode::Single => BackgroundLayer::Single(raster.image().to_rgb8()),
            BackgroundMode::Mrc => BackgroundLayer::Mrc(MrcLayers::build(raster, &self.mrc)),
        };

        let text: Vec<TextPlacement> = page
            .blocks()
            .filter_map(|block| place_text(&space, block))
            .collect();

        let mut vectors = Vec::new();
        if self.config.redraw_graphics {
            vectors.extend(graphics.iter().filter_map(|g| vector_for(&space, g)));
        }
        if self.config.draw_redactions {
            vectors.extend(redacted.iter().map(|r| VectorPrimitive::Rect {
                rect: space.to_output(r),
                style: StrokeStyle::Redaction,
                filled: true,
            }));
        }

        debug!(
            text = text.len(),
            vectors = vectors.len(),
            width_pt = space.width_pt,
            height_pt = space.height_pt,
            "Page assembled"
        );

        PageArtifact {
            page_number: page.page_number,
            page_space: space,
            background,
            text,
            vectors,
        }
    }
}

impl Default for DocumentAssembler {
    fn default() -> Self {
        Self::new(AssemblyConfig::default(), MrcConfig::default())
    }
}

fn place_text(space: &PageSpace, block: &TextBlock) -> Option<TextPlacement> {
    let text = block.text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        return None;
    }
    let out = space.to_output(&block.rect());
    let font_size_pt = out.height;
    if font_size_pt <= 0.0 {
        return None;
    }
    let estimated = HELVETICA_AVG_ADVANCE * font_size_pt * text.chars().count() as f32;
    let horizontal_scale = if estimated > 0.0 && out.width > 0.0 {
        out.width / estimated * 100.0
    } else {
        100.0
    };
    Some(TextPlacement {
        text,
        x: out.x,
        y: out.y,
        font_size_pt,
        horizontal_scale,
    })
}

fn vector_for(space: &PageSpace, graphic: &GraphicElement) -> Option<VectorPrimitive> {
    let out = space.to_output(&graphic.rect());
    match graphic.kind {
        GraphicKind::HLine => {
            let y = out.y + out.height / 2.0;
            Some(VectorPrimitive::Line {
                from: (out.x, y),
                to: (out.right(), y),
                style: StrokeStyle::Rule,
            })
        }
        GraphicKind::VLine => {
            let x = out.center_x();
            Some(VectorPrimitive::Line {
                from: (x, out.y),
                to: (x, out.bottom()),
                style: StrokeStyle::Rule,
            })
        }
        GraphicKind::Rect => Some(VectorPrimitive::Rect {
            rect: out,
            style: StrokeStyle::Border,
            filled: false,
        }),
        GraphicKind::Signature => Some(VectorPrimitive::Rect {
            rect: out,
            style: StrokeStyle::Signature,
            filled: false,
        }),
        // Logos stay in the background raster.
        GraphicKind::Logo => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::{Zone, ZoneKind};
    use image::{DynamicImage, Rgb};

    fn raster(w: u32, h: u32) -> PreparedRaster {
        PreparedRaster::unscrubbed(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            w,
            h,
            Rgb([250, 250, 250]),
        )))
    }

    fn page_with(blocks: Vec<TextBlock>, w: f32, h: f32) -> PageResult {
        PageResult {
            zones: vec![Zone::new(ZoneKind::Column, blocks)],
            recognized: true,
            ..PageResult::unrecognized(1, w, h)
        }
    }

    #[test]
    fn text_placement_maps_back_to_its_source_block() {
        let block = TextBlock::new("Quarterly report", 300.0, 600.0, 960.0, 50.0, 0.9);
        let page = page_with(vec![block.clone()], 2550.0, 3300.0);
        let artifact = DocumentAssembler::default().assemble(&page, &[], &raster(2550, 3300), &[], 300.0);

        let placed = &artifact.text[0];
        assert!((placed.font_size_pt - 12.0).abs() < 1e-3);
        let out = Rect::new(placed.x, placed.y, 960.0 * 0.24, placed.font_size_pt);
        let back = artifact.page_space.to_source(&out);
        assert!((back.x - block.x).abs() < 1e-2);
        assert!((back.y - block.y).abs() < 1e-2);
    }

    #[test]
    fn horizontal_scale_stretches_estimate_to_block_width() {
        // 72 DPI: 1 px = 1 pt. "abcd" at 10 pt estimates 20 pt; block is 40 pt.
        let page = page_with(vec![TextBlock::new("abcd", 0.0, 0.0, 40.0, 10.0, 1.0)], 100.0, 100.0);
        let artifact = DocumentAssembler::default().assemble(&page, &[], &raster(100, 100), &[], 72.0);
        assert!((artifact.text[0].horizontal_scale - 200.0).abs() < 1e-3);
        assert_eq!(artifact.text[0].y, 90.0);
    }

    #[test]
    fn blank_blocks_are_not_placed() {
        let page = page_with(vec![TextBlock::new("   ", 0.0, 0.0, 40.0, 10.0, 1.0)], 100.0, 100.0);
        let artifact = DocumentAssembler::default().assemble(&page, &[], &raster(100, 100), &[], 72.0);
        assert!(artifact.text.is_empty());
    }

    #[test]
    fn graphics_and_redactions_share_the_output_transform() {
        let page = PageResult::unrecognized(1, 100.0, 100.0);
        let graphics = [
            GraphicElement::new(GraphicKind::HLine, 10.0, 20.0, 80.0, 2.0),
            GraphicElement::new(GraphicKind::Signature, 10.0, 70.0, 30.0, 10.0),
            GraphicElement::new(GraphicKind::Logo, 0.0, 0.0, 10.0, 10.0),
        ];
        let redacted = [Rect::new(50.0, 40.0, 20.0, 10.0)];
        let artifact =
            DocumentAssembler::default().assemble(&page, &graphics, &raster(100, 100), &redacted, 72.0);

        assert_eq!(
            artifact.vectors,
            vec![
                VectorPrimitive::Line {
                    from: (10.0, 79.0),
                    to: (90.0, 79.0),
                    style: StrokeStyle::Rule,
                },
                VectorPrimitive::Rect {
                    rect: Rect::new(10.0, 20.0, 30.0, 10.0),
                    style: StrokeStyle::Signature,
                    filled: false,
                },
                VectorPrimitive::Rect {
                    rect: Rect::new(50.0, 50.0, 20.0, 10.0),
                    style: StrokeStyle::Redaction,
                    filled: true,
                },
            ]
        );
        assert_ne!(StrokeStyle::Signature.color(), StrokeStyle::Rule.color());
    }

    #[test]
    fn graphics_can_be_left_in_the_raster() {
        let config = AssemblyConfig {
            redraw_graphics: false,
            draw_redactions: false,
            ..AssemblyConfig::default()
        };
        let graphics = [GraphicElement::new(GraphicKind::Rect, 1.0, 1.0, 5.0, 5.0)];
        let artifact = DocumentAssembler::new(config, MrcConfig::default()).assemble(
            &PageResult::unrecognized(1, 10.0, 10.0),
            &graphics,
            &raster(10, 10),
            &[Rect::new(0.0, 0.0, 2.0, 2.0)],
            72.0,
        );
        assert!(artifact.vectors.is_empty());
    }

    #[test]
    fn mrc_mode_produces_two_layers() {
        let config = AssemblyConfig {
            background: BackgroundMode::Mrc,
            ..AssemblyConfig::default()
        };
        let artifact = DocumentAssembler::new(config, MrcConfig::default()).assemble(
            &PageResult::unrecognized(1, 90.0, 60.0),
            &[],
            &raster(90, 60),
            &[],
            300.0,
        );
        match artifact.background {
            BackgroundLayer::Mrc(layers) => {
                assert_eq!(layers.background.dimensions(), (30, 20));
                assert_eq!(layers.mask.dimensions(), (90, 60));
            }
            BackgroundLayer::Single(_) => panic!("expected MRC layers"),
        }
    }
}
