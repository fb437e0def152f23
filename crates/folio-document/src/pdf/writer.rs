// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer — emits searchable PDFs from assembled page artifacts using
// `printpdf` 0.8.
//
// printpdf 0.8 uses a data-oriented API: documents are built by constructing
// `PdfPage` structs containing `Vec<Op>` operation lists, then serialised via
// `PdfDocument::save()`. Each page is drawn as: background image(s), vector
// primitives, then the invisible text overlay (render mode 3).

use std::path::Path;

use folio_core::error::{FolioError, Result};
use image::RgbImage;
use printpdf::{
    BuiltinFont, Color, Line, LinePoint, Mm, Op, PaintMode, PdfDocument, PdfPage,
    PdfSaveOptions, PdfWarnMsg, Point, Polygon, PolygonRing, Pt, RawImage, RawImageData,
    RawImageFormat, Rgb, TextItem, TextRenderingMode, WindingOrder, XObjectTransform,
};
use tracing::{debug, info, instrument, warn};

use crate::assemble::{BackgroundLayer, PageArtifact, StrokeStyle, TextPlacement, VectorPrimitive};
use crate::mrc::MrcLayers;

const MM_PER_PT: f32 = 25.4 / 72.0;

/// Serialises assembled pages into a container format.
pub trait ContainerWriter: Send + Sync {
    fn write(&self, pages: &[PageArtifact], title: &str) -> Result<Vec<u8>>;
}

/// Image-over-text PDF: the page raster is visible, the recognised text is
/// selectable and searchable but not painted.
#[derive(Debug, Default, Clone, Copy)]
pub struct SearchablePdfWriter;

impl SearchablePdfWriter {
    pub fn new() -> Self {
        Self
    }

    /// Write the PDF straight to a file.
    pub fn write_to_file(
        &self,
        pages: &[PageArtifact],
        title: &str,
        path: impl AsRef<Path>,
    ) -> Result<()> {
        let bytes = self.write(pages, title)?;
        std::fs::write(path.as_ref(), &bytes)?;
        info!("Wrote searchable PDF to {}", path.as_ref().display());
        Ok(())
    }

    fn page_ops(doc: &mut PdfDocument, page: &PageArtifact) -> Vec<Op> {
        let space = &page.page_space;
        let mut ops: Vec<Op> = Vec::new();

        // -- Background ------------------------------------------------------
        match &page.background {
            BackgroundLayer::Single(image) => {
                ops.push(cover_page(doc, rgb_raw(image), space.width_pt, space.height_pt));
            }
            BackgroundLayer::Mrc(layers) => {
                ops.push(cover_page(
                    doc,
                    rgb_raw(&layers.background),
                    space.width_pt,
                    space.height_pt,
                ));
                ops.push(cover_page(doc, mask_raw(layers), space.width_pt, space.height_pt));
            }
        }

        // -- Vector primitives -------------------------------------------------
        for primitive in &page.vectors {
            ops.extend(vector_ops(primitive));
        }

        // -- Invisible text ----------------------------------------------------
        for placement in &page.text {
            ops.extend(text_ops(placement));
        }

        ops
    }
}

impl ContainerWriter for SearchablePdfWriter {
    #[instrument(skip(self, pages), fields(pages = pages.len()))]
    fn write(&self, pages: &[PageArtifact], title: &str) -> Result<Vec<u8>> {
        if pages.is_empty() {
            return Err(FolioError::Export(
                "cannot write a PDF with no pages".to_string(),
            ));
        }
        info!(title, "Creating searchable PDF");

        let mut doc = PdfDocument::new(title);
        let mut pdf_pages: Vec<PdfPage> = Vec::with_capacity(pages.len());
        for page in pages {
            let ops = Self::page_ops(&mut doc, page);
            debug!(
                page = page.page_number,
                ops = ops.len(),
                "Page content built"
            );
            pdf_pages.push(PdfPage::new(
                Mm(page.page_space.width_pt * MM_PER_PT),
                Mm(page.page_space.height_pt * MM_PER_PT),
                ops,
            ));
        }
        doc.with_pages(pdf_pages);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let output = doc.save(&PdfSaveOptions::default(), &mut warnings);
        if !warnings.is_empty() {
            warn!(count = warnings.len(), "printpdf reported warnings while saving");
        }
        debug!(bytes = output.len(), "Searchable PDF serialised");
        Ok(output)
    }
}

// -- Op builders ------------------------------------------------------------------

fn rgb_raw(image: &RgbImage) -> RawImage {
    RawImage {
        pixels: RawImageData::U8(image.as_raw().clone()),
        width: image.width() as usize,
        height: image.height() as usize,
        data_format: RawImageFormat::RGB8,
        tag: Vec::new(),
    }
}

fn mask_raw(layers: &MrcLayers) -> RawImage {
    RawImage {
        pixels: RawImageData::U8(layers.mask_rgba()),
        width: layers.mask.width() as usize,
        height: layers.mask.height() as usize,
        data_format: RawImageFormat::RGBA8,
        tag: Vec::new(),
    }
}

/// Place an image so it exactly covers a `width_pt` x `height_pt` page.
///
/// At 72 DPI one image pixel is one point, so the scale factors are the
/// page size divided by the pixel size.
fn cover_page(doc: &mut PdfDocument, raw: RawImage, width_pt: f32, height_pt: f32) -> Op {
    let scale_x = width_pt / raw.width.max(1) as f32;
    let scale_y = height_pt / raw.height.max(1) as f32;
    let id = doc.add_image(&raw);
    Op::UseXobject {
        id,
        transform: XObjectTransform {
            translate_x: Some(Pt(0.0)),
            translate_y: Some(Pt(0.0)),
            scale_x: Some(scale_x),
            scale_y: Some(scale_y),
            dpi: Some(72.0),
            rotate: None,
        },
    }
}

fn color(style: StrokeStyle) -> Color {
    let [r, g, b] = style.color();
    Color::Rgb(Rgb {
        r,
        g,
        b,
        icc_profile: None,
    })
}

fn point(x: f32, y: f32) -> LinePoint {
    LinePoint {
        p: Point { x: Pt(x), y: Pt(y) },
        bezier: false,
    }
}

fn vector_ops(primitive: &VectorPrimitive) -> Vec<Op> {
    let mut ops = vec![Op::SaveGraphicsState];
    match *primitive {
        VectorPrimitive::Line { from, to, style } => {
            ops.push(Op::SetOutlineColor { col: color(style) });
            ops.push(Op::SetOutlineThickness {
                pt: Pt(style.width_pt()),
            });
            ops.push(Op::DrawLine {
                line: Line {
                    points: vec![point(from.0, from.1), point(to.0, to.1)],
                    is_closed: false,
                },
            });
        }
        VectorPrimitive::Rect {
            rect,
            style,
            filled,
        } => {
            if filled {
                ops.push(Op::SetFillColor { col: color(style) });
            } else {
                ops.push(Op::SetOutlineColor { col: color(style) });
                ops.push(Op::SetOutlineThickness {
                    pt: Pt(style.width_pt()),
                });
            }
            ops.push(Op::DrawPolygon {
                polygon: Polygon {
                    rings: vec![PolygonRing {
                        points: vec![
                            point(rect.x, rect.y),
                            point(rect.right(), rect.y),
                            point(rect.right(), rect.bottom()),
                            point(rect.x, rect.bottom()),
                        ],
                    }],
                    mode: if filled {
                        PaintMode::Fill
                    } else {
                        PaintMode::Stroke
                    },
                    winding_order: WindingOrder::NonZero,
                },
            });
        }
    }
    ops.push(Op::RestoreGraphicsState);
    ops
}

fn text_ops(placement: &TextPlacement) -> Vec<Op> {
    vec![
        Op::StartTextSection,
        Op::SetTextRenderingMode {
            mode: TextRenderingMode::Invisible,
        },
        Op::SetFontSizeBuiltinFont {
            size: Pt(placement.font_size_pt),
            font: BuiltinFont::Helvetica,
        },
        Op::SetHorizontalScaling {
            percent: placement.horizontal_scale,
        },
        Op::SetTextCursor {
            pos: Point {
                x: Pt(placement.x),
                y: Pt(placement.y),
            },
        },
        Op::WriteTextBuiltinFont {
            items: vec![TextItem::Text(placement.text.clone())],
            font: BuiltinFont::Helvetica,
        },
        Op::EndTextSection,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::DocumentAssembler;
    use crate::scrub::PreparedRaster;
    use folio_core::config::{AssemblyConfig, BackgroundMode, MrcConfig};
    use folio_core::{PageResult, Rect, TextBlock, Zone, ZoneKind};
    use image::{DynamicImage, Rgb as PixelRgb};

    fn artifact(number: u32, background: BackgroundMode) -> PageArtifact {
        let raster = PreparedRaster::unscrubbed(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            120,
            60,
            PixelRgb([240, 240, 240]),
        )));
        let page = PageResult {
            zones: vec![Zone::new(
                ZoneKind::Column,
                vec![TextBlock::new("Hello world", 10.0, 10.0, 80.0, 12.0, 0.9)],
            )],
            recognized: true,
            ..PageResult::unrecognized(number, 120.0, 60.0)
        };
        let config = AssemblyConfig {
            background,
            ..AssemblyConfig::default()
        };
        DocumentAssembler::new(config, MrcConfig::default()).assemble(
            &page,
            &[],
            &raster,
            &[Rect::new(5.0, 40.0, 20.0, 8.0)],
            72.0,
        )
    }

    fn load(bytes: &[u8]) -> lopdf::Document {
        lopdf::Document::load_mem(bytes).expect("printpdf output parses")
    }

    #[test]
    fn writes_one_pdf_page_per_artifact() {
        let pages = [
            artifact(1, BackgroundMode::Single),
            artifact(2, BackgroundMode::Mrc),
        ];
        let bytes = SearchablePdfWriter::new()
            .write(&pages, "Scan")
            .expect("write");
        assert!(bytes.starts_with(b"%PDF-"));
        assert_eq!(load(&bytes).get_pages().len(), 2);
    }

    #[test]
    fn empty_document_is_an_export_error() {
        assert!(matches!(
            SearchablePdfWriter::new().write(&[], "Empty"),
            Err(FolioError::Export(_))
        ));
    }

    #[test]
    fn text_is_drawn_invisible() {
        let ops = text_ops(&artifact(1, BackgroundMode::Single).text[0]);
        assert!(ops.iter().any(|op| matches!(
            op,
            Op::SetTextRenderingMode {
                mode: TextRenderingMode::Invisible
            }
        )));
    }

    #[test]
    fn file_output_is_written() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.pdf");
        SearchablePdfWriter::new()
            .write_to_file(&[artifact(1, BackgroundMode::Single)], "File", &path)
            .expect("write file");
        let bytes = std::fs::read(&path).expect("read back");
        assert_eq!(load(&bytes).get_pages().len(), 1);
    }
}
