// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanned-PDF rasterizer — pulls the page image out of each page of a PDF
// produced by a scanner, using the `lopdf` crate.
//
// Supported streams: DCT (JPEG bytes passed through untouched), and 8-bit
// DeviceGray / DeviceRGB samples that are either Flate-compressed or stored
// without a filter. Vector-only pages are not rendered.

use std::path::Path;

use folio_core::error::{FolioError, Result};
use folio_core::geometry::POINTS_PER_INCH;
use image::{DynamicImage, GrayImage, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, info, instrument, warn};

use crate::image::processor::ImageProcessor;
use crate::raster::{EncodedPage, RasterImage, Rasterizer, decode_page};

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Reads page images from a scanned PDF.
pub struct EmbeddedImageRasterizer {
    document: Document,
    /// Page object ids in page order.
    pages: Vec<ObjectId>,
}

/// The largest image XObject on a page, plus the page width in points.
struct PageImage<'a> {
    stream: &'a Stream,
    width: u32,
    height: u32,
    page_width_pt: Option<f32>,
}

impl EmbeddedImageRasterizer {
    /// Load from bytes after checking the `%PDF-` signature.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if !data.starts_with(PDF_MAGIC) {
            return Err(FolioError::UnsupportedFormat(
                "input does not start with a %PDF- header".to_string(),
            ));
        }
        let document = Document::load_mem(data).map_err(|err| {
            FolioError::Pdf(format!("failed to load PDF from memory: {}", err))
        })?;
        let pages: Vec<ObjectId> = document.get_pages().into_values().collect();
        info!(pages = pages.len(), "Scanned PDF loaded");
        Ok(Self { document, pages })
    }

    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        Self::from_bytes(&data)
    }

    fn page_image(&self, index: usize) -> Result<PageImage<'_>> {
        let page_id = *self.pages.get(index).ok_or_else(|| {
            FolioError::Rasterize(format!(
                "page index {} out of range (document has {} pages)",
                index,
                self.pages.len()
            ))
        })?;

        let resources = self
            .inherited(page_id, b"Resources")
            .and_then(|obj| self.resolve_dict(obj))
            .ok_or_else(|| {
                FolioError::Rasterize(format!("page {} has no resources", index + 1))
            })?;
        let xobjects = resources
            .get(b"XObject")
            .ok()
            .and_then(|obj| self.resolve_dict(obj))
            .ok_or_else(|| {
                FolioError::Rasterize(format!("page {} has no image XObjects", index + 1))
            })?;

        let mut best: Option<PageImage<'_>> = None;
        for (_, value) in xobjects.iter() {
            let Some(stream) = self.resolve(value).and_then(|o| o.as_stream().ok()) else {
                continue;
            };
            if !is_name(stream.dict.get(b"Subtype").ok(), b"Image") {
                continue;
            }
            let (Some(width), Some(height)) = (
                int(stream.dict.get(b"Width").ok()),
                int(stream.dict.get(b"Height").ok()),
            ) else {
                continue;
            };
            let area = width as u64 * height as u64;
            if best
                .as_ref()
                .is_none_or(|b| area > b.width as u64 * b.height as u64)
            {
                best = Some(PageImage {
                    stream,
                    width,
                    height,
                    page_width_pt: None,
                });
            }
        }

        let mut image = best.ok_or_else(|| {
            FolioError::Rasterize(format!("page {} carries no image", index + 1))
        })?;
        image.page_width_pt = self
            .inherited(page_id, b"MediaBox")
            .and_then(|obj| self.resolve(obj))
            .and_then(media_box_width);
        Ok(image)
    }

    /// Look up a page attribute, walking `/Parent` for inherited values.
    fn inherited(&self, page_id: ObjectId, key: &[u8]) -> Option<&Object> {
        let mut node = self.document.get_dictionary(page_id).ok()?;
        // Page trees are shallow; the bound guards against cycles.
        for _ in 0..32 {
            if let Ok(value) = node.get(key) {
                return Some(value);
            }
            let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
            node = self.document.get_dictionary(parent).ok()?;
        }
        None
    }

    fn resolve<'a>(&'a self, obj: &'a Object) -> Option<&'a Object> {
        match obj {
            Object::Reference(id) => self.document.get_object(*id).ok(),
            other => Some(other),
        }
    }

    fn resolve_dict<'a>(&'a self, obj: &'a Object) -> Option<&'a Dictionary> {
        self.resolve(obj).and_then(|o| o.as_dict().ok())
    }

    fn color_components(&self, stream: &Stream) -> Option<u8> {
        let cs = stream.dict.get(b"ColorSpace").ok().and_then(|o| self.resolve(o))?;
        match cs {
            Object::Name(name) if name == b"DeviceGray" => Some(1),
            Object::Name(name) if name == b"DeviceRGB" => Some(3),
            // [/ICCBased <ref>] with /N components.
            Object::Array(items) => {
                let stream = items.get(1).and_then(|o| self.resolve(o))?.as_stream().ok()?;
                int(stream.dict.get(b"N").ok()).and_then(|n| u8::try_from(n).ok())
            }
            _ => None,
        }
    }

    fn dpi_for(image: &PageImage<'_>, fallback: f32) -> f32 {
        match image.page_width_pt {
            Some(w) if w > 0.0 => image.width as f32 / (w / POINTS_PER_INCH),
            _ => fallback,
        }
    }

    /// Encoded form of the page image: JPEG bytes for DCT streams, PNG for
    /// sample data.
    fn encode(&self, image: &PageImage<'_>) -> Result<Vec<u8>> {
        let filters = filter_names(image.stream.dict.get(b"Filter").ok());
        if filters.iter().any(|f| f.as_slice() == b"DCTDecode") {
            if filters.len() > 1 {
                return Err(FolioError::Rasterize(
                    "chained filters around DCT data are not supported".to_string(),
                ));
            }
            return Ok(image.stream.content.clone());
        }

        let bits = int(image.stream.dict.get(b"BitsPerComponent").ok()).unwrap_or(8);
        if bits != 8 {
            return Err(FolioError::Rasterize(format!(
                "{}-bit image samples are not supported",
                bits
            )));
        }
        let samples = match filters.as_slice() {
            [] => image.stream.content.clone(),
            [f] if f.as_slice() == b"FlateDecode" => {
                image.stream.decompressed_content().map_err(|err| {
                    FolioError::Rasterize(format!("failed to inflate image stream: {}", err))
                })?
            }
            other => {
                let names: Vec<String> = other
                    .iter()
                    .map(|f| String::from_utf8_lossy(f).into_owned())
                    .collect();
                return Err(FolioError::Rasterize(format!(
                    "unsupported image filter {}",
                    names.join(", ")
                )));
            }
        };

        let components = self.color_components(image.stream).ok_or_else(|| {
            FolioError::Rasterize("unsupported image colour space".to_string())
        })?;
        let expected = image.width as usize * image.height as usize * components as usize;
        if samples.len() < expected {
            return Err(FolioError::Rasterize(format!(
                "image stream holds {} bytes, expected {}",
                samples.len(),
                expected
            )));
        }
        let mut samples = samples;
        samples.truncate(expected);

        let dynamic = match components {
            1 => GrayImage::from_raw(image.width, image.height, samples).map(DynamicImage::ImageLuma8),
            3 => RgbImage::from_raw(image.width, image.height, samples).map(DynamicImage::ImageRgb8),
            n => {
                return Err(FolioError::Rasterize(format!(
                    "{}-component images are not supported",
                    n
                )));
            }
        }
        .ok_or_else(|| FolioError::Rasterize("image buffer size mismatch".to_string()))?;

        ImageProcessor::from_dynamic(dynamic).to_png_bytes()
    }
}

impl Rasterizer for EmbeddedImageRasterizer {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    #[instrument(skip(self), fields(index))]
    fn render_page(&self, index: usize, dpi: f32) -> Result<RasterImage> {
        let encoded = self.encoded_page(index, dpi)?;
        decode_page(&encoded.bytes, encoded.dpi)
    }

    fn encoded_page(&self, index: usize, dpi: f32) -> Result<EncodedPage> {
        let image = self.page_image(index)?;
        let page_dpi = Self::dpi_for(&image, dpi);
        if image.page_width_pt.is_none() {
            warn!(index, "Page has no MediaBox; assuming {} DPI", dpi);
        }
        let bytes = self.encode(&image)?;
        debug!(
            index,
            width = image.width,
            height = image.height,
            dpi = page_dpi,
            "Page image extracted"
        );
        Ok(EncodedPage {
            bytes,
            dpi: page_dpi,
        })
    }
}

// -- Object helpers -----------------------------------------------------------

fn int(obj: Option<&Object>) -> Option<u32> {
    match obj? {
        Object::Integer(i) => u32::try_from(*i).ok(),
        _ => None,
    }
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

fn is_name(obj: Option<&Object>, expected: &[u8]) -> bool {
    matches!(obj, Some(Object::Name(name)) if name == expected)
}

fn filter_names(obj: Option<&Object>) -> Vec<Vec<u8>> {
    match obj {
        Some(Object::Name(name)) => vec![name.clone()],
        Some(Object::Array(items)) => items
            .iter()
            .filter_map(|o| match o {
                Object::Name(name) => Some(name.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn media_box_width(obj: &Object) -> Option<f32> {
    let items = obj.as_array().ok()?;
    let [x0, _, x1, _] = items.as_slice() else {
        return None;
    };
    Some((number(x1)? - number(x0)?).abs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    /// One-page PDF, `width_pt` wide, carrying `stream` as its only image.
    fn scanned_pdf(stream: Stream, width_pt: i64) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let image_id = doc.add_object(stream);
        let resources_id = doc.add_object(dictionary! {
            "XObject" => dictionary! { "Im0" => image_id },
        });
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Resources" => resources_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "MediaBox" => vec![0.into(), 0.into(), width_pt.into(), 72.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        let mut out = Vec::new();
        doc.save_to(&mut out).expect("save pdf");
        out
    }

    fn gray_stream(width: i64, height: i64, compress: bool) -> Stream {
        let samples: Vec<u8> = (0..width * height).map(|i| (i * 10 % 256) as u8).collect();
        let mut stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width,
                "Height" => height,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            samples,
        );
        if compress {
            stream.compress().expect("compress");
        }
        stream
    }

    #[test]
    fn non_pdf_input_is_rejected_by_signature() {
        let err = EmbeddedImageRasterizer::from_bytes(b"\x89PNG\r\n\x1a\n....").err();
        assert!(matches!(err, Some(FolioError::UnsupportedFormat(_))));
    }

    #[test]
    fn flate_gray_page_is_extracted_with_dpi_from_media_box() {
        // 300 px across a 72 pt (1 inch) page: 300 DPI.
        let pdf = scanned_pdf(gray_stream(300, 12, true), 72);
        let r = EmbeddedImageRasterizer::from_bytes(&pdf).expect("load");
        assert_eq!(r.page_count(), 1);
        let page = r.render_page(0, 150.0).expect("render");
        assert_eq!((page.image.width(), page.image.height()), (300, 12));
        assert!((page.dpi - 300.0).abs() < 1e-3);
        assert_eq!(page.image.to_luma8().get_pixel(3, 0).0[0], 30);
    }

    #[test]
    fn unfiltered_samples_are_accepted() {
        let pdf = scanned_pdf(gray_stream(20, 10, false), 144);
        let page = EmbeddedImageRasterizer::from_bytes(&pdf)
            .expect("load")
            .render_page(0, 300.0)
            .expect("render");
        assert!((page.dpi - 10.0).abs() < 1e-3);
    }

    #[test]
    fn missing_page_is_a_rasterize_error() {
        let pdf = scanned_pdf(gray_stream(4, 4, false), 72);
        let r = EmbeddedImageRasterizer::from_bytes(&pdf).expect("load");
        assert!(matches!(r.render_page(5, 300.0), Err(FolioError::Rasterize(_))));
    }
}
