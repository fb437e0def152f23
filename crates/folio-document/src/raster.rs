// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rasterizers — sources of page rasters. A document arrives either as a
// sequence of encoded page images or as a scanned PDF whose pages each
// carry one full-page image.

use std::path::Path;

use folio_core::error::{FolioError, Result};
use image::DynamicImage;
use tracing::{debug, info, instrument};

use crate::image::processor::ImageProcessor;

/// A decoded page and the resolution it represents.
#[derive(Debug, Clone)]
pub struct RasterImage {
    pub image: DynamicImage,
    pub dpi: f32,
}

/// A page still in encoded form, ready to hand to a worker.
#[derive(Debug, Clone)]
pub struct EncodedPage {
    pub bytes: Vec<u8>,
    pub dpi: f32,
}

impl EncodedPage {
    /// Validate the signature and decode.
    pub fn decode(&self) -> Result<RasterImage> {
        decode_page(&self.bytes, self.dpi)
    }
}

/// Decode an encoded page image after checking its magic bytes.
pub fn decode_page(bytes: &[u8], dpi: f32) -> Result<RasterImage> {
    let image = ImageProcessor::from_bytes(bytes)?.into_dynamic();
    Ok(RasterImage { image, dpi })
}

/// Produces page rasters for a document.
pub trait Rasterizer: Send + Sync {
    fn page_count(&self) -> usize;

    /// Decode page `index` (0-based). `dpi` is the resolution to assume when
    /// the source does not record one.
    fn render_page(&self, index: usize, dpi: f32) -> Result<RasterImage>;

    /// Page `index` in encoded form. The default re-encodes the rendered
    /// page as PNG.
    fn encoded_page(&self, index: usize, dpi: f32) -> Result<EncodedPage> {
        let raster = self.render_page(index, dpi)?;
        let bytes = ImageProcessor::from_dynamic(raster.image).to_png_bytes()?;
        Ok(EncodedPage {
            bytes,
            dpi: raster.dpi,
        })
    }
}

/// Pages supplied as individual encoded images (PNG, JPEG, TIFF, ...).
pub struct ImageSequenceRasterizer {
    pages: Vec<Vec<u8>>,
}

impl ImageSequenceRasterizer {
    pub fn new(pages: Vec<Vec<u8>>) -> Self {
        info!(pages = pages.len(), "Image sequence loaded");
        Self { pages }
    }

    /// Read each file as one page, in the order given.
    #[instrument(skip_all, fields(files = paths.len()))]
    pub fn from_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let pages = paths
            .iter()
            .map(|p| std::fs::read(p.as_ref()))
            .collect::<std::io::Result<Vec<_>>>()?;
        Ok(Self::new(pages))
    }

    fn page(&self, index: usize) -> Result<&[u8]> {
        self.pages.get(index).map(Vec::as_slice).ok_or_else(|| {
            FolioError::Rasterize(format!(
                "page index {} out of range (document has {} pages)",
                index,
                self.pages.len()
            ))
        })
    }
}

impl Rasterizer for ImageSequenceRasterizer {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn render_page(&self, index: usize, dpi: f32) -> Result<RasterImage> {
        let raster = decode_page(self.page(index)?, dpi)?;
        debug!(
            index,
            width = raster.image.width(),
            height = raster.image.height(),
            "Page decoded"
        );
        Ok(raster)
    }

    /// The original bytes, without a decode round trip.
    fn encoded_page(&self, index: usize, dpi: f32) -> Result<EncodedPage> {
        Ok(EncodedPage {
            bytes: self.page(index)?.to_vec(),
            dpi,
        })
    }
}
