// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor — format validation, decoding, grayscale, contrast and
// scaling for page rasters. Operates on in-memory images using the `image`
// crate.

use folio_core::error::{FolioError, Result};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use tracing::{debug, info, instrument};

/// Raster formats accepted as page input.
const ACCEPTED_FORMATS: &[ImageFormat] = &[
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::Tiff,
    ImageFormat::Bmp,
    ImageFormat::WebP,
    ImageFormat::Pnm,
];

/// Identify a page image by its magic bytes, rejecting anything that is not
/// an accepted raster format.
pub fn detect_format(data: &[u8]) -> Result<ImageFormat> {
    let format = image::guess_format(data).map_err(|err| {
        FolioError::UnsupportedFormat(format!("unrecognised image signature: {}", err))
    })?;
    if !ACCEPTED_FORMATS.contains(&format) {
        return Err(FolioError::UnsupportedFormat(format!(
            "{:?} is not an accepted page format",
            format
        )));
    }
    Ok(format)
}

/// Image processing pipeline operating on a single in-memory page raster.
///
/// Each method consumes `self` and returns a new `ImageProcessor` wrapping
/// the transformed image, enabling method chaining.
///
/// ```ignore
/// let prepared = ImageProcessor::from_bytes(&png)?
///     .scale(2.0)
///     .grayscale()
///     .adjust_contrast(1.15)
///     .into_dynamic();
/// ```
pub struct ImageProcessor {
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Validate the signature of `data`, then decode it.
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let format = detect_format(data)?;
        let img = image::load_from_memory_with_format(data, format).map_err(|err| {
            FolioError::ImageDecode(format!("failed to decode {:?} image: {}", format, err))
        })?;
        debug!(
            width = img.width(),
            height = img.height(),
            ?format,
            "Image decoded from bytes"
        );
        Ok(Self { image: img })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    // -- Transformations (consume self, return new Self) -----------------------

    /// Scale both dimensions by `factor`. A factor of 1.0 (or a non-positive
    /// one) is a no-op; the result is at least 1x1.
    #[instrument(skip(self), fields(factor))]
    pub fn scale(self, factor: f32) -> Self {
        if !factor.is_finite() || factor <= 0.0 || (factor - 1.0).abs() < f32::EPSILON {
            return self;
        }
        let new_w = ((self.image.width() as f32 * factor).round() as u32).max(1);
        let new_h = ((self.image.height() as f32 * factor).round() as u32).max(1);
        let filter = if factor > 1.0 {
            FilterType::CatmullRom
        } else {
            FilterType::Triangle
        };
        info!(
            from_w = self.image.width(),
            from_h = self.image.height(),
            new_w,
            new_h,
            "Scaling image"
        );
        Self {
            image: self.image.resize_exact(new_w, new_h, filter),
        }
    }

    /// Convert the image to grayscale (luma).
    pub fn grayscale(self) -> Self {
        debug!("Converting to grayscale");
        Self {
            image: DynamicImage::ImageLuma8(self.image.to_luma8()),
        }
    }

    /// Adjust contrast by a factor around mid-gray. Values > 1.0 increase
    /// contrast; 1.0 is a no-op.
    #[instrument(skip(self), fields(factor))]
    pub fn adjust_contrast(self, factor: f32) -> Self {
        debug!(factor, "Adjusting contrast");
        let adjust = |channel: u8| -> u8 {
            let val = factor * (channel as f32 - 128.0) + 128.0;
            val.clamp(0.0, 255.0) as u8
        };

        let image = match self.image {
            DynamicImage::ImageLuma8(mut gray) => {
                gray.pixels_mut().for_each(|p| p.0[0] = adjust(p.0[0]));
                DynamicImage::ImageLuma8(gray)
            }
            other => {
                let mut rgba = other.to_rgba8();
                for pixel in rgba.pixels_mut() {
                    let image::Rgba([r, g, b, a]) = *pixel;
                    *pixel = image::Rgba([adjust(r), adjust(g), adjust(b), a]);
                }
                DynamicImage::ImageRgba8(rgba)
            }
        };
        Self { image }
    }

    // -- Output ---------------------------------------------------------------

    /// Encode the current image as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        self.image
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|err| FolioError::ImageDecode(format!("PNG encoding failed: {}", err)))?;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, RgbImage};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        ImageProcessor::from_dynamic(DynamicImage::ImageRgb8(RgbImage::new(width, height)))
            .to_png_bytes()
            .expect("encode png")
    }

    #[test]
    fn png_signature_is_accepted() {
        assert_eq!(detect_format(&png_bytes(4, 4)).expect("png"), ImageFormat::Png);
    }

    #[test]
    fn text_masquerading_as_image_is_rejected() {
        let err = detect_format(b"Name,Email\nalice,a@example.com\n").unwrap_err();
        assert!(matches!(err, FolioError::UnsupportedFormat(_)));
    }

    #[test]
    fn truncated_png_is_a_decode_error() {
        let mut data = png_bytes(32, 32);
        data.truncate(40);
        let err = ImageProcessor::from_bytes(&data).err().expect("should fail");
        assert!(matches!(err, FolioError::ImageDecode(_)));
    }

    #[test]
    fn scale_rounds_dimensions() {
        let img = DynamicImage::ImageLuma8(GrayImage::new(100, 51));
        let up = ImageProcessor::from_dynamic(img.clone()).scale(2.0);
        assert_eq!((up.width(), up.height()), (200, 102));
        let down = ImageProcessor::from_dynamic(img).scale(1.0 / 3.0);
        assert_eq!((down.width(), down.height()), (33, 17));
    }

    #[test]
    fn contrast_pushes_away_from_mid_gray() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_fn(2, 1, |x, _| {
            Luma([if x == 0 { 100 } else { 160 }])
        }));
        let out = ImageProcessor::from_dynamic(img)
            .adjust_contrast(1.4)
            .into_dynamic()
            .to_luma8();
        assert!(out.get_pixel(0, 0).0[0] < 100);
        assert!(out.get_pixel(1, 0).0[0] > 160);
    }
}
