// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Mixed raster content — splits a prepared page raster into a low-resolution
// colour background and a full-resolution monochrome ink mask.

use folio_core::config::MrcConfig;
use image::{GrayImage, RgbImage};
use tracing::{debug, instrument};

use crate::image::processor::ImageProcessor;
use crate::scan::enhance::ink_mask;
use crate::scrub::PreparedRaster;

/// The two layers of a compressed page background.
#[derive(Debug, Clone)]
pub struct MrcLayers {
    /// Downscaled colour layer, drawn first and stretched to the page.
    pub background: RgbImage,
    /// Full-resolution mask: 0 where there is ink, 255 elsewhere.
    pub mask: GrayImage,
}

impl MrcLayers {
    /// Build both layers from a raster that has already been through the
    /// privacy stage.
    #[instrument(skip_all, fields(width = raster.width(), height = raster.height(), scrubbed = raster.is_scrubbed()))]
    pub fn build(raster: &PreparedRaster, config: &MrcConfig) -> Self {
        let image = raster.image();
        let mask = ink_mask(&image.to_luma8());
        let background = ImageProcessor::from_dynamic(image.clone())
            .scale(config.background_scale)
            .into_dynamic()
            .to_rgb8();
        debug!(
            bg_w = background.width(),
            bg_h = background.height(),
            "MRC layers built"
        );
        Self { background, mask }
    }

    /// Mask as RGBA: opaque black over ink, fully transparent elsewhere.
    pub fn mask_rgba(&self) -> Vec<u8> {
        self.mask
            .pixels()
            .flat_map(|p| if p.0[0] == 0 { [0, 0, 0, 255] } else { [0, 0, 0, 0] })
            .collect()
    }

    pub fn ink_pixels(&self) -> usize {
        self.mask.pixels().filter(|p| p.0[0] == 0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrub::PrivacyScrubber;
    use folio_core::TextBlock;
    use folio_core::config::ScrubConfig;
    use image::{DynamicImage, Rgb};

    /// Light page with a dark "text" stripe inside (30..70, 30..40) and
    /// lighter gray speckle so the region is not uniform before scrubbing.
    fn page() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(120, 90, |x, y| {
            if (30..70).contains(&x) && (30..40).contains(&y) {
                if (x + y) % 3 == 0 { Rgb([20, 20, 20]) } else { Rgb([235, 235, 235]) }
            } else {
                Rgb([240, 240, 240])
            }
        }))
    }

    #[test]
    fn background_is_downscaled_and_mask_is_full_resolution() {
        let layers = MrcLayers::build(&PreparedRaster::unscrubbed(page()), &MrcConfig::default());
        assert_eq!(layers.background.dimensions(), (40, 30));
        assert_eq!(layers.mask.dimensions(), (120, 90));
        assert!(layers.ink_pixels() > 0);
    }

    #[test]
    fn scrubbed_region_is_uniform_in_both_layers() {
        let blocks = [TextBlock::new("ssn 078-05-1120", 30.0, 30.0, 40.0, 10.0, 0.9)];
        let outcome = PrivacyScrubber::new(&ScrubConfig::default(), 1.0).scrub(page(), &blocks);
        let layers = MrcLayers::build(&outcome.raster, &MrcConfig::default());

        // Painted region (28..72, 28..42): solid ink, no residual text shape.
        for y in 28..42 {
            for x in 28..72 {
                assert_eq!(layers.mask.get_pixel(x, y).0[0], 0, "mask at ({x},{y})");
            }
        }
        // Background pixels wholly inside the painted region are black.
        for y in 10..13 {
            for x in 10..23 {
                assert_eq!(layers.background.get_pixel(x, y).0, [0, 0, 0], "bg at ({x},{y})");
            }
        }
    }

    #[test]
    fn mask_rgba_is_transparent_off_ink() {
        let layers = MrcLayers::build(&PreparedRaster::unscrubbed(page()), &MrcConfig::default());
        let rgba = layers.mask_rgba();
        assert_eq!(rgba.len(), 120 * 90 * 4);
        assert_eq!(&rgba[..4], &[0, 0, 0, 0]);
    }
}
