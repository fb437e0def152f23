// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Preprocessing profiles applied to a page raster before recognition.

use folio_core::PreprocessProfile;
use image::DynamicImage;
use tracing::{debug, instrument};

use crate::image::processor::ImageProcessor;
use crate::scan::enhance::ScanEnhancer;

/// Concrete settings behind a [`PreprocessProfile`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileSettings {
    pub contrast: f32,
    /// `(block_radius, c)` for adaptive binarization; `None` keeps grayscale.
    pub threshold: Option<(u32, i32)>,
}

impl ProfileSettings {
    pub fn for_profile(profile: PreprocessProfile) -> Self {
        match profile {
            PreprocessProfile::Binarized => Self {
                contrast: 1.4,
                threshold: Some((15, 10)),
            },
            PreprocessProfile::Nuanced => Self {
                contrast: 1.15,
                threshold: None,
            },
        }
    }
}

/// Produce the raster the text engine sees for `profile`.
///
/// The image is first scaled by `upscale`; recognised coordinates therefore
/// come back in upscaled pixels.
#[instrument(skip(image), fields(width = image.width(), height = image.height(), %profile))]
pub fn apply_profile(image: &DynamicImage, profile: PreprocessProfile, upscale: f32) -> DynamicImage {
    let settings = ProfileSettings::for_profile(profile);
    let toned = ImageProcessor::from_dynamic(image.clone())
        .scale(upscale)
        .grayscale()
        .adjust_contrast(settings.contrast)
        .into_dynamic();

    let prepared = match settings.threshold {
        Some((radius, c)) => ScanEnhancer::from_dynamic(toned).binarize(radius, c).into_dynamic(),
        None => toned,
    };
    debug!(
        width = prepared.width(),
        height = prepared.height(),
        "Profile applied"
    );
    prepared
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn page() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(40, 30, |x, _| {
            if x < 20 { Rgb([40, 40, 40]) } else { Rgb([200, 190, 180]) }
        }))
    }

    #[test]
    fn binarized_profile_is_black_and_white() {
        let out = apply_profile(&page(), PreprocessProfile::Binarized, 1.0).to_luma8();
        assert!(out.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn nuanced_profile_keeps_intermediate_tones() {
        let out = apply_profile(&page(), PreprocessProfile::Nuanced, 1.0).to_luma8();
        assert!(out.pixels().any(|p| p.0[0] != 0 && p.0[0] != 255));
    }

    #[test]
    fn upscale_is_applied_before_the_profile() {
        let out = apply_profile(&page(), PreprocessProfile::Nuanced, 2.0);
        assert_eq!((out.width(), out.height()), (80, 60));
    }
}
