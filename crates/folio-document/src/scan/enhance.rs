// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page thresholding: the local-mean binarizer used by the binarized
// recognition profile, and the global Otsu cut behind every ink mask.

use image::{DynamicImage, GrayImage, Luma};
use tracing::{debug, instrument};

const INK: Luma<u8> = Luma([0]);
const PAPER: Luma<u8> = Luma([255]);

/// Owns a page raster while it is thresholded.
pub struct ScanEnhancer {
    image: DynamicImage,
}

impl ScanEnhancer {
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    /// Local-mean binarization. A pixel becomes ink when it is darker than
    /// the mean of the `(2 * radius + 1)` square around it, less `c`.
    /// Windows are clipped at the page edge.
    #[instrument(skip(self))]
    pub fn binarize(self, radius: u32, c: i32) -> Self {
        let gray = self.image.to_luma8();
        let table = SummedArea::of(&gray);

        let output = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
            let cut = (table.window_mean(x, y, radius).round() as i32 - c).clamp(0, 255);
            if i32::from(gray.get_pixel(x, y).0[0]) < cut {
                INK
            } else {
                PAPER
            }
        });

        debug!(width = output.width(), height = output.height(), "Page binarized");
        Self::from_dynamic(DynamicImage::ImageLuma8(output))
    }
}

/// Ink (0) below the Otsu threshold, paper (255) at or above it.
pub fn ink_mask(gray: &GrayImage) -> GrayImage {
    let cut = otsu_threshold(gray);
    debug!(cut, "Ink mask threshold");
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        if gray.get_pixel(x, y).0[0] < cut { INK } else { PAPER }
    })
}

/// Summed-area table with a zero row and column in front, so that
/// `at(x, y)` is the sum over `[0, x) x [0, y)`.
struct SummedArea {
    sums: Vec<u64>,
    stride: usize,
    width: u32,
    height: u32,
}

impl SummedArea {
    fn of(gray: &GrayImage) -> Self {
        let (width, height) = gray.dimensions();
        let stride = width as usize + 1;
        let mut sums = vec![0u64; stride * (height as usize + 1)];

        for (y, row) in gray.rows().enumerate() {
            let mut running = 0u64;
            for (x, pixel) in row.enumerate() {
                running += u64::from(pixel.0[0]);
                sums[(y + 1) * stride + x + 1] = sums[y * stride + x + 1] + running;
            }
        }

        Self {
            sums,
            stride,
            width,
            height,
        }
    }

    fn at(&self, x: usize, y: usize) -> u64 {
        self.sums[y * self.stride + x]
    }

    fn window_mean(&self, cx: u32, cy: u32, radius: u32) -> f64 {
        let left = cx.saturating_sub(radius) as usize;
        let top = cy.saturating_sub(radius) as usize;
        let right = cx.saturating_add(radius).saturating_add(1).min(self.width) as usize;
        let bottom = cy.saturating_add(radius).saturating_add(1).min(self.height) as usize;

        let count = (right - left) * (bottom - top);
        if count == 0 {
            return 128.0;
        }
        let total = self.at(right, bottom) + self.at(left, top)
            - self.at(right, top)
            - self.at(left, bottom);
        total as f64 / count as f64
    }
}

fn histogram(gray: &GrayImage) -> [u64; 256] {
    let mut bins = [0u64; 256];
    for pixel in gray.pixels() {
        bins[usize::from(pixel.0[0])] += 1;
    }
    bins
}

/// Otsu's threshold: the cut maximising between-class variance. Pixels
/// strictly below the returned level are the dark class. An empty image
/// yields 128.
pub fn otsu_threshold(gray: &GrayImage) -> u8 {
    let bins = histogram(gray);
    let total: u64 = bins.iter().sum();
    if total == 0 {
        return 128;
    }
    let weighted_total: f64 = bins
        .iter()
        .enumerate()
        .map(|(level, &n)| level as f64 * n as f64)
        .sum();

    let mut dark_count = 0u64;
    let mut dark_weighted = 0.0f64;
    let mut best = (0.0f64, 0u8);

    for (level, &n) in bins.iter().enumerate() {
        dark_count += n;
        let light_count = total - dark_count;
        if dark_count == 0 {
            continue;
        }
        if light_count == 0 {
            break;
        }
        dark_weighted += level as f64 * n as f64;

        let dark_mean = dark_weighted / dark_count as f64;
        let light_mean = (weighted_total - dark_weighted) / light_count as f64;
        let spread = dark_count as f64 * light_count as f64 * (dark_mean - light_mean).powi(2);
        if spread > best.0 {
            // Dark class is [0, level].
            best = (spread, (level as u8).saturating_add(1));
        }
    }

    best.1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn striped(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, _| {
            if (10..20).contains(&x) { Luma([30u8]) } else { Luma([220u8]) }
        })
    }

    #[test]
    fn otsu_cut_falls_between_the_two_tones() {
        let t = otsu_threshold(&striped(40, 10));
        assert!(t > 30 && t <= 220, "threshold {t}");
    }

    #[test]
    fn ink_mask_marks_the_stripe_only() {
        let mask = ink_mask(&striped(40, 10));
        assert_eq!(mask.get_pixel(15, 5).0[0], 0);
        assert_eq!(mask.get_pixel(30, 5).0[0], 255);
        assert!(mask.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn flat_page_has_no_ink() {
        let mask = ink_mask(&GrayImage::from_pixel(16, 16, Luma([200u8])));
        assert!(mask.pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn local_binarization_keeps_size_and_finds_the_stroke() {
        let img = DynamicImage::ImageLuma8(striped(60, 40));
        let gray = ScanEnhancer::from_dynamic(img)
            .binarize(15, 10)
            .into_dynamic()
            .to_luma8();
        assert_eq!(gray.dimensions(), (60, 40));
        assert_eq!(gray.get_pixel(15, 20).0[0], 0);
        assert_eq!(gray.get_pixel(50, 20).0[0], 255);
    }

    #[test]
    fn window_mean_is_clipped_at_edges() {
        let table = SummedArea::of(&GrayImage::from_pixel(4, 4, Luma([100u8])));
        assert_eq!(table.window_mean(0, 0, 10), 100.0);
        assert_eq!(table.window_mean(3, 3, 1), 100.0);
    }

    #[test]
    fn otsu_of_empty_image_is_mid_gray() {
        assert_eq!(otsu_threshold(&GrayImage::new(0, 0)), 128);
    }
}
