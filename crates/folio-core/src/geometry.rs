// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Geometry — axis-aligned rectangles and the one coordinate transform between
// image-pixel space (origin top-left, Y down) and output-document space
// (origin bottom-left, Y up, PDF points).

use serde::{Deserialize, Serialize};

/// PDF user-space units per inch.
pub const POINTS_PER_INCH: f32 = 72.0;

/// An axis-aligned rectangle. The coordinate space depends on the producer.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Horizontal centre.
    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    /// Minimal rectangle enclosing every input rectangle.
    ///
    /// Returns `None` for an empty iterator.
    pub fn enclosing<I>(rects: I) -> Option<Self>
    where
        I: IntoIterator<Item = Rect>,
    {
        let mut iter = rects.into_iter();
        let first = iter.next()?;
        let (mut left, mut top, mut right, mut bottom) =
            (first.x, first.y, first.right(), first.bottom());
        for r in iter {
            left = left.min(r.x);
            top = top.min(r.y);
            right = right.max(r.right());
            bottom = bottom.max(r.bottom());
        }
        Some(Self::new(left, top, right - left, bottom - top))
    }

    /// Multiply every component by `factor`.
    pub fn scale(&self, factor: f32) -> Self {
        Self::new(
            self.x * factor,
            self.y * factor,
            self.width * factor,
            self.height * factor,
        )
    }

    /// Grow the rectangle by `amount` on every side.
    pub fn pad(&self, amount: f32) -> Self {
        Self::new(
            self.x - amount,
            self.y - amount,
            self.width + 2.0 * amount,
            self.height + 2.0 * amount,
        )
    }

    /// Clamp to `[0, max_w] x [0, max_h]`. May produce an empty rectangle.
    pub fn clamp_to(&self, max_w: f32, max_h: f32) -> Self {
        let left = self.x.clamp(0.0, max_w);
        let top = self.y.clamp(0.0, max_h);
        let right = self.right().clamp(0.0, max_w);
        let bottom = self.bottom().clamp(0.0, max_h);
        Self::new(left, top, (right - left).max(0.0), (bottom - top).max(0.0))
    }
}

/// Output page geometry for one page, derived from its raster size and DPI.
///
/// Every placement on the output page (text, rules, rectangles, redactions)
/// goes through [`PageSpace::to_output`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSpace {
    /// Page width in points.
    pub width_pt: f32,
    /// Page height in points.
    pub height_pt: f32,
    /// Points per source pixel (`72 / dpi`).
    pub px_to_pt: f32,
}

impl PageSpace {
    /// Page space for a raster of `width_px` x `height_px` rendered at `dpi`.
    ///
    /// A non-positive DPI falls back to one point per pixel.
    pub fn from_raster(width_px: u32, height_px: u32, dpi: f32) -> Self {
        let px_to_pt = if dpi.is_finite() && dpi > 0.0 {
            POINTS_PER_INCH / dpi
        } else {
            1.0
        };
        Self {
            width_pt: width_px as f32 * px_to_pt,
            height_pt: height_px as f32 * px_to_pt,
            px_to_pt,
        }
    }

    /// Map a pixel-space rectangle onto the output page.
    ///
    /// `outY = pageHeight - y - h` after scaling into points.
    pub fn to_output(&self, rect: &Rect) -> Rect {
        let scaled = rect.scale(self.px_to_pt);
        Rect::new(
            scaled.x,
            flip_y(scaled.y, scaled.height, self.height_pt),
            scaled.width,
            scaled.height,
        )
    }

    /// Inverse of [`to_output`](Self::to_output).
    pub fn to_source(&self, rect: &Rect) -> Rect {
        let flipped = Rect::new(
            rect.x,
            flip_y(rect.y, rect.height, self.height_pt),
            rect.width,
            rect.height,
        );
        flipped.scale(1.0 / self.px_to_pt)
    }
}

/// Flip a vertical position between top-left and bottom-left origins.
///
/// The flip is its own inverse: `flip_y(flip_y(y, h, H), h, H) == y`.
pub fn flip_y(y: f32, height: f32, page_height: f32) -> f32 {
    page_height - y - height
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enclosing_rect_covers_all_inputs() {
        let r = Rect::enclosing([
            Rect::new(10.0, 20.0, 5.0, 5.0),
            Rect::new(0.0, 30.0, 50.0, 10.0),
        ])
        .expect("non-empty");
        assert_eq!(r, Rect::new(0.0, 20.0, 50.0, 20.0));
        assert!(Rect::enclosing(std::iter::empty()).is_none());
    }

    #[test]
    fn flip_round_trip_is_exact_for_pixel_coordinates() {
        let page_h = 3300.0;
        for y in (0..3300).step_by(37) {
            for h in [1.0f32, 12.0, 15.0, 48.0, 301.0] {
                let y = y as f32;
                let out = flip_y(y, h, page_h);
                assert_eq!(page_h - out - h, y, "drift at y={y} h={h}");
            }
        }
    }

    #[test]
    fn output_transform_at_one_point_per_pixel() {
        let space = PageSpace::from_raster(612, 792, 72.0);
        let out = space.to_output(&Rect::new(100.0, 10.0, 200.0, 20.0));
        assert_eq!(out, Rect::new(100.0, 762.0, 200.0, 20.0));
        assert_eq!(
            space.to_source(&out),
            Rect::new(100.0, 10.0, 200.0, 20.0)
        );
    }

    #[test]
    fn output_transform_scales_by_dpi() {
        // 300 DPI letter page: 2550 x 3300 px -> 612 x 792 pt.
        let space = PageSpace::from_raster(2550, 3300, 300.0);
        assert!((space.width_pt - 612.0).abs() < 1e-3);
        assert!((space.height_pt - 792.0).abs() < 1e-3);

        let src = Rect::new(300.0, 600.0, 900.0, 50.0);
        let out = space.to_output(&src);
        assert!((out.y - (792.0 - 144.0 - 12.0)).abs() < 1e-3);
        let back = space.to_source(&out);
        assert!((back.y - src.y).abs() < 1e-2);
        assert!((back.height - src.height).abs() < 1e-2);
    }

    #[test]
    fn degenerate_dpi_falls_back_to_unit_scale() {
        let space = PageSpace::from_raster(100, 200, 0.0);
        assert_eq!(space.px_to_pt, 1.0);
        assert_eq!(space.height_pt, 200.0);
    }

    #[test]
    fn clamp_never_produces_negative_extent() {
        let r = Rect::new(-10.0, 95.0, 30.0, 30.0).clamp_to(100.0, 100.0);
        assert_eq!(r, Rect::new(0.0, 95.0, 20.0, 5.0));
        let outside = Rect::new(150.0, 150.0, 10.0, 10.0).clamp_to(100.0, 100.0);
        assert_eq!(outside.area(), 0.0);
    }
}
