// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Ruling-line detection — long, thin runs of ink become HLine / VLine
// graphics so the assembler can redraw them as vectors.

use folio_core::{GraphicElement, GraphicKind};
use image::GrayImage;
use tracing::debug;

use crate::scan::enhance::ink_mask;

/// A run of ink along one scan line: `[start, end)` at offset `at`.
#[derive(Debug, Clone, Copy)]
struct Run {
    start: u32,
    end: u32,
    at: u32,
}

/// A rule being grown across adjacent scan lines.
#[derive(Debug, Clone, Copy)]
struct Band {
    start: u32,
    end: u32,
    first: u32,
    last: u32,
}

/// Find horizontal and vertical ruling lines.
///
/// A rule is a run of ink at least `min_fraction` of the page extent long,
/// no thicker than `max(4, extent / 100)` pixels. Adjacent scan lines with
/// overlapping runs merge into one rule.
pub fn detect_rules(gray: &GrayImage, min_fraction: f32) -> Vec<GraphicElement> {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }
    let mask = ink_mask(gray);
    let is_ink = |x: u32, y: u32| mask.get_pixel(x, y).0[0] == 0;

    let min_h_len = ((width as f32 * min_fraction).ceil() as u32).max(2);
    let max_h_thick = (height / 100).max(4);
    let horizontal = grow_bands(
        (0..height).flat_map(|y| runs(width, min_h_len, |x| is_ink(x, y), y)),
        max_h_thick,
    );

    let min_v_len = ((height as f32 * min_fraction).ceil() as u32).max(2);
    let max_v_thick = (width / 100).max(4);
    let vertical = grow_bands(
        (0..width).flat_map(|x| runs(height, min_v_len, |y| is_ink(x, y), x)),
        max_v_thick,
    );

    let mut graphics: Vec<GraphicElement> = horizontal
        .iter()
        .map(|b| {
            GraphicElement::new(
                GraphicKind::HLine,
                b.start as f32,
                b.first as f32,
                (b.end - b.start) as f32,
                (b.last - b.first + 1) as f32,
            )
        })
        .collect();
    graphics.extend(vertical.iter().map(|b| {
        GraphicElement::new(
            GraphicKind::VLine,
            b.first as f32,
            b.start as f32,
            (b.last - b.first + 1) as f32,
            (b.end - b.start) as f32,
        )
    }));

    debug!(
        horizontal = horizontal.len(),
        vertical = vertical.len(),
        "Ruling lines detected"
    );
    graphics
}

/// Ink runs of at least `min_len` along one scan line of length `len`.
fn runs(len: u32, min_len: u32, ink: impl Fn(u32) -> bool, at: u32) -> Vec<Run> {
    let mut found = Vec::new();
    let mut start = None;
    for i in 0..=len {
        let dark = i < len && ink(i);
        match (dark, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                if i - s >= min_len {
                    found.push(Run { start: s, end: i, at });
                }
                start = None;
            }
            _ => {}
        }
    }
    found
}

/// Merge runs on consecutive scan lines into bands; drop bands thicker than
/// `max_thickness` (filled areas, not rules).
fn grow_bands(runs: impl Iterator<Item = Run>, max_thickness: u32) -> Vec<Band> {
    let mut open: Vec<Band> = Vec::new();
    let mut closed: Vec<Band> = Vec::new();

    for run in runs {
        // Bands not continued on the previous line are finished.
        let (still_open, finished): (Vec<Band>, Vec<Band>) =
            open.into_iter().partition(|b| b.last + 1 >= run.at);
        closed.extend(finished);
        open = still_open;

        match open
            .iter_mut()
            .find(|b| b.last + 1 == run.at && run.start < b.end && b.start < run.end)
        {
            Some(band) => {
                band.start = band.start.min(run.start);
                band.end = band.end.max(run.end);
                band.last = run.at;
            }
            None => open.push(Band {
                start: run.start,
                end: run.end,
                first: run.at,
                last: run.at,
            }),
        }
    }
    closed.extend(open);

    closed.retain(|b| b.last - b.first < max_thickness);
    closed.sort_by_key(|b| (b.first, b.start));
    closed
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn blank(width: u32, height: u32) -> GrayImage {
        GrayImage::from_pixel(width, height, Luma([240u8]))
    }

    fn ink(img: &mut GrayImage, x0: u32, y0: u32, x1: u32, y1: u32) {
        for y in y0..y1 {
            for x in x0..x1 {
                img.put_pixel(x, y, Luma([10u8]));
            }
        }
    }

    #[test]
    fn horizontal_rule_is_found() {
        let mut img = blank(200, 100);
        ink(&mut img, 20, 50, 180, 52);
        let rules = detect_rules(&img, 0.2);
        assert_eq!(rules.len(), 1);
        let r = rules[0];
        assert_eq!(r.kind, GraphicKind::HLine);
        assert_eq!((r.x, r.y, r.width, r.height), (20.0, 50.0, 160.0, 2.0));
    }

    #[test]
    fn vertical_rule_is_found() {
        let mut img = blank(200, 100);
        ink(&mut img, 90, 10, 93, 90);
        let rules = detect_rules(&img, 0.2);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].kind, GraphicKind::VLine);
        assert_eq!(rules[0].height, 80.0);
        assert_eq!(rules[0].width, 3.0);
    }

    #[test]
    fn short_strokes_and_filled_blocks_are_not_rules() {
        let mut img = blank(200, 200);
        // Glyph-sized stroke.
        ink(&mut img, 10, 10, 25, 12);
        // Large filled box: too thick in both directions.
        ink(&mut img, 50, 50, 150, 150);
        assert!(detect_rules(&img, 0.2).is_empty());
    }

    #[test]
    fn empty_image_has_no_rules() {
        assert!(detect_rules(&GrayImage::new(0, 0), 0.2).is_empty());
    }
}
