// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Privacy scrubber — finds personally identifying text among recognised
// blocks, paints the matching regions opaque black on the raster and
// replaces the matched spans in the block text, so nothing derived from the
// page (text overlay, exports, diagnostics) carries the original value.
//
// Scrubbing must happen before any background compression. The MRC builder
// and the assembler only accept a `PreparedRaster`, which can be obtained
// from the scrubber or, when scrubbing is switched off, explicitly through
// `PreparedRaster::unscrubbed`.

use std::sync::LazyLock;

use folio_core::config::ScrubConfig;
use folio_core::{Rect, TextBlock};
use image::{DynamicImage, Rgba};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect as PixelRect;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

// -- Detector patterns --
static RE_EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}")
        .expect("valid email regex")
});
static RE_SSN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").expect("valid ssn regex"));
static RE_PHONE_NANP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\+?1[\s.-]?)?(?:\(\d{3}\)|\b\d{3})[\s.-]?\d{3}[\s.-]\d{4}\b")
        .expect("valid NANP phone regex")
});
static RE_PHONE_INTL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\+\d{1,3}(?:[\s.-]?\d{2,4}){3,5}\b").expect("valid international phone regex")
});
static RE_CARD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:\d[ -]?){12,18}\d\b").expect("valid card regex"));

/// Stands in for every matched span in scrubbed block text.
pub const REDACTED_TEXT: &str = "[REDACTED]";

/// Categories of identifying text the scrubber recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PiiKind {
    Email,
    Ssn,
    Phone,
    CardNumber,
}

/// A page raster that has been through the privacy stage.
#[derive(Debug, Clone)]
pub struct PreparedRaster {
    image: DynamicImage,
    scrubbed: bool,
}

impl PreparedRaster {
    /// Pass a raster through untouched when scrubbing is disabled.
    pub fn unscrubbed(image: DynamicImage) -> Self {
        Self {
            image,
            scrubbed: false,
        }
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn is_scrubbed(&self) -> bool {
        self.scrubbed
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// The scrubbed raster, the source-pixel regions that were painted over, and
/// the input blocks with their PII spans replaced by [`REDACTED_TEXT`].
#[derive(Debug, Clone)]
pub struct ScrubOutcome {
    pub raster: PreparedRaster,
    pub redacted: Vec<Rect>,
    /// Same order and geometry as the input blocks.
    pub blocks: Vec<TextBlock>,
}

/// Block-level PII detection and redaction.
pub struct PrivacyScrubber {
    kinds: Vec<PiiKind>,
    padding_px: f32,
    upscale: f32,
}

impl PrivacyScrubber {
    /// `upscale` is the factor recognition ran at; block coordinates are
    /// divided by it to land on the source raster.
    pub fn new(config: &ScrubConfig, upscale: f32) -> Self {
        let mut kinds = Vec::new();
        if config.emails {
            kinds.push(PiiKind::Email);
        }
        if config.ssn {
            kinds.push(PiiKind::Ssn);
        }
        if config.phones {
            kinds.push(PiiKind::Phone);
        }
        if config.card_numbers {
            kinds.push(PiiKind::CardNumber);
        }
        Self {
            kinds,
            padding_px: config.padding_px.max(0.0),
            upscale: if upscale.is_finite() && upscale > 0.0 {
                upscale
            } else {
                1.0
            },
        }
    }

    /// First enabled detector matching `text`.
    pub fn detect(&self, text: &str) -> Option<PiiKind> {
        self.kinds.iter().copied().find(|kind| matches(*kind, text))
    }

    /// `text` with every span an enabled detector matches replaced by
    /// [`REDACTED_TEXT`].
    pub fn redact_text(&self, text: &str) -> String {
        let mut out = text.to_string();
        for kind in &self.kinds {
            out = match kind {
                PiiKind::Email => RE_EMAIL.replace_all(&out, REDACTED_TEXT).into_owned(),
                PiiKind::Ssn => RE_SSN.replace_all(&out, REDACTED_TEXT).into_owned(),
                PiiKind::Phone => {
                    let nanp = RE_PHONE_NANP.replace_all(&out, REDACTED_TEXT).into_owned();
                    RE_PHONE_INTL.replace_all(&nanp, REDACTED_TEXT).into_owned()
                }
                PiiKind::CardNumber => RE_CARD
                    .replace_all(&out, |caps: &Captures| {
                        if is_card_number(&caps[0]) {
                            REDACTED_TEXT.to_string()
                        } else {
                            caps[0].to_string()
                        }
                    })
                    .into_owned(),
            };
        }
        out
    }

    /// Paint every block whose text contains PII and scrub its text.
    #[instrument(skip_all, fields(width = image.width(), height = image.height(), blocks = blocks.len()))]
    pub fn scrub(&self, mut image: DynamicImage, blocks: &[TextBlock]) -> ScrubOutcome {
        let (w, h) = (image.width() as f32, image.height() as f32);
        let mut redacted = Vec::new();
        let mut scrubbed = blocks.to_vec();

        for block in scrubbed.iter_mut() {
            let Some(kind) = self.detect(&block.text) else {
                continue;
            };
            block.text = self.redact_text(&block.text);
            let region = block
                .rect()
                .scale(1.0 / self.upscale)
                .pad(self.padding_px)
                .clamp_to(w, h);

            let x0 = region.x.floor();
            let y0 = region.y.floor();
            let x1 = region.right().ceil().min(w);
            let y1 = region.bottom().ceil().min(h);
            if x1 <= x0 || y1 <= y0 {
                continue;
            }
            let painted = Rect::new(x0, y0, x1 - x0, y1 - y0);
            draw_filled_rect_mut(
                &mut image,
                PixelRect::at(x0 as i32, y0 as i32).of_size(painted.width as u32, painted.height as u32),
                Rgba([0, 0, 0, 255]),
            );
            debug!(?kind, x = x0, y = y0, "Region redacted");
            redacted.push(painted);
        }

        info!(redacted = redacted.len(), "Privacy scrub complete");
        ScrubOutcome {
            raster: PreparedRaster {
                image,
                scrubbed: true,
            },
            redacted,
            blocks: scrubbed,
        }
    }
}

fn matches(kind: PiiKind, text: &str) -> bool {
    match kind {
        PiiKind::Email => RE_EMAIL.is_match(text),
        PiiKind::Ssn => RE_SSN.is_match(text),
        PiiKind::Phone => RE_PHONE_NANP.is_match(text) || RE_PHONE_INTL.is_match(text),
        PiiKind::CardNumber => RE_CARD.find_iter(text).any(|m| is_card_number(m.as_str())),
    }
}

fn is_card_number(candidate: &str) -> bool {
    let digits: Vec<u32> = candidate.chars().filter_map(|c| c.to_digit(10)).collect();
    (13..=19).contains(&digits.len()) && luhn_valid(&digits)
}

/// Luhn checksum over a digit sequence.
fn luhn_valid(digits: &[u32]) -> bool {
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}
