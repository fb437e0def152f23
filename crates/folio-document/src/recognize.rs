// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Recognition adapters — the seam between the layout pipeline and whichever
// text engine turns a raster into positioned, scored text.
//
// `RecognitionAdapter` is what the voter calls. `TextEngine` is the narrower
// interface a concrete engine implements; `ProfiledAdapter` joins the two by
// applying the preprocessing profile and ruling-line detection around any
// engine.

use std::collections::BTreeMap;
use std::process::Command;

use folio_core::config::RecognitionConfig;
use folio_core::error::{FolioError, Result};
use folio_core::{PreprocessProfile, Recognition, Rect, TextBlock};
use image::{DynamicImage, ImageFormat};
use tracing::{debug, info, instrument, warn};

use crate::scan::profile::apply_profile;
use crate::scan::rules::detect_rules;

/// Turns a page raster into text blocks and graphic marks.
///
/// Coordinates are in the pixel space of the raster the adapter actually
/// read, which may be upscaled relative to `image`.
pub trait RecognitionAdapter: Send + Sync {
    fn recognize(&self, image: &DynamicImage, profile: PreprocessProfile) -> Result<Recognition>;

    /// Factor between the input raster and the coordinates reported.
    fn upscale(&self) -> f32 {
        1.0
    }
}

/// A text engine reading an already-prepared raster.
pub trait TextEngine: Send + Sync {
    fn name(&self) -> &'static str;

    /// Line-level blocks with confidences in `0..=1`.
    fn read_blocks(&self, image: &DynamicImage) -> Result<Vec<TextBlock>>;
}

/// Applies a preprocessing profile (and the configured upscale) before
/// delegating to a [`TextEngine`], then adds ruling lines found on the
/// prepared raster.
pub struct ProfiledAdapter<E> {
    engine: E,
    config: RecognitionConfig,
}

impl<E: TextEngine> ProfiledAdapter<E> {
    pub fn new(engine: E, config: RecognitionConfig) -> Self {
        Self { engine, config }
    }
}

impl<E: TextEngine> RecognitionAdapter for ProfiledAdapter<E> {
    #[instrument(skip(self, image), fields(engine = self.engine.name(), %profile))]
    fn recognize(&self, image: &DynamicImage, profile: PreprocessProfile) -> Result<Recognition> {
        let prepared = apply_profile(image, profile, self.config.upscale);
        let blocks = self.engine.read_blocks(&prepared)?;
        let graphics = detect_rules(&prepared.to_luma8(), self.config.rule_min_fraction);
        debug!(
            blocks = blocks.len(),
            graphics = graphics.len(),
            "Recognition pass complete"
        );
        Ok(Recognition::new(blocks, graphics))
    }

    fn upscale(&self) -> f32 {
        self.config.upscale
    }
}

// ---------------------------------------------------------------------------
// Tesseract
// ---------------------------------------------------------------------------

/// The system `tesseract` binary, driven through its TSV output so every
/// word carries a position and confidence.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    language: String,
}

/// Tesseract behind the standard profile handling.
pub type TesseractAdapter = ProfiledAdapter<TesseractEngine>;

impl TesseractAdapter {
    pub fn from_config(config: RecognitionConfig) -> Self {
        let engine = TesseractEngine::new(config.language.clone());
        Self::new(engine, config)
    }
}

impl TesseractEngine {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
        }
    }
}

impl TextEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    #[instrument(skip_all, fields(width = image.width(), height = image.height(), lang = %self.language))]
    fn read_blocks(&self, image: &DynamicImage) -> Result<Vec<TextBlock>> {
        let input = tempfile::Builder::new()
            .prefix("folio-page-")
            .suffix(".png")
            .tempfile()?;
        image
            .save_with_format(input.path(), ImageFormat::Png)
            .map_err(|err| {
                FolioError::Recognition(format!("failed to stage page for tesseract: {}", err))
            })?;

        let output = Command::new("tesseract")
            .arg(input.path())
            .arg("stdout")
            .args(["-l", &self.language])
            .args(["--psm", "3"])
            .arg("tsv")
            .output()
            .map_err(|err| {
                if err.kind() == std::io::ErrorKind::NotFound {
                    FolioError::Recognition(
                        "tesseract not found (install tesseract-ocr)".to_string(),
                    )
                } else {
                    FolioError::Recognition(format!("failed to run tesseract: {}", err))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FolioError::Recognition(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let blocks = parse_tsv(&String::from_utf8_lossy(&output.stdout));
        info!(lines = blocks.len(), "Tesseract recognition complete");
        Ok(blocks)
    }
}

/// Word-level TSV row level.
const TSV_WORD_LEVEL: &str = "5";

#[derive(Default)]
struct LineAccumulator {
    words: Vec<String>,
    rects: Vec<Rect>,
    confidence_sum: f32,
    scored: usize,
}

/// Group Tesseract TSV word rows into one block per recognised line.
///
/// Line confidence is the mean of its word confidences (0-100 scaled to
/// 0-1); words Tesseract reports with a negative confidence are unscored.
pub fn parse_tsv(tsv: &str) -> Vec<TextBlock> {
    // Keyed by (page, block, paragraph, line); BTreeMap keeps engine order.
    let mut lines: BTreeMap<(u32, u32, u32, u32), LineAccumulator> = BTreeMap::new();

    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 || cols[0] != TSV_WORD_LEVEL {
            continue;
        }
        let text = cols[11].trim();
        if text.is_empty() {
            continue;
        }
        let num = |i: usize| cols[i].trim().parse::<u32>().ok();
        let (Some(page), Some(block), Some(par), Some(line)) = (num(1), num(2), num(3), num(4))
        else {
            warn!(row, "Skipping malformed TSV row");
            continue;
        };
        let (Some(left), Some(top), Some(width), Some(height)) = (num(6), num(7), num(8), num(9))
        else {
            warn!(row, "Skipping TSV row without geometry");
            continue;
        };
        let conf = cols[10].trim().parse::<f32>().unwrap_or(-1.0);

        let acc = lines.entry((page, block, par, line)).or_default();
        acc.words.push(text.to_string());
        acc.rects.push(Rect::new(left as f32, top as f32, width as f32, height as f32));
        if conf >= 0.0 {
            acc.confidence_sum += conf / 100.0;
            acc.scored += 1;
        }
    }

    lines
        .into_values()
        .filter_map(|acc| {
            let bounds = Rect::enclosing(acc.rects)?;
            let confidence = if acc.scored == 0 {
                0.0
            } else {
                acc.confidence_sum / acc.scored as f32
            };
            Some(TextBlock::new(
                acc.words.join(" "),
                bounds.x,
                bounds.y,
                bounds.width,
                bounds.height,
                confidence,
            ))
        })
        .collect()
}
