// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pure-Rust text engine backed by `ocrs` neural models executed via `rten`.
//
// # Feature Gate
//
// This module is only available when the `ocr` feature is enabled:
//
// ```toml
// folio-document = { path = "crates/folio-document", features = ["ocr"] }
// ```
//
// # Model Setup
//
// The engine requires two model files:
//
// - **Detection model** (`text-detection.rten`): locates text regions.
// - **Recognition model** (`text-recognition.rten`): decodes characters.
//
// Running `ocrs-cli` once downloads both to `$XDG_CACHE_HOME/ocrs`
// (typically `~/.cache/ocrs`), which is where the default config looks.

use std::path::{Path, PathBuf};

use folio_core::config::RecognitionConfig;
use folio_core::error::{FolioError, Result};
use folio_core::{Rect, TextBlock};
use image::DynamicImage;
use ocrs::{ImageSource, OcrEngine as OcrsRuntime, OcrEngineParams};
use rten::Model;
use tracing::{debug, info, instrument};

use crate::recognize::{ProfiledAdapter, TextEngine};

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// `$XDG_CACHE_HOME/ocrs`, falling back to `~/.cache/ocrs`.
fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

/// Locations of the two model files.
#[derive(Debug, Clone)]
pub struct OcrModelPaths {
    pub detection_model_path: PathBuf,
    pub recognition_model_path: PathBuf,
}

impl Default for OcrModelPaths {
    fn default() -> Self {
        Self::from_dir(default_model_dir())
    }
}

impl OcrModelPaths {
    /// Expects `dir` to contain `text-detection.rten` and `text-recognition.rten`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection_model_path: dir.join(DETECTION_MODEL_FILENAME),
            recognition_model_path: dir.join(RECOGNITION_MODEL_FILENAME),
        }
    }

    pub fn validate(&self) -> Result<()> {
        for path in [&self.detection_model_path, &self.recognition_model_path] {
            if !path.exists() {
                return Err(FolioError::InvalidConfig(format!(
                    "OCR model not found at {}; run `ocrs-cli` once to download models",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

/// The `ocrs` engine. Model loading is the expensive step; build one and
/// reuse it for every page.
pub struct OcrsEngine {
    engine: OcrsRuntime,
}

/// ocrs behind the standard profile handling.
pub type OcrsAdapter = ProfiledAdapter<OcrsEngine>;

impl OcrsAdapter {
    pub fn from_models(paths: OcrModelPaths, config: RecognitionConfig) -> Result<Self> {
        Ok(Self::new(OcrsEngine::new(paths)?, config))
    }
}

impl OcrsEngine {
    #[instrument(skip_all, fields(
        detection = %paths.detection_model_path.display(),
        recognition = %paths.recognition_model_path.display(),
    ))]
    pub fn new(paths: OcrModelPaths) -> Result<Self> {
        paths.validate()?;

        let load = |path: &Path| {
            Model::load_file(path).map_err(|err| {
                FolioError::Recognition(format!(
                    "failed to load model from {}: {}",
                    path.display(),
                    err
                ))
            })
        };
        let detection_model = load(&paths.detection_model_path)?;
        let recognition_model = load(&paths.recognition_model_path)?;

        let engine = OcrsRuntime::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|err| {
            FolioError::Recognition(format!("failed to initialise OCR engine: {}", err))
        })?;

        info!("OCR engine initialised");
        Ok(Self { engine })
    }

    /// Engine using models from the default cache directory.
    pub fn with_defaults() -> Result<Self> {
        Self::new(OcrModelPaths::default())
    }
}

impl TextEngine for OcrsEngine {
    fn name(&self) -> &'static str {
        "ocrs"
    }

    /// ocrs reports no per-line scores, so each line is scored with
    /// [`line_confidence`] from its decoded text and detected word count.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    fn read_blocks(&self, image: &DynamicImage) -> Result<Vec<TextBlock>> {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();

        let source = ImageSource::from_bytes(rgb.as_raw(), (width, height)).map_err(|err| {
            FolioError::Recognition(format!(
                "failed to create image source ({}x{}): {}",
                width, height, err
            ))
        })?;
        let input = self
            .engine
            .prepare_input(source)
            .map_err(|err| FolioError::Recognition(format!("OCR preprocessing failed: {}", err)))?;

        let word_rects = self
            .engine
            .detect_words(&input)
            .map_err(|err| FolioError::Recognition(format!("word detection failed: {}", err)))?;
        let line_rects = self.engine.find_text_lines(&input, &word_rects);
        let line_texts = self
            .engine
            .recognize_text(&input, &line_rects)
            .map_err(|err| FolioError::Recognition(format!("line recognition failed: {}", err)))?;

        let mut blocks = Vec::with_capacity(line_texts.len());
        for (words, line) in line_rects.iter().zip(line_texts.iter()) {
            let Some(line) = line else { continue };
            let text = line.to_string();
            if text.trim().is_empty() {
                continue;
            }
            let confidence = line_confidence(&text, words.len());
            let rects = words.iter().map(|w| {
                let r = w.bounding_rect();
                Rect::new(r.left(), r.top(), r.width(), r.height())
            });
            if let Some(bounds) = Rect::enclosing(rects) {
                blocks.push(TextBlock::new(
                    text.trim(),
                    bounds.x.max(0.0),
                    bounds.y.max(0.0),
                    bounds.width,
                    bounds.height,
                    confidence,
                ));
            }
        }

        debug!(
            words = word_rects.len(),
            lines = blocks.len(),
            "ocrs recognition complete"
        );
        Ok(blocks)
    }
}

/// Plausibility score in `[0, 1]` for a decoded line.
///
/// Multiplies the share of characters that are letters, digits or ordinary
/// punctuation by how well the token count agrees with the number of words
/// the detector found. Noise decoded from speckle or bleed-through scores
/// low on both.
pub fn line_confidence(text: &str, detected_words: usize) -> f32 {
    let glyphs: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    if glyphs.is_empty() {
        return 0.0;
    }
    let plausible = glyphs
        .iter()
        .filter(|c| c.is_alphanumeric() || ".,;:!?'\"()-/$%&#@+*".contains(**c))
        .count();
    let glyph_score = plausible as f32 / glyphs.len() as f32;

    let tokens = text.split_whitespace().count();
    let agreement = match tokens.max(detected_words) {
        0 => 1.0,
        most => tokens.min(detected_words) as f32 / most as f32,
    };
    (glyph_score * (0.5 + 0.5 * agreement)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_paths_end_with_model_filenames() {
        let paths = OcrModelPaths::default();
        assert!(paths.detection_model_path.ends_with(DETECTION_MODEL_FILENAME));
        assert!(paths.recognition_model_path.ends_with(RECOGNITION_MODEL_FILENAME));
    }

    #[test]
    fn paths_from_dir() {
        let paths = OcrModelPaths::from_dir("/tmp/my-models");
        assert_eq!(
            paths.detection_model_path,
            PathBuf::from("/tmp/my-models/text-detection.rten")
        );
        assert_eq!(
            paths.recognition_model_path,
            PathBuf::from("/tmp/my-models/text-recognition.rten")
        );
    }

    #[test]
    fn clean_lines_score_full_confidence() {
        assert_eq!(line_confidence("Invoice total: $42.00", 3), 1.0);
    }

    #[test]
    fn noisy_or_mismatched_lines_score_lower() {
        let clean = line_confidence("Net amount due", 3);
        let noise = line_confidence("~|^ ¬¦ ~~", 3);
        let split = line_confidence("Net amount due", 6);
        assert!(noise < 0.5, "noise scored {noise}");
        assert!(split < clean && split >= 0.5, "split scored {split}");
        assert_eq!(line_confidence("   ", 0), 0.0);
    }

    #[test]
    fn missing_models_fail_validation() {
        let err = OcrModelPaths::from_dir("/nonexistent/path/ocr-models")
            .validate()
            .unwrap_err();
        assert!(matches!(err, FolioError::InvalidConfig(_)));
    }
}
