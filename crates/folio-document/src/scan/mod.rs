// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan preparation — binarization, preprocessing profiles, ruling-line
// detection, and the optional pure-Rust text engine.

pub mod enhance;
pub mod profile;
pub mod rules;

#[cfg(feature = "ocr")]
pub mod ocr;

pub use enhance::{ScanEnhancer, ink_mask, otsu_threshold};
pub use profile::{ProfileSettings, apply_profile};
pub use rules::detect_rules;

#[cfg(feature = "ocr")]
pub use ocr::{OcrModelPaths, OcrsAdapter, OcrsEngine};
