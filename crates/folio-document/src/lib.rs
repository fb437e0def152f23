// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// folio-document — Page-level processing for Folio.
//
// Provides rasterizers (image sequences, scanned PDFs), recognition adapters
// with preprocessing profiles, the multi-pass voter, the privacy scrubber,
// MRC layering, the document assembler with its searchable-PDF writer, and
// the export formatter.

pub mod assemble;
pub mod export;
pub mod image;
pub mod mrc;
pub mod pdf;
pub mod raster;
pub mod recognize;
pub mod scan;
pub mod scrub;
pub mod vote;

// Re-export the primary structs so callers can use `folio_document::MultiPassVoter` etc.
pub use assemble::{
    BackgroundLayer, DocumentAssembler, PageArtifact, StrokeStyle, TextPlacement, VectorPrimitive,
};
pub use export::{
    ExportBundle, ExportFormatter, confidence_json, table_to_csv, write_tables_csv,
};
pub use image::processor::ImageProcessor;
pub use mrc::MrcLayers;
pub use pdf::reader::EmbeddedImageRasterizer;
pub use pdf::writer::{ContainerWriter, SearchablePdfWriter};
pub use raster::{EncodedPage, ImageSequenceRasterizer, RasterImage, Rasterizer, decode_page};
pub use recognize::{
    ProfiledAdapter, RecognitionAdapter, TesseractAdapter, TesseractEngine, TextEngine,
};
pub use scan::enhance::ScanEnhancer;
pub use scrub::{PiiKind, PreparedRaster, PrivacyScrubber, REDACTED_TEXT, ScrubOutcome};
pub use vote::{MultiPassVoter, VoteOutcome};

#[cfg(feature = "ocr")]
pub use scan::ocr::{OcrModelPaths, OcrsAdapter, OcrsEngine};
