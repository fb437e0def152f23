// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page processor — runs one page through vote, scrub, layout and assembly.
// Synchronous and CPU-bound; the worker pool calls it from blocking tasks.

use std::sync::Arc;

use folio_core::{FolioConfig, PageFailure, PageResult};
use folio_document::{
    DocumentAssembler, MultiPassVoter, PageArtifact, PreparedRaster, PrivacyScrubber,
    RasterImage, RecognitionAdapter, decode_page,
};
use folio_layout::ZoneClassifier;
use tracing::{debug, instrument, warn};

/// A successfully processed page.
#[derive(Debug, Clone)]
pub struct ProcessedPage {
    pub result: PageResult,
    pub artifact: PageArtifact,
}

/// What a worker reports for one page.
#[derive(Debug, Clone)]
pub enum PageOutcome {
    Done(Box<ProcessedPage>),
    Failed(PageFailure),
}

impl PageOutcome {
    pub fn page_number(&self) -> u32 {
        match self {
            Self::Done(page) => page.result.page_number,
            Self::Failed(failure) => failure.page_number,
        }
    }

    pub(crate) fn failed(page_number: u32, reason: impl Into<String>) -> Self {
        Self::Failed(PageFailure {
            page_number,
            reason: reason.into(),
        })
    }
}

pub struct PageProcessor {
    voter: MultiPassVoter,
    upscale: f32,
    scrubber: Option<PrivacyScrubber>,
    classifier: ZoneClassifier,
    assembler: DocumentAssembler,
}

impl PageProcessor {
    pub fn new(adapter: Arc<dyn RecognitionAdapter>, config: &FolioConfig) -> Self {
        let upscale = adapter.upscale();
        let upscale = if upscale.is_finite() && upscale > 0.0 {
            upscale
        } else {
            1.0
        };
        Self {
            voter: MultiPassVoter::new(adapter, config.voter.clone()),
            upscale,
            scrubber: config
                .scrub
                .enabled
                .then(|| PrivacyScrubber::new(&config.scrub, upscale)),
            classifier: ZoneClassifier::new(config.zones.clone(), config.table.clone()),
            assembler: DocumentAssembler::new(config.assembly.clone(), config.mrc.clone()),
        }
    }

    /// Decode and process one encoded page. Decode failures are confined to
    /// this page.
    pub fn process_encoded(&self, page_number: u32, bytes: &[u8], dpi: f32) -> PageOutcome {
        match decode_page(bytes, dpi) {
            Ok(raster) => PageOutcome::Done(Box::new(self.process(page_number, raster))),
            Err(err) => {
                warn!(page_number, %err, "Page could not be decoded");
                PageOutcome::failed(page_number, err.to_string())
            }
        }
    }

    /// Process a decoded page. Never fails: a page nothing could read is
    /// returned unrecognised with an empty overlay.
    #[instrument(skip(self, raster), fields(width = raster.image.width(), height = raster.image.height(), dpi = raster.dpi))]
    pub fn process(&self, page_number: u32, raster: RasterImage) -> ProcessedPage {
        let RasterImage { image, dpi } = raster;
        let (width, height) = (image.width() as f32, image.height() as f32);

        let mut vote = self.voter.vote(&image);

        // Redact before anything compresses the raster or reads the text.
        let (prepared, redacted) = match &self.scrubber {
            Some(scrubber) => {
                let outcome = scrubber.scrub(image, &vote.recognition.blocks);
                vote.recognition.blocks = outcome.blocks;
                (outcome.raster, outcome.redacted)
            }
            None => (PreparedRaster::unscrubbed(image), Vec::new()),
        };

        let recognition = vote.recognition.scaled(1.0 / self.upscale);
        let zones = self.classifier.classify(&recognition.blocks, width, height);
        let result = PageResult {
            page_number,
            width,
            height,
            zones,
            recognized: vote.profile.is_some(),
            profile: vote.profile,
            mean_confidence: vote.mean_confidence,
        };

        let artifact =
            self.assembler
                .assemble(&result, &recognition.graphics, &prepared, &redacted, dpi);
        debug!(
            zones = result.zones.len(),
            blocks = result.block_count(),
            redacted = redacted.len(),
            "Page processed"
        );
        ProcessedPage { result, artifact }
    }
}
