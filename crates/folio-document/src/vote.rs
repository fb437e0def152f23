// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Multi-pass voter — recognises a page under each preprocessing profile and
// keeps the pass with the higher mean confidence.

use std::sync::Arc;

use folio_core::config::VoterConfig;
use folio_core::error::Result;
use folio_core::{PreprocessProfile, Recognition};
use image::DynamicImage;
use tracing::{debug, info, instrument, warn};

use crate::recognize::RecognitionAdapter;

/// The winning pass for one page.
#[derive(Debug, Clone, PartialEq)]
pub struct VoteOutcome {
    pub recognition: Recognition,
    /// `None` when every pass failed.
    pub profile: Option<PreprocessProfile>,
    pub mean_confidence: f32,
}

impl VoteOutcome {
    fn failed() -> Self {
        Self {
            recognition: Recognition::default(),
            profile: None,
            mean_confidence: 0.0,
        }
    }

    pub fn is_recognized(&self) -> bool {
        self.profile.is_some()
    }
}

/// Runs the `Binarized` and `Nuanced` passes and votes between them.
pub struct MultiPassVoter {
    adapter: Arc<dyn RecognitionAdapter>,
    config: VoterConfig,
}

impl MultiPassVoter {
    pub fn new(adapter: Arc<dyn RecognitionAdapter>, config: VoterConfig) -> Self {
        Self { adapter, config }
    }

    /// Recognise `image` under both profiles and keep the better pass.
    ///
    /// Never fails: a pass that errors is logged and discarded, and if both
    /// fail the outcome is empty with `profile = None`.
    #[instrument(skip_all, fields(width = image.width(), height = image.height(), parallel = self.config.parallel))]
    pub fn vote(&self, image: &DynamicImage) -> VoteOutcome {
        let adapter = self.adapter.as_ref();
        let pass = |profile| adapter.recognize(image, profile);

        let (binarized, nuanced) = if self.config.parallel {
            rayon::join(
                || pass(PreprocessProfile::Binarized),
                || pass(PreprocessProfile::Nuanced),
            )
        } else {
            (
                pass(PreprocessProfile::Binarized),
                pass(PreprocessProfile::Nuanced),
            )
        };

        let outcome = choose(binarized, nuanced);
        info!(
            profile = ?outcome.profile,
            mean_confidence = outcome.mean_confidence,
            blocks = outcome.recognition.blocks.len(),
            "Vote complete"
        );
        outcome
    }
}

/// Pick between the two passes. Ties favour `Binarized`.
pub fn choose(binarized: Result<Recognition>, nuanced: Result<Recognition>) -> VoteOutcome {
    let scored = |profile: PreprocessProfile, result: Result<Recognition>| match result {
        Ok(recognition) => {
            let mean = recognition.mean_confidence();
            debug!(%profile, mean, blocks = recognition.blocks.len(), "Pass scored");
            Some(VoteOutcome {
                recognition,
                profile: Some(profile),
                mean_confidence: mean,
            })
        }
        Err(err) => {
            warn!(%profile, %err, "Recognition pass failed");
            None
        }
    };

    match (
        scored(PreprocessProfile::Binarized, binarized),
        scored(PreprocessProfile::Nuanced, nuanced),
    ) {
        (Some(b), Some(n)) => {
            if n.mean_confidence > b.mean_confidence {
                n
            } else {
                b
            }
        }
        (Some(only), None) | (None, Some(only)) => only,
        (None, None) => {
            warn!("Every recognition pass failed; page left unrecognised");
            VoteOutcome::failed()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::{FolioError, TextBlock};
    use image::GrayImage;

    /// Deterministic adapter: fixed confidence per profile, `None` fails.
    struct ScriptedAdapter {
        binarized: Option<f32>,
        nuanced: Option<f32>,
    }

    impl RecognitionAdapter for ScriptedAdapter {
        fn recognize(&self, _image: &DynamicImage, profile: PreprocessProfile) -> Result<Recognition> {
            let conf = match profile {
                PreprocessProfile::Binarized => self.binarized,
                PreprocessProfile::Nuanced => self.nuanced,
            };
            let conf = conf.ok_or_else(|| FolioError::Recognition(format!("{profile} pass crashed")))?;
            Ok(Recognition::new(
                vec![TextBlock::new(profile.name(), 0.0, 0.0, 10.0, 10.0, conf)],
                Vec::new(),
            ))
        }
    }

    fn vote(binarized: Option<f32>, nuanced: Option<f32>, parallel: bool) -> VoteOutcome {
        let voter = MultiPassVoter::new(
            Arc::new(ScriptedAdapter { binarized, nuanced }),
            VoterConfig { parallel },
        );
        voter.vote(&DynamicImage::ImageLuma8(GrayImage::new(8, 8)))
    }

    #[test]
    fn higher_mean_confidence_wins() {
        let outcome = vote(Some(0.6), Some(0.9), false);
        assert_eq!(outcome.profile, Some(PreprocessProfile::Nuanced));
        assert!((outcome.mean_confidence - 0.9).abs() < 1e-6);
        assert_eq!(outcome.recognition.blocks[0].text, "nuanced");
    }

    #[test]
    fn tie_favours_binarized() {
        let outcome = vote(Some(0.8), Some(0.8), false);
        assert_eq!(outcome.profile, Some(PreprocessProfile::Binarized));
    }

    #[test]
    fn single_failure_falls_back_to_other_pass() {
        assert_eq!(
            vote(None, Some(0.4), false).profile,
            Some(PreprocessProfile::Nuanced)
        );
        assert_eq!(
            vote(Some(0.4), None, false).profile,
            Some(PreprocessProfile::Binarized)
        );
    }

    #[test]
    fn double_failure_is_unrecognised_not_an_error() {
        let outcome = vote(None, None, false);
        assert!(!outcome.is_recognized());
        assert!(outcome.recognition.blocks.is_empty());
        assert_eq!(outcome.mean_confidence, 0.0);
    }

    #[test]
    fn parallel_and_sequential_agree() {
        for (b, n) in [(Some(0.7), Some(0.5)), (Some(0.2), Some(0.3)), (None, Some(0.1))] {
            assert_eq!(vote(b, n, true), vote(b, n, false));
        }
    }
}
