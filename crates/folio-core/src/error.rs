// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Folio.

use thiserror::Error;

/// Top-level error type for all Folio operations.
#[derive(Debug, Error)]
pub enum FolioError {
    // -- Input validation --
    #[error("unsupported input format: {0}")]
    UnsupportedFormat(String),

    #[error("image decoding failed: {0}")]
    ImageDecode(String),

    #[error("rasterization failed: {0}")]
    Rasterize(String),

    #[error("PDF operation failed: {0}")]
    Pdf(String),

    // -- Recognition --
    #[error("recognition failed: {0}")]
    Recognition(String),

    // -- Output --
    #[error("export failed: {0}")]
    Export(String),

    // -- Whole-job failures --
    #[error("document has no pages")]
    NoPages,

    #[error("none of the {0} pages could be decoded")]
    AllPagesFailed(usize),

    // -- Dispatch --
    #[error("job {0} was abandoned before it completed")]
    JobAbandoned(u64),

    #[error("worker pool is closed")]
    PoolClosed,

    // -- Configuration --
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// How far a failure reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Confined to one page; sibling pages continue.
    PerPage,
    /// The whole conversion is rejected.
    WholeJob,
    /// The caller supplied settings that can never work.
    Config,
}

impl FolioError {
    /// Classify the error for propagation decisions.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::UnsupportedFormat(_)
            | Self::ImageDecode(_)
            | Self::Recognition(_)
            | Self::Rasterize(_)
            | Self::JobAbandoned(_) => ErrorClass::PerPage,
            Self::InvalidConfig(_) => ErrorClass::Config,
            Self::Pdf(_)
            | Self::Export(_)
            | Self::NoPages
            | Self::AllPagesFailed(_)
            | Self::PoolClosed
            | Self::Io(_)
            | Self::Serialization(_) => ErrorClass::WholeJob,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FolioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_errors_stay_on_their_page() {
        assert_eq!(
            FolioError::ImageDecode("truncated".into()).class(),
            ErrorClass::PerPage
        );
        assert_eq!(
            FolioError::UnsupportedFormat("gif".into()).class(),
            ErrorClass::PerPage
        );
    }

    #[test]
    fn empty_documents_reject_the_job() {
        assert_eq!(FolioError::NoPages.class(), ErrorClass::WholeJob);
        assert_eq!(FolioError::AllPagesFailed(3).class(), ErrorClass::WholeJob);
        assert_eq!(
            FolioError::AllPagesFailed(3).to_string(),
            "none of the 3 pages could be decoded"
        );
    }
}
