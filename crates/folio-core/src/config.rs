// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline configuration. Every heuristic constant lives here so it can be
// tuned per corpus without touching the algorithms.

use serde::{Deserialize, Serialize};

use crate::error::{FolioError, Result};

/// Settings for one conversion pipeline instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FolioConfig {
    pub zones: ZoneConfig,
    pub table: TableConfig,
    pub reflow: ReflowConfig,
    pub voter: VoterConfig,
    pub recognition: RecognitionConfig,
    pub scrub: ScrubConfig,
    pub mrc: MrcConfig,
    pub assembly: AssemblyConfig,
    pub export: ExportConfig,
    pub pool: PoolConfig,
}

impl FolioConfig {
    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make the heuristics meaningless.
    pub fn validate(&self) -> Result<()> {
        let z = &self.zones;
        if !(0.0..1.0).contains(&z.header_fraction)
            || !(0.0..=1.0).contains(&z.footer_fraction)
            || z.header_fraction >= z.footer_fraction
        {
            return Err(FolioError::InvalidConfig(format!(
                "header/footer fractions must satisfy 0 <= header < footer <= 1, got {} / {}",
                z.header_fraction, z.footer_fraction
            )));
        }
        if !(0.0..1.0).contains(&z.gutter_fraction) {
            return Err(FolioError::InvalidConfig(format!(
                "gutter fraction must be in [0, 1), got {}",
                z.gutter_fraction
            )));
        }
        if !(z.column_balance > 0.0 && z.column_balance <= 1.0) {
            return Err(FolioError::InvalidConfig(format!(
                "column balance must be in (0, 1], got {}",
                z.column_balance
            )));
        }
        positive("tabular ratio", self.table.tabular_ratio)?;
        positive("row bin", self.table.row_bin_px)?;
        positive("row gap", self.table.row_gap_px)?;
        positive("paragraph gap ratio", self.reflow.paragraph_gap_ratio)?;
        positive("upscale factor", self.recognition.upscale)?;
        if !(self.mrc.background_scale > 0.0 && self.mrc.background_scale <= 1.0) {
            return Err(FolioError::InvalidConfig(format!(
                "MRC background scale must be in (0, 1], got {}",
                self.mrc.background_scale
            )));
        }
        if self.pool.workers == 0 {
            return Err(FolioError::InvalidConfig(
                "worker pool needs at least one worker".into(),
            ));
        }
        Ok(())
    }
}

/// Finite and strictly positive; NaN fails.
fn positive(name: &str, value: f32) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(FolioError::InvalidConfig(format!(
            "{} must be a positive number, got {}",
            name, value
        )))
    }
}

/// Zone classifier thresholds (fractions of page size).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneConfig {
    /// Blocks starting above this fraction of page height are header.
    pub header_fraction: f32,
    /// Blocks starting below this fraction of page height are footer.
    pub footer_fraction: f32,
    /// Gutter width as a fraction of page width.
    pub gutter_fraction: f32,
    /// Two columns only when `|left - right| < balance * total`.
    pub column_balance: f32,
    /// Rows with at least this many blocks are table candidates.
    pub table_row_min_blocks: usize,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            header_fraction: 0.12,
            footer_fraction: 0.88,
            gutter_fraction: 0.05,
            column_balance: 0.70,
            table_row_min_blocks: 3,
        }
    }
}

/// Table detection and row clustering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Bin height used when counting unique rows for the tabularity test.
    pub row_bin_px: f32,
    /// Tabular iff `blocks > unique_rows * tabular_ratio`.
    pub tabular_ratio: f32,
    /// A block more than this far below the first block of a row starts a new row.
    pub row_gap_px: f32,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            row_bin_px: 10.0,
            tabular_ratio: 1.5,
            row_gap_px: 15.0,
        }
    }
}

/// Paragraph regrouping and node classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReflowConfig {
    /// Break when the vertical gap exceeds this multiple of the line height.
    pub paragraph_gap_ratio: f32,
    /// Single-line paragraphs at least this much taller than the page median are headings.
    pub heading_height_ratio: f32,
    /// Longer paragraphs are never headings.
    pub heading_max_chars: usize,
}

impl Default for ReflowConfig {
    fn default() -> Self {
        Self {
            paragraph_gap_ratio: 1.5,
            heading_height_ratio: 1.3,
            heading_max_chars: 120,
        }
    }
}

/// Multi-pass voting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VoterConfig {
    /// Run both profiles concurrently instead of one after the other.
    pub parallel: bool,
}

/// Preprocessing applied ahead of the text engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Upscale factor applied before recognition; blocks come back in
    /// upscaled pixels.
    pub upscale: f32,
    /// Tesseract language code.
    pub language: String,
    /// Minimum run length, as a fraction of page extent, for a ruling line.
    pub rule_min_fraction: f32,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            upscale: 1.0,
            language: "eng".into(),
            rule_min_fraction: 0.2,
        }
    }
}

/// Which PII detectors are active.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrubConfig {
    pub enabled: bool,
    pub emails: bool,
    pub ssn: bool,
    pub phones: bool,
    pub card_numbers: bool,
    /// Extra pixels painted around each match.
    pub padding_px: f32,
}

impl Default for ScrubConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            emails: true,
            ssn: true,
            phones: true,
            card_numbers: true,
            padding_px: 2.0,
        }
    }
}

/// Two-layer background settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MrcConfig {
    /// Background layer size relative to the source raster.
    pub background_scale: f32,
}

impl Default for MrcConfig {
    fn default() -> Self {
        Self {
            background_scale: 1.0 / 3.0,
        }
    }
}

/// How the output page background is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BackgroundMode {
    /// The (possibly scrubbed) raster as one image.
    #[default]
    Single,
    /// Low-resolution colour background plus a full-resolution ink mask.
    Mrc,
}

/// Document assembly options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyConfig {
    pub background: BackgroundMode,
    /// Draw vector graphics natively on top of the background.
    pub redraw_graphics: bool,
    /// Draw redaction boxes as vector rectangles as well as burning them in.
    pub draw_redactions: bool,
    /// Rasterization DPI when the rasterizer does not know the source DPI.
    pub default_dpi: f32,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            background: BackgroundMode::Single,
            redraw_graphics: true,
            draw_redactions: true,
            default_dpi: 300.0,
        }
    }
}

/// Which optional artifacts the export formatter produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Collect tabular grids when any table was found.
    pub tables: bool,
    /// Collect per-block text/confidence diagnostics.
    pub confidence_map: bool,
    /// Separator between pages in the flattened text.
    pub page_separator: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            tables: true,
            confidence_map: true,
            page_separator: "\n\n".to_string(),
        }
    }
}

/// Worker pool sizing and buffer sharing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub workers: usize,
    /// Per-worker queue depth.
    pub queue_depth: usize,
    /// Encoded page buffers at least this large are shared, not copied.
    pub share_threshold_bytes: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_depth: 8,
            share_threshold_bytes: 2 * 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        FolioConfig::default().validate().expect("defaults validate");
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = FolioConfig::from_json(r#"{ "table": { "tabular_ratio": 1.8 } }"#)
            .expect("parse");
        assert_eq!(config.table.tabular_ratio, 1.8);
        assert_eq!(config.table.row_gap_px, 15.0);
        assert_eq!(config.zones.header_fraction, 0.12);
    }

    #[test]
    fn inverted_header_footer_is_rejected() {
        let mut config = FolioConfig::default();
        config.zones.header_fraction = 0.9;
        config.zones.footer_fraction = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn nan_and_non_positive_thresholds_are_rejected() {
        let cases: [fn(&mut FolioConfig); 6] = [
            |c| c.table.tabular_ratio = f32::NAN,
            |c| c.recognition.upscale = f32::NAN,
            |c| c.reflow.paragraph_gap_ratio = f32::NAN,
            |c| c.table.row_gap_px = 0.0,
            |c| c.zones.column_balance = f32::NAN,
            |c| c.zones.column_balance = 1.5,
        ];
        for (i, mutate) in cases.iter().enumerate() {
            let mut config = FolioConfig::default();
            mutate(&mut config);
            assert!(
                matches!(config.validate(), Err(FolioError::InvalidConfig(_))),
                "case {i} should be rejected"
            );
        }
    }

    #[test]
    fn zero_workers_is_rejected() {
        let err = FolioConfig::from_json(r#"{ "pool": { "workers": 0 } }"#).unwrap_err();
        assert!(matches!(err, FolioError::InvalidConfig(_)));
    }
}
