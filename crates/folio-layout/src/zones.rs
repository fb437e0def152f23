// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Zone classifier — partitions a page's blocks into header, footer, column
// and table-candidate zones.
//
// 1. Vertical pass: fixed fractions of page height split off header and
//    footer blocks, so the result does not depend on scan resolution.
// 2. Structural pass: rows of content holding several side-by-side blocks
//    are lifted out as table candidates (`ZoneKind::Generic`).
// 3. Column pass: the remainder is split around the page midpoint when a
//    gutter separates two roughly balanced halves.
//
// Every input block lands in exactly one output zone.

use folio_core::config::{TableConfig, ZoneConfig};
use folio_core::{TextBlock, Zone, ZoneKind};
use tracing::{debug, instrument};

use crate::table::{cluster_rows, reading_order};

/// Geometric zone classifier. Cheap to construct; holds only thresholds.
#[derive(Debug, Clone, Default)]
pub struct ZoneClassifier {
    zones: ZoneConfig,
    table: TableConfig,
}

impl ZoneClassifier {
    pub fn new(zones: ZoneConfig, table: TableConfig) -> Self {
        Self { zones, table }
    }

    /// Classify `blocks` on a page of `page_width` x `page_height` pixels.
    ///
    /// Output order: header (if any), content by ascending top edge, footer
    /// (if any). A two-column split is emitted left then right, placed by
    /// the higher of the two tops. Blocks inside each zone are in reading
    /// order.
    #[instrument(skip(self, blocks), fields(blocks = blocks.len(), page_width, page_height))]
    pub fn classify(&self, blocks: &[TextBlock], page_width: f32, page_height: f32) -> Vec<Zone> {
        if blocks.is_empty() {
            return Vec::new();
        }

        let degenerate = |v: f32| !v.is_finite() || v <= 0.0;
        if degenerate(page_width) || degenerate(page_height) {
            debug!("Degenerate page size; emitting a single column");
            return vec![self.zone(ZoneKind::Column, blocks)];
        }

        // -- Vertical pass ----------------------------------------------------
        let header_limit = self.zones.header_fraction * page_height;
        let footer_limit = self.zones.footer_fraction * page_height;

        let mut header = Vec::new();
        let mut footer = Vec::new();
        let mut content = Vec::new();
        for block in blocks {
            if block.y < header_limit {
                header.push(block.clone());
            } else if block.y > footer_limit {
                footer.push(block.clone());
            } else {
                content.push(block.clone());
            }
        }

        // -- Structural pass --------------------------------------------------
        let (tables, remainder) = self.split_table_candidates(&content);

        // -- Column pass ------------------------------------------------------
        // The column pair is ordered as one unit so left always precedes right.
        let mut units: Vec<Vec<Zone>> = tables.into_iter().map(|zone| vec![zone]).collect();
        let columns = self.detect_columns(&remainder, page_width);
        if !columns.is_empty() {
            units.push(columns);
        }
        units.sort_by(|a, b| unit_top(a).total_cmp(&unit_top(b)));
        let content_zones: Vec<Zone> = units.into_iter().flatten().collect();

        let mut zones = Vec::with_capacity(content_zones.len() + 2);
        if !header.is_empty() {
            zones.push(self.zone(ZoneKind::Header, &header));
        }
        zones.extend(content_zones);
        if !footer.is_empty() {
            zones.push(self.zone(ZoneKind::Footer, &footer));
        }

        debug!(
            zones = zones.len(),
            header = header.len(),
            footer = footer.len(),
            "Page classified"
        );
        zones
    }

    /// Lift runs of consecutive rows holding `table_row_min_blocks` or more
    /// blocks into `Generic` zones. Returns the zones and the leftover blocks.
    fn split_table_candidates(&self, content: &[TextBlock]) -> (Vec<Zone>, Vec<TextBlock>) {
        let mut zones = Vec::new();
        let mut remainder = Vec::new();
        let mut run: Vec<TextBlock> = Vec::new();

        for row in cluster_rows(content, self.table.row_gap_px) {
            if row.len() >= self.zones.table_row_min_blocks {
                run.extend(row);
            } else {
                if !run.is_empty() {
                    zones.push(Zone::new(ZoneKind::Generic, std::mem::take(&mut run)));
                }
                remainder.extend(row);
            }
        }
        if !run.is_empty() {
            zones.push(Zone::new(ZoneKind::Generic, run));
        }

        debug!(
            candidates = zones.len(),
            remainder = remainder.len(),
            "Table candidates split"
        );
        (zones, remainder)
    }

    /// Split blocks into left/right columns around the page midpoint.
    fn detect_columns(&self, blocks: &[TextBlock], page_width: f32) -> Vec<Zone> {
        if blocks.is_empty() {
            return Vec::new();
        }

        let mid = page_width / 2.0;
        let half_gutter = self.zones.gutter_fraction * page_width / 2.0;

        let mut left = Vec::new();
        let mut right = Vec::new();
        for block in blocks {
            let in_left = block.x + block.width < mid + half_gutter;
            let in_right = block.x > mid - half_gutter;
            // A block crossing the gutter goes to the side holding its centre.
            let goes_left = in_left || (!in_right && block.rect().center_x() < mid);
            if goes_left {
                left.push(block.clone());
            } else {
                right.push(block.clone());
            }
        }

        let total = blocks.len() as f32;
        let imbalance = (left.len() as f32 - right.len() as f32).abs();
        let two_columns = !left.is_empty()
            && !right.is_empty()
            && imbalance < self.zones.column_balance * total;

        debug!(
            left = left.len(),
            right = right.len(),
            two_columns,
            "Column detection"
        );

        if two_columns {
            vec![
                self.zone(ZoneKind::Column, &left),
                self.zone(ZoneKind::Column, &right),
            ]
        } else {
            vec![self.zone(ZoneKind::Column, blocks)]
        }
    }

    fn zone(&self, kind: ZoneKind, blocks: &[TextBlock]) -> Zone {
        Zone::new(kind, reading_order(blocks, &self.table))
    }
}

fn unit_top(zones: &[Zone]) -> f32 {
    zones
        .iter()
        .map(|zone| zone.bounds.y)
        .fold(f32::INFINITY, f32::min)
}
