// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the folio-layout crate: zone classification and
// node building over a synthetic two-column page with an embedded table.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use folio_core::config::{ReflowConfig, TableConfig};
use folio_core::{PageResult, TextBlock};
use folio_layout::{ZoneClassifier, build_nodes};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

const PAGE_W: f32 = 2480.0;
const PAGE_H: f32 = 3508.0;

/// A 300 DPI A4 page: running header, 60 lines per column, a 4x5 table
/// between the columns, and a footer.
fn synthetic_page() -> Vec<TextBlock> {
    let mut blocks = vec![TextBlock::new("Annual Report 2025", 200.0, 120.0, 900.0, 40.0, 0.95)];
    for line in 0..60 {
        let y = 500.0 + line as f32 * 40.0;
        blocks.push(TextBlock::new("left column prose", 150.0, y, 1000.0, 28.0, 0.9));
        blocks.push(TextBlock::new("right column prose", 1330.0, y, 1000.0, 28.0, 0.9));
    }
    for row in 0..5 {
        for col in 0..4 {
            blocks.push(TextBlock::new(
                "cell",
                150.0 + col as f32 * 550.0,
                2950.0 + row as f32 * 30.0,
                400.0,
                24.0,
                0.88,
            ));
        }
    }
    blocks.push(TextBlock::new("Page 1 of 12", 1100.0, 3300.0, 300.0, 28.0, 0.97));
    blocks
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_classify(c: &mut Criterion) {
    let blocks = synthetic_page();
    let classifier = ZoneClassifier::default();

    c.bench_function("classify (142 blocks)", |b| {
        b.iter(|| black_box(classifier.classify(black_box(&blocks), PAGE_W, PAGE_H)));
    });
}

fn bench_build_nodes(c: &mut Criterion) {
    let blocks = synthetic_page();
    let zones = ZoneClassifier::default().classify(&blocks, PAGE_W, PAGE_H);
    let page = PageResult {
        page_number: 1,
        width: PAGE_W,
        height: PAGE_H,
        zones,
        recognized: true,
        profile: None,
        mean_confidence: 0.9,
    };
    let table = TableConfig::default();
    let reflow = ReflowConfig::default();

    c.bench_function("build_nodes (142 blocks)", |b| {
        b.iter(|| black_box(build_nodes(black_box(&page), &table, &reflow)));
    });
}

criterion_group!(benches, bench_classify, bench_build_nodes);
criterion_main!(benches);
