//! Benchmarks for the pure stages of the pipeline.
//!
//! Run with: cargo bench
//!
//! Engines (rasterizer, OCR, model) are external processes and are not
//! measured here; these cover the per-page classification, orientation
//! voting and table grouping that run in-process.

use std::path::PathBuf;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use pdfsift::engine::OcrBox;
use pdfsift::model::{BBox, Quad, TableBlock, NO_TITLE};
use pdfsift::tables::group_tables;
use pdfsift::{garbage_count, OrientationDetector};

/// Page text with `garbage` broken glyph references mixed into prose.
fn page_text(garbage: usize) -> String {
    let mut text = String::new();
    for i in 0..400 {
        text.push_str("Consolidated statement of cash flows ");
        if i < garbage {
            text.push_str("(cid:113)\u{E012}");
        }
    }
    text
}

fn bench_classification(c: &mut Criterion) {
    let clean = page_text(0);
    let garbled = page_text(200);

    c.bench_function("garbage_count_clean", |b| {
        b.iter(|| garbage_count(black_box(&clean)));
    });

    c.bench_function("garbage_count_garbled", |b| {
        b.iter(|| garbage_count(black_box(&garbled)));
    });
}

fn bench_orientation(c: &mut Criterion) {
    let boxes: Vec<OcrBox> = (0..300)
        .map(|i| {
            let y = i as f32 * 12.0;
            OcrBox::new(
                Quad::from_rect(40.0, y, 400.0, y + 10.0),
                "Net cash from operating activities".to_string(),
                0.9,
            )
        })
        .collect();
    let detector = OrientationDetector::default();

    c.bench_function("orientation_300_boxes", |b| {
        b.iter(|| detector.detect(black_box(&boxes)));
    });
}

fn bench_grouping(c: &mut Criterion) {
    let mut group = c.benchmark_group("table_grouping");

    for count in [10, 100, 1000].iter() {
        let blocks: Vec<TableBlock> = (0..*count)
            .map(|i| TableBlock {
                page: (*count - i) as u32,
                image_path: PathBuf::from(format!("tables/page{}_table1.png", i)),
                ocr_text: "Item 2023 2022".to_string(),
                width: 800.0 + (i % 7) as f32 * 40.0,
                title: if i % 5 == 0 { "Table".to_string() } else { NO_TITLE.to_string() },
                bbox: BBox::new(50.0, 120.0, 850.0, 900.0),
                score: 0.9,
            })
            .collect();

        group.bench_function(format!("{}_blocks", count), |b| {
            b.iter(|| group_tables(black_box(blocks.clone())));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_classification,
    bench_orientation,
    bench_grouping,
);
criterion_main!(benches);
