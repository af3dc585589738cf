//! Rotation commit against real PDF files.

mod common;

use image::DynamicImage;

use pdfsift::engine::PipelineContext;
use pdfsift::error::Error;
use pdfsift::model::{BBox, Page};
use pdfsift::pipeline::{
    commit_rotations, read_rotations, DocumentPipeline, PipelineConfig, RotationLedger,
};
use pdfsift::tables::{RegionConfig, StructuralRegionStrategy, TableRegionStrategy};

use common::*;

#[test]
fn test_commit_sets_rotate() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "scan.pdf", &["one", "two", "three"], None);

    let ledger: RotationLedger = [2].into_iter().collect();
    commit_rotations(&pdf, &ledger).unwrap();

    let rotations = read_rotations(&pdf).unwrap();
    assert_eq!(rotations[&1], 0);
    assert_eq!(rotations[&2], 90);
    assert_eq!(rotations[&3], 0);
}

#[test]
fn test_commit_adds_to_inherited_rotate() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "scan.pdf", &["one", "two"], Some(270));
    assert_eq!(read_rotations(&pdf).unwrap()[&1], 270);

    let ledger: RotationLedger = [1].into_iter().collect();
    commit_rotations(&pdf, &ledger).unwrap();

    let rotations = read_rotations(&pdf).unwrap();
    assert_eq!(rotations[&1], 0);
    assert_eq!(rotations[&2], 270);
}

#[test]
fn test_commit_twice_accumulates() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "scan.pdf", &["one"], None);
    let ledger: RotationLedger = [1].into_iter().collect();

    commit_rotations(&pdf, &ledger).unwrap();
    commit_rotations(&pdf, &ledger).unwrap();

    assert_eq!(read_rotations(&pdf).unwrap()[&1], 180);
}

#[test]
fn test_unknown_page_leaves_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "scan.pdf", &["one"], None);
    let before = std::fs::read(&pdf).unwrap();

    let ledger: RotationLedger = [1, 7].into_iter().collect();
    let err = commit_rotations(&pdf, &ledger).unwrap_err();
    assert!(matches!(err, Error::PageOutOfRange(7, 1)));

    assert_eq!(std::fs::read(&pdf).unwrap(), before);
    let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(leftovers, 1);
}

#[test]
fn test_pipeline_commits_sideways_table_page() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_span_pdf(
        dir.path(),
        "ledger.pdf",
        &[vec![("Cover", 72, 700)], table_spans()],
        None,
    );

    let context = PipelineContext::builder()
        .rasterizer(BlankRasterizer::with_sideways(vec![2]))
        .ocr(ScriptedOcr::sideways_on_landscape())
        .region_strategy(FixedRegions::new(vec![BBox::new(0.0, 0.0, 200.0, 200.0)]))
        .summarizer(RecordingSummarizer::new())
        .build()
        .unwrap();
    let config = PipelineConfig::default().with_output_root(dir.path().join("out"));
    let pipeline = DocumentPipeline::new(context, config);

    let scans = pipeline.scan(&pdf).unwrap();
    assert!(!scans[0].has_tables());
    assert!(scans[1].has_tables());

    let result = pipeline.process(&pdf).unwrap();
    assert_eq!(result.rotated_pages, vec![2]);
    assert_eq!(result.table.len(), 1);

    let rotations = read_rotations(&pdf).unwrap();
    assert_eq!(rotations[&1], 0);
    assert_eq!(rotations[&2], 90);
}

#[test]
fn test_pipeline_rotation_commit_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_span_pdf(dir.path(), "ledger.pdf", &[table_spans()], None);

    let context = PipelineContext::builder()
        .rasterizer(BlankRasterizer::with_sideways(vec![1]))
        .ocr(ScriptedOcr::sideways_on_landscape())
        .region_strategy(FixedRegions::new(vec![BBox::new(0.0, 0.0, 200.0, 200.0)]))
        .summarizer(RecordingSummarizer::new())
        .build()
        .unwrap();
    let config = PipelineConfig::default()
        .with_output_root(dir.path().join("out"))
        .with_commit_rotations(false);

    let result = DocumentPipeline::new(context, config).process(&pdf).unwrap();

    assert_eq!(result.rotated_pages, vec![1]);
    assert_eq!(read_rotations(&pdf).unwrap()[&1], 0);
}

fn structural_pipeline(out: &std::path::Path, sideways: Vec<u32>) -> DocumentPipeline {
    let context = PipelineContext::builder()
        .rasterizer(BlankRasterizer::with_sideways(sideways))
        .ocr(ScriptedOcr::lines())
        .region_strategy(StructuralRegionStrategy::new())
        .summarizer(RecordingSummarizer::new())
        .build()
        .unwrap();
    let config = PipelineConfig::default()
        .with_output_root(out)
        .with_region(RegionConfig::strict());
    DocumentPipeline::new(context, config)
}

#[test]
fn test_structural_regions_follow_page_rotate() {
    let dir = tempfile::tempdir().unwrap();
    let plain = write_span_pdf(dir.path(), "plain.pdf", &[table_spans()], None);
    let turned = write_span_pdf(dir.path(), "turned.pdf", &[table_spans()], Some(90));
    let pipeline = structural_pipeline(&dir.path().join("out"), Vec::new());

    let plain_scan = pipeline.scan(&plain).unwrap().remove(0);
    let turned_scan = pipeline.scan(&turned).unwrap().remove(0);
    assert_eq!(plain_scan.rotation, 0);
    assert_eq!(turned_scan.rotation, 90);
    assert_eq!((turned_scan.width, turned_scan.height), (595.0, 842.0));

    let r = plain_scan.table_regions[0];
    assert_eq!(turned_scan.table_regions[0], r);

    // The renderer shows a /Rotate 90 page landscape, one pixel per point.
    let raster = DynamicImage::new_rgb8(842, 595);
    let dets = StructuralRegionStrategy
        .regions(&Page::from(turned_scan), &raster)
        .unwrap();
    let want = BBox::new(842.0 - r.y1, r.x0, 842.0 - r.y0, r.x1);
    let got = dets[0].bbox;
    for (g, w) in [(got.x0, want.x0), (got.y0, want.y0), (got.x1, want.x1), (got.y1, want.y1)] {
        assert!((g - w).abs() < 1e-3, "{:?} != {:?}", got, want);
    }
}

#[test]
fn test_process_crops_structural_table_on_rotated_page() {
    let dir = tempfile::tempdir().unwrap();
    for (name, rotate) in [("plain.pdf", None), ("turned.pdf", Some(90))] {
        let pdf = write_span_pdf(dir.path(), name, &[table_spans()], rotate);
        // A /Rotate 90 page renders landscape.
        let sideways = if rotate.is_some() { vec![1] } else { Vec::new() };
        let pipeline = structural_pipeline(&dir.path().join("out"), sideways);

        let result = pipeline.process(&pdf).unwrap();
        assert!(result.rotated_pages.is_empty());
        assert_eq!(result.table.len(), 1);
        assert_eq!(result.table[0].page, vec![1]);

        let crop = image::open(&result.table[0].source[0]).unwrap();
        let (w, h) = (crop.width(), crop.height());
        // The table is wide on the page, so it must be tall on the turned raster.
        if rotate.is_some() {
            assert!(h > 2 * w, "{}: crop {}x{}", name, w, h);
        } else {
            assert!(w > 2 * h, "{}: crop {}x{}", name, w, h);
        }
    }
}
