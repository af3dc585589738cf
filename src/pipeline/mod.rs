//! Top-level document driver.
//!
//! One [`DocumentPipeline::process`] call walks a document through
//!
//! ```text
//! Scanning -> Rendering -> TableExtraction -> TextImageExtraction -> RotationCommit -> Done
//! ```
//!
//! Scanning reads every selected page's text layer and decides whether it
//! needs OCR, has tables or embeds images. Only pages that need pixels are
//! rendered. Table pages are turned upright if needed, their regions are
//! cropped and OCR'd, and all regions are grouped into logical tables once
//! every table page is done. Remaining pages get text and image
//! extraction. Corrected rotations are finally written back to the source.

mod config;
mod layout;
mod rotation;
mod sink;

pub use config::PipelineConfig;
pub use layout::{document_stem, OutputLayout};
pub(crate) use rotation::page_rotation;
pub use rotation::{commit_rotations, read_rotations, RotationLedger};
pub use sink::{ExtractionSink, JsonFileSink};

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use rayon::prelude::*;
use serde::Serialize;

use crate::classify::{garbage_count, PageClassifier};
use crate::engine::{summarize_or_degrade, PipelineContext};
use crate::error::{Error, Result};
use crate::extract::{table_prompt, PageContentExtractor};
use crate::model::{
    ExtractionResult, ImageEntry, Page, PageScan, TableEntry, TableGroup, TextEntry,
};
use crate::orientation::{Orientation, OrientationDetector};
use crate::parser::{DocumentSource, PdfSource, TableDetector, TextSpan};
use crate::tables::{TableGroupAggregator, TableRegionDetector};

/// Pipeline state reported through progress events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Scanning,
    Rendering,
    TableExtraction,
    TableSummary,
    TextImageExtraction,
    RotationCommit,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Scanning => "scanning",
            Stage::Rendering => "rendering",
            Stage::TableExtraction => "table extraction",
            Stage::TableSummary => "table summary",
            Stage::TextImageExtraction => "text/image extraction",
            Stage::RotationCommit => "rotation commit",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// One progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub stage: Stage,
    /// Page being worked on, if the step is per page
    pub page: Option<u32>,
    /// Steps finished in this stage
    pub done: usize,
    /// Steps in this stage
    pub total: usize,
}

/// Progress callback.
pub type ProgressFn = Arc<dyn Fn(&Progress) + Send + Sync>;

/// Result of a run over a [`DocumentSource`], before any rotation commit.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub result: ExtractionResult,
    pub rotations: RotationLedger,
}

/// Text-layer facts read sequentially before parallel analysis.
struct RawPage {
    number: u32,
    width: f32,
    height: f32,
    rotation: u16,
    text: Option<String>,
    spans: Vec<TextSpan>,
    images: usize,
}

/// Drives documents through the extraction stages.
pub struct DocumentPipeline {
    context: PipelineContext,
    config: PipelineConfig,
    classifier: PageClassifier,
    orientation: OrientationDetector,
    aggregator: TableGroupAggregator,
    structural: TableDetector,
    progress: Option<ProgressFn>,
    cancel: Option<Arc<AtomicBool>>,
}

impl DocumentPipeline {
    pub fn new(context: PipelineContext, config: PipelineConfig) -> Self {
        Self {
            classifier: PageClassifier::new(config.cid_threshold),
            orientation: OrientationDetector::new(config.orientation.clone()),
            aggregator: TableGroupAggregator::new(config.grouping),
            structural: TableDetector::new(),
            context,
            config,
            progress: None,
            cancel: None,
        }
    }

    /// Validate `config` and build the system engines it names.
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let context = PipelineContext::from_config(&config)?;
        Ok(Self::new(context, config))
    }

    /// Receive a [`Progress`] event at every step.
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Progress) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(callback));
        self
    }

    /// Abort with [`Error::Cancelled`] once `flag` is set. Checked between pages.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn context(&self) -> &PipelineContext {
        &self.context
    }

    /// Scan a PDF without rendering or calling any model.
    pub fn scan<P: AsRef<Path>>(&self, pdf: P) -> Result<Vec<PageScan>> {
        let source = PdfSource::open(pdf)?;
        self.scan_source(&source)
    }

    /// Run the full pipeline on a PDF file and commit corrected rotations.
    pub fn process<P: AsRef<Path>>(&self, pdf: P) -> Result<ExtractionResult> {
        let path = pdf.as_ref();
        log::info!("Processing {}", path.display());

        let output = {
            let source = PdfSource::open(path)?;
            self.process_source(&source)?
        };

        if self.config.commit_rotations && !output.rotations.is_empty() {
            self.emit(Stage::RotationCommit, None, 0, output.rotations.len());
            commit_rotations(path, &output.rotations)?;
        }
        self.emit(Stage::Done, None, 0, 0);

        log::info!(
            "Finished {}: {} text, {} table, {} image entries",
            path.display(),
            output.result.text.len(),
            output.result.table.len(),
            output.result.image.len()
        );
        Ok(output.result)
    }

    /// [`process`](Self::process), then hand the result to `sink`.
    pub fn process_and_store<P: AsRef<Path>>(
        &self,
        pdf: P,
        document_id: &str,
        sink: &dyn ExtractionSink,
    ) -> Result<ExtractionResult> {
        let result = self.process(pdf)?;
        sink.store(document_id, &result)?;
        Ok(result)
    }

    /// Run every stage except the rotation commit on `source`.
    pub fn process_source(&self, source: &dyn DocumentSource) -> Result<PipelineOutput> {
        let stem = document_stem(source.path())?;
        let layout = OutputLayout::create(&self.config.output_root, &stem)?;

        let mut pages: Vec<Page> = self
            .scan_source(source)?
            .into_iter()
            .map(Page::from)
            .collect();

        self.render(source, &mut pages)?;

        let mut rotations = RotationLedger::new();
        let (table, table_only) = self.extract_tables(&mut pages, &layout, &mut rotations)?;
        let (text, image) = self.extract_text_and_images(source, &pages, &table_only, &layout)?;

        let mut result = ExtractionResult::new(stem, source.page_count());
        result.text = text;
        result.table = table;
        result.image = image;
        result.rotated_pages = rotations.pages();
        result.processed_at = Some(Utc::now());

        Ok(PipelineOutput { result, rotations })
    }

    /// Read and classify every selected page of `source`.
    pub fn scan_source(&self, source: &dyn DocumentSource) -> Result<Vec<PageScan>> {
        let numbers: Vec<u32> = source
            .page_numbers()
            .into_iter()
            .filter(|n| self.config.pages.includes(*n))
            .collect();
        if numbers.is_empty() {
            log::warn!("Page selection {} matches no page", self.config.pages);
        }

        let total = numbers.len();
        let mut raw = Vec::with_capacity(total);
        for (done, &number) in numbers.iter().enumerate() {
            self.check_cancelled()?;
            self.emit(Stage::Scanning, Some(number), done, total);
            raw.push(read_page(source, number)?);
        }

        let classifier = self.classifier;
        let structural = &self.structural;
        let analyze = |page: RawPage| analyze_page(page, &classifier, structural);
        let scans: Vec<PageScan> = if self.config.parallel {
            raw.into_par_iter().map(analyze).collect()
        } else {
            raw.into_iter().map(analyze).collect()
        };

        for scan in &scans {
            log::debug!(
                "Page {}: rotate={} garbage={} ocr={} tables={} images={}",
                scan.number,
                scan.rotation,
                scan.garbage_count,
                scan.needs_ocr,
                scan.table_regions.len(),
                scan.embedded_images
            );
        }
        Ok(scans)
    }

    fn render(&self, source: &dyn DocumentSource, pages: &mut [Page]) -> Result<()> {
        let lazy = self.config.lazy_render;
        let targets: Vec<usize> = (0..pages.len())
            .filter(|&i| !lazy || pages[i].needs_raster())
            .collect();
        log::info!(
            "Rendering {} of {} page(s)",
            targets.len(),
            pages.len()
        );

        let total = targets.len();
        for (done, i) in targets.into_iter().enumerate() {
            self.check_cancelled()?;
            let page = &mut pages[i];
            self.emit(Stage::Rendering, Some(page.number), done, total);
            page.raster = Some(self.context.rasterizer().render(source.path(), page.number)?);
        }
        Ok(())
    }

    /// Returns the table entries and the pages treated as all-table.
    fn extract_tables(
        &self,
        pages: &mut [Page],
        layout: &OutputLayout,
        rotations: &mut RotationLedger,
    ) -> Result<(Vec<TableEntry>, BTreeSet<u32>)> {
        let detector = TableRegionDetector::new(
            self.context.region_strategy(),
            self.context.ocr(),
            &self.config.region,
        );

        let mut blocks = Vec::new();
        let mut table_only = BTreeSet::new();
        let total = pages.iter().filter(|p| p.has_tables).count();

        for (done, page) in pages.iter_mut().filter(|p| p.has_tables).enumerate() {
            self.check_cancelled()?;
            self.emit(Stage::TableExtraction, Some(page.number), done, total);

            self.correct_orientation(page, rotations);
            let found = detector.detect(page, layout)?;
            page.table_boxes = found.iter().map(|b| b.bbox).collect();

            let coverage = page.table_coverage();
            if coverage < self.config.table_area_ratio {
                log::info!(
                    "Page {}: tables cover {:.0}%, extracting remaining content too",
                    page.number,
                    coverage * 100.0
                );
            } else {
                log::info!(
                    "Page {}: tables cover {:.0}%, treated as table-only",
                    page.number,
                    coverage * 100.0
                );
                table_only.insert(page.number);
            }
            blocks.extend(found);
        }

        let groups = self.aggregator.group(blocks);
        let total = groups.len();
        let mut entries = Vec::with_capacity(total);
        for (done, group) in groups.iter().enumerate() {
            self.check_cancelled()?;
            self.emit(Stage::TableSummary, group.pages().first().copied(), done, total);
            entries.push(self.summarize_group(group));
        }
        Ok((entries, table_only))
    }

    /// Turn a sideways table page upright before any region is read from it.
    fn correct_orientation(&self, page: &mut Page, rotations: &mut RotationLedger) {
        let Some(raster) = page.raster.as_ref() else {
            return;
        };
        let boxes = match self.context.ocr().recognize(raster) {
            Ok(boxes) => boxes,
            Err(e) => {
                log::warn!(
                    "Page {}: orientation check skipped, OCR failed: {}",
                    page.number,
                    e
                );
                return;
            }
        };
        if self.orientation.detect(&boxes) == Orientation::Sideways {
            log::info!("Page {}: sideways, rotating 90 degrees", page.number);
            page.rotate_raster();
            rotations.record(page.number);
        }
    }

    fn summarize_group(&self, group: &TableGroup) -> TableEntry {
        let title = group.title().to_string();
        let texts = group.ocr_text();
        let images = group.image_paths();

        let summary = summarize_or_degrade(
            self.context.summarizer(),
            &images,
            &table_prompt(&title, &texts),
        )
        .into_content();
        log::info!(
            "Table on pages {:?} summarized ({} chars)",
            group.pages(),
            summary.chars().count()
        );

        TableEntry {
            page: group.pages(),
            source: images.iter().map(|p| p.display().to_string()).collect(),
            content: format!(
                "table title: {}\n[ocr]\n{}\n[llm summary]\n{}",
                title, texts, summary
            ),
            title,
        }
    }

    fn extract_text_and_images(
        &self,
        source: &dyn DocumentSource,
        pages: &[Page],
        table_only: &BTreeSet<u32>,
        layout: &OutputLayout,
    ) -> Result<(Vec<TextEntry>, Vec<ImageEntry>)> {
        let extractor = PageContentExtractor::new(&self.context, &self.config.extract);
        let remaining: Vec<&Page> = pages
            .iter()
            .filter(|p| !table_only.contains(&p.number))
            .collect();

        let mut text = Vec::with_capacity(remaining.len());
        let mut images = Vec::new();
        let total = remaining.len();
        for (done, page) in remaining.into_iter().enumerate() {
            self.check_cancelled()?;
            self.emit(Stage::TextImageExtraction, Some(page.number), done, total);

            let embedded = if page.embedded_images > 0 {
                source.embedded_images(page.number)?
            } else {
                Vec::new()
            };
            let extraction = extractor.extract(page, embedded, layout)?;
            text.push(extraction.text);
            images.extend(extraction.images);
        }
        Ok((text, images))
    }

    fn check_cancelled(&self) -> Result<()> {
        match &self.cancel {
            Some(flag) if flag.load(Ordering::Relaxed) => Err(Error::Cancelled),
            _ => Ok(()),
        }
    }

    fn emit(&self, stage: Stage, page: Option<u32>, done: usize, total: usize) {
        if let Some(callback) = &self.progress {
            callback(&Progress {
                stage,
                page,
                done,
                total,
            });
        }
    }
}

impl fmt::Debug for DocumentPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentPipeline")
            .field("context", &self.context)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn read_page(source: &dyn DocumentSource, number: u32) -> Result<RawPage> {
    let (width, height) = source.page_size(number)?;

    // A text layer lopdf cannot decode is treated like a garbled one.
    let text = match source.native_text(number) {
        Ok(text) => Some(text),
        Err(e) => {
            log::warn!("Page {}: text layer unreadable, using OCR: {}", number, e);
            None
        }
    };
    let spans = source.text_spans(number).unwrap_or_else(|e| {
        log::warn!("Page {}: no text positions: {}", number, e);
        Vec::new()
    });

    Ok(RawPage {
        number,
        width,
        height,
        rotation: source.page_rotation(number)?,
        text,
        spans,
        images: source.embedded_image_count(number)?,
    })
}

fn analyze_page(raw: RawPage, classifier: &PageClassifier, structural: &TableDetector) -> PageScan {
    let mut scan = PageScan::new(raw.number, raw.width, raw.height);
    scan.rotation = raw.rotation;
    match raw.text {
        Some(text) => {
            scan.garbage_count = garbage_count(&text);
            scan.needs_ocr = classifier.should_use_ocr(&text);
            scan.native_text = text;
        }
        None => scan.needs_ocr = true,
    }
    scan.table_regions = structural
        .detect(&raw.spans)
        .iter()
        .map(|t| t.region(raw.height))
        .collect();
    scan.embedded_images = raw.images;
    scan
}
