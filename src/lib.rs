//! # pdfsift
//!
//! Multi-modal PDF extraction for downstream indexing.
//!
//! Every page of a document is routed to the cheapest extraction that
//! works: the native text layer when it is trustworthy, OCR plus a model
//! summary when it is not. Table regions are cropped, OCR'd and grouped
//! across page boundaries into logical tables; embedded images that carry
//! legible text are described. Pages scanned sideways are detected and the
//! corrected rotation is written back to the source file.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdfsift::{process_file, PipelineConfig};
//!
//! fn main() -> pdfsift::Result<()> {
//!     let config = PipelineConfig::default().with_output_root("out");
//!     let result = process_file("annual-report.pdf", config)?;
//!
//!     for table in &result.table {
//!         println!("{:?}: {}", table.page, table.title);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Engines
//!
//! Rasterization, OCR, table detection and summarization are traits in
//! [`engine`]. The defaults shell out to `pdftoppm` and `tesseract` and talk
//! to an Ollama server; [`engine::PipelineContext::builder`] swaps any of
//! them out.

pub mod classify;
pub mod detect;
pub mod engine;
pub mod error;
pub mod extract;
pub mod model;
pub mod orientation;
pub mod parser;
pub mod pipeline;
pub mod render;
pub mod tables;

// Re-export commonly used types
pub use classify::{garbage_count, should_use_ocr, PageClassifier};
pub use detect::{is_pdf, sniff_bytes, sniff_path, PdfHeader};
pub use engine::{OcrBox, OcrEngine, PageRasterizer, PipelineContext, Summarizer};
pub use error::{Error, Result};
pub use extract::{ExtractConfig, PageContentExtractor, TextMode};
pub use model::{
    BBox, ExtractionResult, ImageEntry, Page, PageScan, TableBlock, TableEntry, TableGroup,
    TextEntry, TextSource,
};
pub use orientation::{Orientation, OrientationConfig, OrientationDetector};
pub use parser::{DocumentSource, PageSelection, PdfSource};
pub use pipeline::{DocumentPipeline, PipelineConfig, Progress, Stage};
pub use render::{JsonFormat, RenderOptions};
pub use tables::{GroupingRules, RegionConfig, TableGroupAggregator, TableRegionDetector};

use std::path::Path;

/// Run the full pipeline over one PDF with the default engines.
///
/// Artifacts are written under `config.output_root/<document stem>/`.
///
/// # Example
///
/// ```no_run
/// use pdfsift::{process_file, PipelineConfig};
///
/// let result = process_file("scan.pdf", PipelineConfig::default()).unwrap();
/// println!("{} text entries", result.text.len());
/// ```
pub fn process_file<P: AsRef<Path>>(path: P, config: PipelineConfig) -> Result<ExtractionResult> {
    let pipeline = DocumentPipeline::from_config(config)?;
    pipeline.process(path)
}

/// Scan a PDF without rendering or calling any engine.
///
/// Useful to see which pages would go to OCR or table extraction.
pub fn scan_file<P: AsRef<Path>>(path: P, config: PipelineConfig) -> Result<Vec<PageScan>> {
    let pipeline = DocumentPipeline::from_config(config)?;
    pipeline.scan(path)
}

/// Run [`process_file`] on tokio's blocking pool.
#[cfg(feature = "async")]
pub async fn process_file_async<P>(path: P, config: PipelineConfig) -> Result<ExtractionResult>
where
    P: AsRef<Path>,
{
    let path = path.as_ref().to_path_buf();
    tokio::task::spawn_blocking(move || process_file(path, config))
        .await
        .map_err(|e| Error::Other(format!("pipeline task failed: {}", e)))?
}
