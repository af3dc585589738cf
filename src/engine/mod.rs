//! External engines: rasterizer, OCR, table detection model, summarizer.
//!
//! Each engine is a `Send + Sync` trait with one shipped implementation
//! that shells out to (or calls) a system tool. Tests substitute their own.

mod context;
mod detector;
mod ocr;
mod raster;
mod summarize;

pub use context::{PipelineContext, PipelineContextBuilder};
pub use detector::{CommandTableDetector, RawDetections, TableDetectionModel};
pub use ocr::{join_lines, ocr_failure_marker, OcrBox, OcrEngine, TesseractOcr};
pub use raster::{PageRasterizer, PdftoppmRasterizer};
#[cfg(feature = "ollama")]
pub use summarize::OllamaSummarizer;
pub use summarize::{summarize_or_degrade, DisabledSummarizer, SummaryOutcome, Summarizer};
