//! Document access abstraction.
//!
//! The pipeline only needs a handful of per-page facts from the PDF. Keeping
//! them behind [`DocumentSource`] isolates lopdf from the pipeline and lets
//! tests drive it with synthetic documents.

use std::path::Path;

use crate::error::Result;
use crate::model::EmbeddedImage;

use super::layout::TextSpan;

/// Per-page access to a source document.
pub trait DocumentSource {
    /// Path of the underlying file, handed to the rasterizer.
    fn path(&self) -> &Path;

    /// All page numbers (1-indexed, ascending).
    fn page_numbers(&self) -> Vec<u32>;

    /// Page size in points.
    fn page_size(&self, page: u32) -> Result<(f32, f32)>;

    /// Text extracted from the page content stream.
    fn native_text(&self, page: u32) -> Result<String>;

    /// Positioned text spans, in PDF user space (origin bottom-left).
    fn text_spans(&self, page: u32) -> Result<Vec<TextSpan>>;

    /// Image XObjects physically embedded in the page resources.
    fn embedded_images(&self, page: u32) -> Result<Vec<EmbeddedImage>>;

    /// Clockwise display rotation (0, 90, 180 or 270) that renderers apply.
    fn page_rotation(&self, _page: u32) -> Result<u16> {
        Ok(0)
    }

    /// Number of embedded images, without decoding them.
    fn embedded_image_count(&self, page: u32) -> Result<usize> {
        Ok(self.embedded_images(page)?.len())
    }

    /// Number of pages.
    fn page_count(&self) -> u32 {
        self.page_numbers().len() as u32
    }
}
