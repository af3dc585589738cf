//! Page-level types.

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use super::geometry::{union_area, BBox};

/// What the scanning stage learned about a page without rendering it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageScan {
    /// Page number (1-indexed)
    pub number: u32,

    /// Page width in points (1 point = 1/72 inch)
    pub width: f32,

    /// Page height in points
    pub height: f32,

    /// Clockwise `/Rotate` applied when the page is rendered
    #[serde(default)]
    pub rotation: u16,

    /// Text extracted from the content stream
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub native_text: String,

    /// Private-use glyphs plus `(cid:N)` markers found in the native text
    pub garbage_count: usize,

    /// Whether the native text is unusable and OCR must be used instead
    pub needs_ocr: bool,

    /// Tables found by the structural (span alignment) detector, in page
    /// points with the origin at the top-left corner
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub table_regions: Vec<BBox>,

    /// Image XObjects embedded in the page resources
    pub embedded_images: usize,
}

impl PageScan {
    /// Create an empty scan for a page of the given size.
    pub fn new(number: u32, width: f32, height: f32) -> Self {
        Self {
            number,
            width,
            height,
            rotation: 0,
            native_text: String::new(),
            garbage_count: 0,
            needs_ocr: false,
            table_regions: Vec::new(),
            embedded_images: 0,
        }
    }

    /// Whether the structural detector flagged a table on this page.
    pub fn has_tables(&self) -> bool {
        !self.table_regions.is_empty()
    }

    /// Whether any later stage needs a raster of this page.
    pub fn needs_raster(&self) -> bool {
        self.has_tables() || self.needs_ocr || self.embedded_images > 0
    }
}

/// A page being processed by one pipeline run.
///
/// Created from a [`PageScan`], given a raster when one is needed, and
/// mutated in place when orientation correction is applied.
#[derive(Debug, Clone)]
pub struct Page {
    pub number: u32,
    pub width: f32,
    pub height: f32,
    /// `/Rotate` of the source page; width and height are unrotated
    pub rotation: u16,
    pub native_text: String,
    pub needs_ocr: bool,
    pub has_tables: bool,
    /// Structural table regions in top-left-origin page points
    pub table_regions: Vec<BBox>,
    pub embedded_images: usize,
    /// Rendered raster, if the page needed one
    pub raster: Option<DynamicImage>,
    /// Set once the raster has been turned upright
    pub rotated: bool,
    /// Table regions found on the raster, in pixel space
    pub table_boxes: Vec<BBox>,
}

impl Page {
    /// Whether any later stage may need a raster of this page.
    pub fn needs_raster(&self) -> bool {
        self.has_tables || self.needs_ocr || self.embedded_images > 0
    }

    /// Raster dimensions, if rendered.
    pub fn raster_size(&self) -> Option<(u32, u32)> {
        self.raster.as_ref().map(|r| (r.width(), r.height()))
    }

    /// Fraction of the raster covered by the union of detected table boxes.
    pub fn table_coverage(&self) -> f32 {
        match self.raster_size() {
            Some((w, h)) if w > 0 && h > 0 => {
                union_area(&self.table_boxes) / (w as f32 * h as f32)
            }
            _ => 0.0,
        }
    }

    /// Turn the raster 90 degrees clockwise and mark the page as rotated.
    pub fn rotate_raster(&mut self) {
        if let Some(raster) = self.raster.take() {
            self.raster = Some(crate::orientation::rotate_upright(&raster));
            self.rotated = true;
        }
    }
}

impl From<PageScan> for Page {
    fn from(scan: PageScan) -> Self {
        Self {
            number: scan.number,
            width: scan.width,
            height: scan.height,
            rotation: scan.rotation,
            native_text: scan.native_text,
            needs_ocr: scan.needs_ocr,
            has_tables: !scan.table_regions.is_empty(),
            table_regions: scan.table_regions,
            embedded_images: scan.embedded_images,
            raster: None,
            rotated: false,
            table_boxes: Vec::new(),
        }
    }
}
