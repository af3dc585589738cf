//! Table regions and logical (possibly multi-page) tables.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::geometry::BBox;

/// Title recorded for a table region when nothing legible sits above it.
pub const NO_TITLE: &str = "no title";

/// One detected table region on one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableBlock {
    /// Page number (1-indexed)
    pub page: u32,

    /// Where the cropped region was persisted
    pub image_path: PathBuf,

    /// Linearized OCR text of the crop
    pub ocr_text: String,

    /// Pixel width of the detected (unexpanded) box
    pub width: f32,

    /// Recovered title, or [`NO_TITLE`]
    pub title: String,

    /// Detected box in raster pixels
    pub bbox: BBox,

    /// Detection confidence
    pub score: f32,
}

impl TableBlock {
    /// Whether the region carries its own title.
    pub fn has_title(&self) -> bool {
        self.title != NO_TITLE
    }
}

/// A logical table built from page-contiguous [`TableBlock`]s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableGroup {
    pub blocks: Vec<TableBlock>,
}

impl TableGroup {
    /// Start a group with its first block.
    pub fn seed(block: TableBlock) -> Self {
        Self {
            blocks: vec![block],
        }
    }

    /// Canonical title: the first member's title.
    pub fn title(&self) -> &str {
        self.blocks
            .first()
            .map(|b| b.title.as_str())
            .unwrap_or(NO_TITLE)
    }

    /// Member page numbers in order.
    pub fn pages(&self) -> Vec<u32> {
        self.blocks.iter().map(|b| b.page).collect()
    }

    /// Member crop paths in order.
    pub fn image_paths(&self) -> Vec<PathBuf> {
        self.blocks.iter().map(|b| b.image_path.clone()).collect()
    }

    /// Member OCR texts joined by newlines.
    pub fn ocr_text(&self) -> String {
        self.blocks
            .iter()
            .map(|b| b.ocr_text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn last(&self) -> Option<&TableBlock> {
        self.blocks.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(page: u32, title: &str, text: &str) -> TableBlock {
        TableBlock {
            page,
            image_path: PathBuf::from(format!("tables/page{}_table1.png", page)),
            ocr_text: text.to_string(),
            width: 100.0,
            title: title.to_string(),
            bbox: BBox::new(0.0, 0.0, 100.0, 50.0),
            score: 0.9,
        }
    }

    #[test]
    fn test_group_accessors() {
        let mut group = TableGroup::seed(block(2, "Revenue by region", "a b"));
        group.blocks.push(block(3, NO_TITLE, "c d"));

        assert_eq!(group.title(), "Revenue by region");
        assert_eq!(group.pages(), vec![2, 3]);
        assert_eq!(group.ocr_text(), "a b\nc d");
        assert_eq!(group.image_paths().len(), 2);
        assert!(group.blocks[0].has_title());
        assert!(!group.blocks[1].has_title());
    }
}
