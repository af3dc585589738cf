//! Extraction output handed to indexing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a page's text was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextSource {
    /// Native content-stream text
    #[serde(rename = "ori")]
    Native,
    /// OCR text plus a model summary
    #[serde(rename = "ocr+llm")]
    OcrSummary,
    /// Model summary of the OCR text only
    #[serde(rename = "llm")]
    Summary,
}

impl TextSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextSource::Native => "ori",
            TextSource::OcrSummary => "ocr+llm",
            TextSource::Summary => "llm",
        }
    }
}

impl std::fmt::Display for TextSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text of one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextEntry {
    pub page: u32,
    pub source: TextSource,
    pub content: String,
}

/// One logical table, possibly spanning pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableEntry {
    /// Member pages in order
    pub page: Vec<u32>,
    /// Member crop paths in order
    pub source: Vec<String>,
    pub title: String,
    pub content: String,
}

/// One embedded image that carried legible text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageEntry {
    pub page: u32,
    /// Where the image was persisted
    pub source: String,
    pub content: String,
}

/// Everything one pipeline run produced for a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub text: Vec<TextEntry>,
    pub table: Vec<TableEntry>,
    pub image: Vec<ImageEntry>,

    /// Document base name the artifacts were scoped to
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub document: String,

    /// Pages in the source document
    #[serde(default)]
    pub page_count: u32,

    /// Pages whose rotation was corrected
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rotated_pages: Vec<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
}

impl ExtractionResult {
    pub fn new(document: impl Into<String>, page_count: u32) -> Self {
        Self {
            document: document.into(),
            page_count,
            ..Default::default()
        }
    }

    /// Number of entries across all three lists.
    pub fn entry_count(&self) -> usize {
        self.text.len() + self.table.len() + self.image.len()
    }

    /// Text entry for a page, if any.
    pub fn text_for_page(&self, page: u32) -> Option<&TextEntry> {
        self.text.iter().find(|t| t.page == page)
    }

    pub fn is_empty(&self) -> bool {
        self.entry_count() == 0
    }
}
