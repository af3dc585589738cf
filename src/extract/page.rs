//! Per-page text and embedded image extraction.

use std::fs;

use image::ImageFormat;
use serde::{Deserialize, Serialize};

use crate::engine::{
    join_lines, ocr_failure_marker, summarize_or_degrade, OcrEngine, PipelineContext, Summarizer,
};
use crate::error::{Error, Result};
use crate::model::{EmbeddedImage, ImageEntry, Page, TextEntry, TextSource};
use crate::pipeline::OutputLayout;

use super::prompts::{image_prompt, page_prompt};

/// What goes into the text entry of an OCR'd page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextMode {
    /// OCR text followed by the model summary (`"ocr+llm"`)
    #[default]
    OcrAndSummary,
    /// Model summary alone (`"llm"`)
    SummaryOnly,
}

/// Tunables for [`PageContentExtractor`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    pub text_mode: TextMode,
    /// OCR lines at or below this confidence are discarded
    pub ocr_min_confidence: f32,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            text_mode: TextMode::default(),
            ocr_min_confidence: 0.5,
        }
    }
}

impl ExtractConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text_mode(mut self, mode: TextMode) -> Self {
        self.text_mode = mode;
        self
    }

    pub fn with_ocr_min_confidence(mut self, confidence: f32) -> Self {
        self.ocr_min_confidence = confidence;
        self
    }
}

/// Result of extracting one page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageExtraction {
    pub text: TextEntry,
    pub images: Vec<ImageEntry>,
}

/// Builds the text entry and image entries of one page.
pub struct PageContentExtractor<'a> {
    ocr: &'a dyn OcrEngine,
    summarizer: &'a dyn Summarizer,
    config: &'a ExtractConfig,
}

impl<'a> PageContentExtractor<'a> {
    pub fn new(context: &'a PipelineContext, config: &'a ExtractConfig) -> Self {
        Self {
            ocr: context.ocr(),
            summarizer: context.summarizer(),
            config,
        }
    }

    /// Extract `page`. `images` are the page's embedded images in resource order.
    ///
    /// Only filesystem errors and a missing raster on an OCR page are fatal.
    pub fn extract(
        &self,
        page: &Page,
        images: Vec<EmbeddedImage>,
        layout: &OutputLayout,
    ) -> Result<PageExtraction> {
        let text = if page.needs_ocr {
            self.ocr_text(page, layout)?
        } else {
            log::debug!("Page {}: using native text", page.number);
            TextEntry {
                page: page.number,
                source: TextSource::Native,
                content: page.native_text.clone(),
            }
        };

        let images = self.extract_images(page.number, images, layout)?;
        Ok(PageExtraction { text, images })
    }

    fn ocr_text(&self, page: &Page, layout: &OutputLayout) -> Result<TextEntry> {
        let raster = page
            .raster
            .as_ref()
            .ok_or_else(|| Error::Other(format!("page {} needs OCR but has no raster", page.number)))?;

        let snapshot = layout.fallback_path(page.number);
        raster.save_with_format(&snapshot, ImageFormat::Png)?;

        let (ocr_text, prompt_text) = match self.ocr.recognize(raster) {
            Ok(boxes) => {
                let text = join_lines(&boxes, Some(self.config.ocr_min_confidence));
                (text.clone(), text)
            }
            Err(e) => {
                log::warn!("Page {}: OCR failed: {}", page.number, e);
                (ocr_failure_marker(&e), String::new())
            }
        };

        let summary = summarize_or_degrade(self.summarizer, &[snapshot], &page_prompt(&prompt_text))
            .into_content();
        log::info!(
            "Page {}: OCR fallback, {} chars recognized",
            page.number,
            prompt_text.chars().count()
        );

        let (source, content) = match self.config.text_mode {
            TextMode::OcrAndSummary => (
                TextSource::OcrSummary,
                format!("[ocr]{}\n[llm]{}", ocr_text.trim(), summary),
            ),
            TextMode::SummaryOnly => (TextSource::Summary, summary),
        };
        Ok(TextEntry {
            page: page.number,
            source,
            content,
        })
    }

    fn extract_images(
        &self,
        page: u32,
        images: Vec<EmbeddedImage>,
        layout: &OutputLayout,
    ) -> Result<Vec<ImageEntry>> {
        let mut entries = Vec::new();

        for (i, image) in images.into_iter().enumerate() {
            let index = i + 1;
            let decoded = match image.decode() {
                Ok(decoded) => decoded,
                Err(e) => {
                    log::info!("Page {} image {} ({}): cannot decode, skipped: {}", page, index, image.name, e);
                    continue;
                }
            };

            let path = layout.image_path(page, index, image.extension());
            fs::write(&path, image.file_bytes()?)?;

            let content = match self.ocr.recognize(&decoded) {
                Ok(boxes) => {
                    let text = join_lines(&boxes, Some(self.config.ocr_min_confidence));
                    if text.is_empty() {
                        log::info!("Page {} image {}: no legible text, skipped", page, index);
                        continue;
                    }
                    summarize_or_degrade(self.summarizer, &[path.clone()], image_prompt())
                        .into_content()
                }
                Err(e) => {
                    log::warn!("Page {} image {}: OCR failed: {}", page, index, e);
                    ocr_failure_marker(&e)
                }
            };

            entries.push(ImageEntry {
                page,
                source: path.display().to_string(),
                content,
            });
        }

        Ok(entries)
    }
}
