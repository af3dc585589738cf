//! OCR engine abstraction and a tesseract implementation.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Command;

use image::DynamicImage;
use unicode_normalization::UnicodeNormalization;

use crate::error::{Error, Result};
use crate::model::{BBox, Quad};
use crate::parser::is_spaceless_script_char;

/// One recognized line of text.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrBox {
    /// Corners in raster pixels, top-left first, clockwise
    pub quad: Quad,
    pub text: String,
    /// Recognition confidence in `[0, 1]`
    pub confidence: f32,
}

impl OcrBox {
    pub fn new(quad: Quad, text: String, confidence: f32) -> Self {
        Self {
            quad,
            text,
            confidence,
        }
    }
}

/// Anything that turns a raster into text lines.
pub trait OcrEngine: Send + Sync {
    /// Recognize text lines in reading order.
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<OcrBox>>;
}

/// Join recognized lines with newlines.
///
/// With `min_confidence`, only lines strictly above it are kept. Text is
/// NFC-normalized and blank lines are dropped.
pub fn join_lines(boxes: &[OcrBox], min_confidence: Option<f32>) -> String {
    boxes
        .iter()
        .filter(|b| min_confidence.map_or(true, |min| b.confidence > min))
        .map(|b| b.text.trim().nfc().collect::<String>())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Content recorded in place of OCR text when recognition failed.
pub fn ocr_failure_marker(error: &Error) -> String {
    format!("[ocr failed: {}]", error)
}

/// Runs the `tesseract` binary and groups its word-level TSV into lines.
///
/// TSV rows only carry `left/top/width/height`, so every returned quad is
/// axis-aligned. The orientation detector's vertical-angle vote never fires
/// on this engine's output; sideways pages are caught by the short-text and
/// tall-box votes alone.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    binary: PathBuf,
    languages: String,
    page_segmentation: Option<u8>,
}

impl TesseractOcr {
    /// Use `tesseract` from `PATH` with the given language spec (e.g. `chi_tra+eng`).
    pub fn new(languages: impl Into<String>) -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            languages: languages.into(),
            page_segmentation: None,
        }
    }

    /// Use a specific tesseract binary.
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Set the `--psm` page segmentation mode.
    pub fn with_page_segmentation(mut self, psm: u8) -> Self {
        self.page_segmentation = Some(psm);
        self
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<OcrBox>> {
        let input = tempfile::Builder::new()
            .prefix("pdfsift-ocr-")
            .suffix(".png")
            .tempfile()?;
        image.save_with_format(input.path(), image::ImageFormat::Png)?;

        let mut cmd = Command::new(&self.binary);
        cmd.arg(input.path())
            .arg("stdout")
            .args(["-l", &self.languages]);
        if let Some(psm) = self.page_segmentation {
            cmd.args(["--psm", &psm.to_string()]);
        }
        cmd.arg("tsv");

        let output = cmd
            .output()
            .map_err(|e| Error::Ocr(format!("failed to run {}: {}", self.binary.display(), e)))?;
        if !output.status.success() {
            return Err(Error::Ocr(format!(
                "tesseract exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(parse_tsv(&String::from_utf8_lossy(&output.stdout)))
    }
}

#[derive(Default)]
struct LineAccumulator {
    words: Vec<String>,
    bounds: Option<BBox>,
    confidence_sum: f32,
}

/// Group tesseract word rows (level 5) into line boxes.
fn parse_tsv(tsv: &str) -> Vec<OcrBox> {
    let mut lines: BTreeMap<(u32, u32, u32, u32), LineAccumulator> = BTreeMap::new();

    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 || cols[0] != "5" {
            continue;
        }
        let num = |i: usize| cols[i].trim().parse::<f32>().unwrap_or(-1.0);
        let conf = num(10);
        let text = cols[11].trim();
        if conf < 0.0 || text.is_empty() {
            continue;
        }

        let key = (
            num(1) as u32,
            num(2) as u32,
            num(3) as u32,
            num(4) as u32,
        );
        let (left, top, width, height) = (num(6), num(7), num(8), num(9));
        let word_box = BBox::new(left, top, left + width, top + height);

        let line = lines.entry(key).or_default();
        line.words.push(text.to_string());
        line.confidence_sum += conf / 100.0;
        line.bounds = Some(match line.bounds {
            Some(b) => BBox::new(
                b.x0.min(word_box.x0),
                b.y0.min(word_box.y0),
                b.x1.max(word_box.x1),
                b.y1.max(word_box.y1),
            ),
            None => word_box,
        });
    }

    lines
        .into_values()
        .filter_map(|line| {
            let b = line.bounds?;
            let confidence = line.confidence_sum / line.words.len() as f32;
            Some(OcrBox::new(
                Quad::from_rect(b.x0, b.y0, b.x1, b.y1),
                join_words(&line.words),
                confidence,
            ))
        })
        .collect()
}

/// Join words with spaces, except between scripts written without them.
fn join_words(words: &[String]) -> String {
    let mut out = String::new();
    for word in words {
        let glue = match (out.chars().last(), word.chars().next()) {
            (Some(a), Some(b)) => !(is_spaceless_script_char(a) && is_spaceless_script_char(b)),
            _ => false,
        };
        if glue {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}
