//! Native text versus OCR decision.
//!
//! PDFs with broken font encodings still "have text", but it comes out as
//! private-use-area code points or `(cid:N)` glyph references. Counting both
//! gives a cheap signal that the text layer cannot be trusted.

use std::sync::OnceLock;

use regex::Regex;

/// Garbage glyphs at or above which a page is OCR'd.
pub const DEFAULT_CID_THRESHOLD: usize = 20;

fn cid_marker() -> &'static Regex {
    static CID: OnceLock<Regex> = OnceLock::new();
    CID.get_or_init(|| Regex::new(r"\(cid:\d+\)").unwrap())
}

/// Whether a character lies in the BMP Private Use Area.
pub fn is_private_use(c: char) -> bool {
    ('\u{E000}'..='\u{F8FF}').contains(&c)
}

/// Private-use characters plus non-overlapping `(cid:N)` markers.
pub fn garbage_count(text: &str) -> usize {
    let private_use = text.chars().filter(|&c| is_private_use(c)).count();
    private_use + cid_marker().find_iter(text).count()
}

/// `true` when `text` holds at least `threshold` garbage glyphs.
///
/// Empty text counts zero and is reported usable; blank scanned pages must
/// be caught by other signals.
pub fn should_use_ocr(text: &str, threshold: usize) -> bool {
    garbage_count(text) >= threshold
}

/// Threshold-carrying wrapper around [`should_use_ocr`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageClassifier {
    threshold: usize,
}

impl PageClassifier {
    pub fn new(threshold: usize) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn should_use_ocr(&self, native_text: &str) -> bool {
        should_use_ocr(native_text, self.threshold)
    }
}

impl Default for PageClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_CID_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_boundary() {
        let at = "(cid:12)".repeat(10) + &"\u{E001}".repeat(10);
        let below = "(cid:12)".repeat(10) + &"\u{E001}".repeat(9);
        assert_eq!(garbage_count(&at), 20);
        assert!(should_use_ocr(&at, 20));
        assert!(!should_use_ocr(&below, 20));
    }

    #[test]
    fn test_clean_and_empty_text() {
        assert!(!should_use_ocr("Quarterly revenue grew 12%.", 20));
        assert_eq!(garbage_count(""), 0);
        assert!(!PageClassifier::default().should_use_ocr(""));
    }

    #[test]
    fn test_cid_marker_shapes() {
        assert_eq!(garbage_count("(cid:1)(cid:22)(cid:)"), 2);
        assert_eq!(garbage_count("cid:5 (cid:x)"), 0);
        assert_eq!(garbage_count("\u{F8FF}\u{E000}\u{F900}"), 2);
    }

    #[test]
    fn test_zero_threshold_always_ocr() {
        assert!(PageClassifier::new(0).should_use_ocr("anything"));
    }
}
