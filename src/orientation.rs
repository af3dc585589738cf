//! Sideways page detection from OCR box statistics.
//!
//! Three independent symptoms of a page scanned 90 degrees off are counted
//! over the OCR boxes: top edges running vertically, boxes recognized as a
//! single character, and boxes much taller than wide. Any one dominating is
//! enough to call the page sideways.
//!
//! This is a vote, not a classifier. Pages with only a handful of text
//! elements (a lone caption, a sparse form) can trip it falsely; the
//! `min_text_count` floor only removes the most degenerate cases.

use std::ops::RangeInclusive;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::engine::OcrBox;

/// Orientation verdict for a raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    Upright,
    Sideways,
}

impl Orientation {
    /// Rotation needed, in degrees.
    pub fn degrees(&self) -> u16 {
        match self {
            Orientation::Upright => 0,
            Orientation::Sideways => 90,
        }
    }
}

/// Thresholds for [`OrientationDetector`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrientationConfig {
    /// Below this many boxes the page is assumed upright
    pub min_text_count: usize,
    /// Top-edge angles (degrees, inclusive) counted as vertical
    pub vertical_angle_range: RangeInclusive<f32>,
    /// Vertical fraction at or above which the page is sideways
    pub vertical_ratio: f32,
    /// Single-character fraction above which the page is sideways
    pub short_ratio: f32,
    /// Tall-box fraction above which the page is sideways
    pub tall_ratio: f32,
}

impl Default for OrientationConfig {
    fn default() -> Self {
        Self {
            min_text_count: 5,
            vertical_angle_range: 75.0..=105.0,
            vertical_ratio: 0.5,
            short_ratio: 0.4,
            tall_ratio: 0.4,
        }
    }
}

impl OrientationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_text_count(mut self, count: usize) -> Self {
        self.min_text_count = count;
        self
    }

    pub fn with_vertical_angle_range(mut self, range: RangeInclusive<f32>) -> Self {
        self.vertical_angle_range = range;
        self
    }
}

/// Box statistics behind a verdict, kept for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OrientationVotes {
    pub total: usize,
    pub vertical: usize,
    pub short: usize,
    pub tall: usize,
}

impl OrientationVotes {
    /// Tally the three symptoms over `boxes`.
    pub fn count(boxes: &[OcrBox], vertical_range: &RangeInclusive<f32>) -> Self {
        let mut votes = Self {
            total: boxes.len(),
            ..Default::default()
        };
        for b in boxes {
            if vertical_range.contains(&b.quad.top_edge_angle()) {
                votes.vertical += 1;
            }
            if b.text.trim().chars().count() <= 1 {
                votes.short += 1;
            }
            if b.quad.height() > 2.0 * b.quad.width() {
                votes.tall += 1;
            }
        }
        votes
    }

    fn fraction(&self, n: usize) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            n as f32 / self.total as f32
        }
    }
}

/// Decides whether a raster needs a 90 degree correction.
#[derive(Debug, Clone, Default)]
pub struct OrientationDetector {
    config: OrientationConfig,
}

impl OrientationDetector {
    pub fn new(config: OrientationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OrientationConfig {
        &self.config
    }

    /// Judge orientation from OCR boxes. Box confidence is not used.
    pub fn detect(&self, boxes: &[OcrBox]) -> Orientation {
        let cfg = &self.config;
        let votes = OrientationVotes::count(boxes, &cfg.vertical_angle_range);
        if votes.total < cfg.min_text_count {
            return Orientation::Upright;
        }

        let sideways = votes.fraction(votes.vertical) >= cfg.vertical_ratio
            || votes.fraction(votes.short) > cfg.short_ratio
            || votes.fraction(votes.tall) > cfg.tall_ratio;
        log::debug!("Orientation votes {:?} -> sideways={}", votes, sideways);

        if sideways {
            Orientation::Sideways
        } else {
            Orientation::Upright
        }
    }
}

/// Rotation in degrees (0 or 90) with default ratios.
pub fn detect_rotation(
    boxes: &[OcrBox],
    min_text_count: usize,
    vertical_angle_range: RangeInclusive<f32>,
) -> u16 {
    let config = OrientationConfig::default()
        .with_min_text_count(min_text_count)
        .with_vertical_angle_range(vertical_angle_range);
    OrientationDetector::new(config).detect(boxes).degrees()
}

/// Turn a sideways raster upright (90 degrees clockwise).
pub fn rotate_upright(image: &DynamicImage) -> DynamicImage {
    image.rotate90()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Point, Quad};

    fn word(text: &str, x: f32, y: f32) -> OcrBox {
        OcrBox::new(
            Quad::from_rect(x, y, x + 80.0, y + 20.0),
            text.to_string(),
            0.9,
        )
    }

    fn vertical_word(text: &str, x: f32) -> OcrBox {
        // Reading direction runs down the page.
        let quad = Quad([
            Point::new(x + 20.0, 0.0),
            Point::new(x + 20.0, 80.0),
            Point::new(x, 80.0),
            Point::new(x, 0.0),
        ]);
        OcrBox::new(quad, text.to_string(), 0.9)
    }

    #[test]
    fn test_too_few_boxes_is_upright() {
        let boxes: Vec<OcrBox> = (0..4).map(|i| vertical_word("表", i as f32 * 30.0)).collect();
        assert_eq!(detect_rotation(&boxes, 5, 75.0..=105.0), 0);
    }

    #[test]
    fn test_half_vertical_is_sideways() {
        let mut boxes: Vec<OcrBox> = (0..3)
            .map(|i| vertical_word("營業收入", i as f32 * 30.0))
            .collect();
        boxes.extend((0..3).map(|i| word("Revenue", 0.0, i as f32 * 30.0)));
        assert_eq!(detect_rotation(&boxes, 5, 75.0..=105.0), 90);
    }

    #[test]
    fn test_upright_text() {
        let boxes: Vec<OcrBox> = (0..8)
            .map(|i| word("Quarterly", 0.0, i as f32 * 30.0))
            .collect();
        let detector = OrientationDetector::default();
        assert_eq!(detector.detect(&boxes), Orientation::Upright);
    }

    #[test]
    fn test_short_text_majority_is_sideways() {
        let mut boxes: Vec<OcrBox> = (0..3).map(|i| word("a", 0.0, i as f32 * 30.0)).collect();
        boxes.extend((0..3).map(|i| word("Quarterly", 100.0, i as f32 * 30.0)));
        // 50% short > 40%
        assert_eq!(OrientationDetector::default().detect(&boxes), Orientation::Sideways);
    }

    #[test]
    fn test_tall_boxes_are_sideways() {
        let boxes: Vec<OcrBox> = (0..5)
            .map(|i| {
                let x = i as f32 * 30.0;
                OcrBox::new(Quad::from_rect(x, 0.0, x + 10.0, 60.0), "word".into(), 0.5)
            })
            .collect();
        assert_eq!(OrientationDetector::default().detect(&boxes), Orientation::Sideways);
    }

    #[test]
    fn test_corrected_page_is_upright() {
        // Clockwise turn of a raster of height h maps (x, y) to (h - y, x).
        let turn = |b: &OcrBox, h: f32| {
            let q = b.quad.0.map(|p| Point::new(h - p.y, p.x));
            OcrBox::new(Quad(q), b.text.clone(), b.confidence)
        };
        let boxes: Vec<OcrBox> = (0..6)
            .map(|i| vertical_word("營業收入", i as f32 * 30.0))
            .collect();
        let detector = OrientationDetector::default();
        assert_eq!(detector.detect(&boxes), Orientation::Sideways);

        let corrected: Vec<OcrBox> = boxes.iter().map(|b| turn(b, 200.0)).collect();
        assert_eq!(detector.detect(&corrected), Orientation::Upright);
    }

    #[test]
    fn test_rotate_upright_is_clockwise() {
        let mut img = image::RgbImage::new(3, 2);
        img.put_pixel(0, 0, image::Rgb([255, 0, 0]));
        let rotated = rotate_upright(&DynamicImage::ImageRgb8(img)).to_rgb8();
        assert_eq!(rotated.dimensions(), (2, 3));
        // Top-left moves to top-right under a clockwise turn.
        assert_eq!(rotated.get_pixel(1, 0).0, [255, 0, 0]);
    }
}
