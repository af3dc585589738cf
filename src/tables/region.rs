//! Table region cropping, OCR and title recovery.

use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};

use crate::engine::{join_lines, ocr_failure_marker, OcrEngine};
use crate::error::{Error, Result};
use crate::model::{BBox, BoxMargins, Page, TableBlock, NO_TITLE};
use crate::pipeline::OutputLayout;

use super::detection::Detection;
use super::strategy::TableRegionStrategy;

/// Where to look for a table's title, relative to the detected box.
///
/// The window spans `left * x0 ..= x0 + width * box_width` horizontally and
/// `top * y0 ..= y0` vertically, i.e. the band just above the table's left
/// part.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TitleWindow {
    pub left: f32,
    pub width: f32,
    pub top: f32,
}

impl Default for TitleWindow {
    fn default() -> Self {
        Self {
            left: 0.8,
            width: 0.75,
            top: 0.6,
        }
    }
}

impl TitleWindow {
    /// Title search window for a detected table box.
    pub fn window(&self, table: &BBox) -> BBox {
        BBox::new(
            table.x0 * self.left,
            table.y0 * self.top,
            table.x0 + table.width() * self.width,
            table.y0,
        )
    }
}

/// Tunables for [`TableRegionDetector`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    /// Minimum detector confidence (model strategy only)
    pub confidence_floor: f32,
    /// Expansion applied before cropping
    pub margins: BoxMargins,
    pub title_window: TitleWindow,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            confidence_floor: 0.6,
            margins: BoxMargins::default(),
            title_window: TitleWindow::default(),
        }
    }
}

impl RegionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Higher floor and tight crops.
    pub fn strict() -> Self {
        Self {
            confidence_floor: 0.7,
            margins: BoxMargins::NONE,
            ..Self::default()
        }
    }

    pub fn with_confidence_floor(mut self, floor: f32) -> Self {
        self.confidence_floor = floor;
        self
    }

    pub fn with_margins(mut self, margins: BoxMargins) -> Self {
        self.margins = margins;
        self
    }

    pub fn with_title_window(mut self, window: TitleWindow) -> Self {
        self.title_window = window;
        self
    }
}

/// Turns a page raster into [`TableBlock`]s.
pub struct TableRegionDetector<'a> {
    strategy: &'a dyn TableRegionStrategy,
    ocr: &'a dyn OcrEngine,
    config: &'a RegionConfig,
}

impl<'a> TableRegionDetector<'a> {
    pub fn new(
        strategy: &'a dyn TableRegionStrategy,
        ocr: &'a dyn OcrEngine,
        config: &'a RegionConfig,
    ) -> Self {
        Self {
            strategy,
            ocr,
            config,
        }
    }

    /// Find, crop, persist and OCR every table region on `page`.
    ///
    /// The page must already carry its (orientation-corrected) raster.
    /// Crops are written as `page{N}_table{M}.png` with `M` counting
    /// accepted regions from 1.
    pub fn detect(&self, page: &Page, layout: &OutputLayout) -> Result<Vec<TableBlock>> {
        let raster = page
            .raster
            .as_ref()
            .ok_or_else(|| Error::Other(format!("page {} has no raster", page.number)))?;

        let detections = self.strategy.regions(page, raster)?;
        log::info!(
            "Page {}: {} table region(s) via {} strategy",
            page.number,
            detections.len(),
            self.strategy.name()
        );

        let mut blocks = Vec::with_capacity(detections.len());
        for (index, detection) in detections.iter().enumerate() {
            blocks.push(self.extract_block(page.number, index + 1, raster, detection, layout)?);
        }
        Ok(blocks)
    }

    fn extract_block(
        &self,
        page: u32,
        index: usize,
        raster: &DynamicImage,
        detection: &Detection,
        layout: &OutputLayout,
    ) -> Result<TableBlock> {
        let (w, h) = (raster.width() as f32, raster.height() as f32);
        let crop_box = detection.bbox.expand(&self.config.margins).clamp(w, h);
        let crop = crop(raster, &crop_box);

        let image_path = layout.table_path(page, index);
        crop.save_with_format(&image_path, ImageFormat::Png)?;

        let ocr_text = match self.ocr.recognize(&crop) {
            Ok(boxes) => join_lines(&boxes, None),
            Err(e) => {
                log::warn!("Page {} table {}: OCR failed: {}", page, index, e);
                ocr_failure_marker(&e)
            }
        };
        let title = self.title(raster, &detection.bbox);
        log::debug!(
            "Page {} table {}: box {:?}, title {:?}",
            page,
            index,
            detection.bbox,
            title
        );

        Ok(TableBlock {
            page,
            image_path,
            ocr_text,
            width: detection.bbox.width(),
            title,
            bbox: detection.bbox,
            score: detection.score,
        })
    }

    /// OCR the band above the table; [`NO_TITLE`] when nothing is there.
    fn title(&self, raster: &DynamicImage, table: &BBox) -> String {
        let window = self
            .config
            .title_window
            .window(table)
            .clamp(raster.width() as f32, raster.height() as f32);
        let (_, _, cw, ch) = window.to_crop_rect();
        if window.is_empty() || cw == 0 || ch == 0 {
            return NO_TITLE.to_string();
        }

        match self.ocr.recognize(&crop(raster, &window)) {
            Ok(boxes) => {
                let text = join_lines(&boxes, None);
                if text.is_empty() {
                    NO_TITLE.to_string()
                } else {
                    text
                }
            }
            Err(e) => {
                log::warn!("Title OCR failed: {}", e);
                NO_TITLE.to_string()
            }
        }
    }
}

fn crop(raster: &DynamicImage, region: &BBox) -> DynamicImage {
    let (x, y, w, h) = region.to_crop_rect();
    let w = w.min(raster.width().saturating_sub(x)).max(1);
    let h = h.min(raster.height().saturating_sub(y)).max(1);
    raster.crop_imm(x, y, w, h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::OcrBox;
    use crate::model::{PageScan, Quad};
    use crate::tables::StructuralRegionStrategy;

    /// Title-sized crops read as a caption, anything taller as its size.
    struct SizeOcr;

    impl OcrEngine for SizeOcr {
        fn recognize(&self, image: &DynamicImage) -> Result<Vec<OcrBox>> {
            let quad = Quad::from_rect(0.0, 0.0, 10.0, 5.0);
            if image.height() <= 100 {
                Ok(vec![OcrBox::new(quad, "Table 3. Revenue".into(), 0.9)])
            } else {
                Ok(vec![OcrBox::new(quad, format!("{}x{}", image.width(), image.height()), 0.9)])
            }
        }
    }

    #[test]
    fn test_title_window() {
        let window = TitleWindow::default().window(&BBox::new(100.0, 200.0, 300.0, 400.0));
        assert!((window.x0 - 80.0).abs() < 1e-3);
        assert!((window.x1 - 250.0).abs() < 1e-3);
        assert!((window.y0 - 120.0).abs() < 1e-3);
        assert!((window.y1 - 200.0).abs() < 1e-3);
    }

    #[test]
    fn test_strict_preset() {
        let strict = RegionConfig::strict();
        assert_eq!(strict.confidence_floor, 0.7);
        assert_eq!(strict.margins, BoxMargins::NONE);
    }

    #[test]
    fn test_detect_crops_and_titles() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::create(dir.path(), "report").unwrap();

        let mut scan = PageScan::new(4, 100.0, 100.0);
        scan.table_regions = vec![BBox::new(20.0, 50.0, 80.0, 90.0)];
        let mut page = Page::from(scan);
        page.raster = Some(DynamicImage::new_rgb8(500, 500));

        let config = RegionConfig::default();
        let detector = TableRegionDetector::new(&StructuralRegionStrategy, &SizeOcr, &config);
        let blocks = detector.detect(&page, &layout).unwrap();

        assert_eq!(blocks.len(), 1);
        let block = &blocks[0];
        assert_eq!(block.page, 4);
        assert!(block.image_path.ends_with("tables/page4_table1.png"));
        assert!(block.image_path.exists());
        assert_eq!(block.width, 300.0);
        assert_eq!(block.title, "Table 3. Revenue");
        // Box (100,250)-(400,450) expanded by the default margins.
        let (cw, ch) = block.ocr_text.split_once('x').unwrap();
        let (cw, ch): (u32, u32) = (cw.parse().unwrap(), ch.parse().unwrap());
        assert!((349..=351).contains(&cw), "{}", block.ocr_text);
        assert!((307..=309).contains(&ch), "{}", block.ocr_text);
    }

    #[test]
    fn test_table_at_top_has_no_title() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::create(dir.path(), "report").unwrap();

        let mut scan = PageScan::new(1, 100.0, 100.0);
        scan.table_regions = vec![BBox::new(0.0, 0.0, 100.0, 60.0)];
        let mut page = Page::from(scan);
        page.raster = Some(DynamicImage::new_rgb8(300, 300));

        let config = RegionConfig::default();
        let detector = TableRegionDetector::new(&StructuralRegionStrategy, &SizeOcr, &config);
        let blocks = detector.detect(&page, &layout).unwrap();
        assert_eq!(blocks[0].title, NO_TITLE);
    }

    #[test]
    fn test_missing_raster_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::create(dir.path(), "report").unwrap();
        let page = Page::from(PageScan::new(1, 100.0, 100.0));
        let config = RegionConfig::default();
        let detector = TableRegionDetector::new(&StructuralRegionStrategy, &SizeOcr, &config);
        assert!(detector.detect(&page, &layout).is_err());
    }
}
