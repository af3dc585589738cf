//! Where table regions come from.

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::engine::TableDetectionModel;
use crate::error::Result;
use crate::model::{BBox, Page};

use super::detection::{post_process, Detection};

/// Selects the [`TableRegionStrategy`] built from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionStrategyKind {
    /// Object-detection model over the page raster
    Model,
    /// Native span-alignment tables mapped onto the raster
    #[default]
    Structural,
}

/// Finds table regions on a page raster.
pub trait TableRegionStrategy: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Table boxes in `raster` pixel space, in detection order.
    fn regions(&self, page: &Page, raster: &DynamicImage) -> Result<Vec<Detection>>;
}

/// Runs a [`TableDetectionModel`] on the full raster.
pub struct ModelRegionStrategy {
    model: Box<dyn TableDetectionModel>,
    confidence_floor: f32,
}

impl ModelRegionStrategy {
    pub fn new(model: Box<dyn TableDetectionModel>, confidence_floor: f32) -> Self {
        Self {
            model,
            confidence_floor,
        }
    }

    pub fn confidence_floor(&self) -> f32 {
        self.confidence_floor
    }
}

impl TableRegionStrategy for ModelRegionStrategy {
    fn name(&self) -> &'static str {
        "model"
    }

    fn regions(&self, page: &Page, raster: &DynamicImage) -> Result<Vec<Detection>> {
        let raw = self.model.infer(raster)?;
        let detections = post_process(&raw, raster.width(), raster.height(), self.confidence_floor);
        log::debug!(
            "Page {}: model proposed {} queries, kept {} at floor {}",
            page.number,
            raw.len(),
            detections.len(),
            self.confidence_floor
        );
        Ok(detections)
    }
}

/// Reuses the tables found in the text layer during scanning.
///
/// Regions are stored in unrotated, top-left-origin page points. The
/// renderer applies the page's `/Rotate`, and a sideways raster is later
/// turned upright once more; both are clockwise quarter turns, applied to
/// the box in page space before scaling to the raster.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralRegionStrategy;

impl StructuralRegionStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl TableRegionStrategy for StructuralRegionStrategy {
    fn name(&self) -> &'static str {
        "structural"
    }

    fn regions(&self, page: &Page, raster: &DynamicImage) -> Result<Vec<Detection>> {
        if page.width <= 0.0 || page.height <= 0.0 {
            return Ok(Vec::new());
        }

        let turns = (page.rotation / 90 + u16::from(page.rotated)) % 4;
        let (w, h) = (raster.width() as f32, raster.height() as f32);

        let detections = page
            .table_regions
            .iter()
            .map(|r| {
                let (mut b, mut frame_w, mut frame_h) = (*r, page.width, page.height);
                for _ in 0..turns {
                    b = b.turn_clockwise(frame_h);
                    std::mem::swap(&mut frame_w, &mut frame_h);
                }
                let (sx, sy) = (w / frame_w, h / frame_h);
                BBox::new(b.x0 * sx, b.y0 * sy, b.x1 * sx, b.y1 * sy).clamp(w, h)
            })
            .filter(|b| !b.is_empty())
            .map(|b| Detection::new(b, 1.0, 0))
            .collect();
        Ok(detections)
    }
}
