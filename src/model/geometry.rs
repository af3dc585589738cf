//! Pixel-space geometry shared by OCR, orientation and table detection.

use serde::{Deserialize, Serialize};

/// A point in raster pixel coordinates (origin top-left, y grows downward).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Point) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// A quadrilateral as reported by OCR engines.
///
/// Corners are ordered top-left, top-right, bottom-right, bottom-left in the
/// reading frame of the recognized text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quad(pub [Point; 4]);

impl Quad {
    /// Build an axis-aligned quad from a rectangle.
    pub fn from_rect(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self([
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ])
    }

    /// Absolute angle of the top edge (corner 0 to corner 1), in degrees `[0, 180]`.
    pub fn top_edge_angle(&self) -> f32 {
        let [p0, p1, _, _] = self.0;
        (p1.y - p0.y).atan2(p1.x - p0.x).to_degrees().abs()
    }

    /// Length of the top edge.
    pub fn width(&self) -> f32 {
        self.0[0].distance(&self.0[1])
    }

    /// Length of the left edge.
    pub fn height(&self) -> f32 {
        self.0[0].distance(&self.0[3])
    }

    /// Axis-aligned bounds of the quad.
    pub fn bounds(&self) -> BBox {
        let xs = self.0.iter().map(|p| p.x);
        let ys = self.0.iter().map(|p| p.y);
        BBox {
            x0: xs.clone().fold(f32::INFINITY, f32::min),
            y0: ys.clone().fold(f32::INFINITY, f32::min),
            x1: xs.fold(f32::NEG_INFINITY, f32::max),
            y1: ys.fold(f32::NEG_INFINITY, f32::max),
        }
    }
}

/// Multiplicative margins applied to a detected box before cropping.
///
/// Each factor scales the corresponding absolute coordinate, so a left factor
/// below 1 moves the left edge toward the page origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxMargins {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl BoxMargins {
    /// Margins that leave the box untouched.
    pub const NONE: BoxMargins = BoxMargins {
        left: 1.0,
        top: 1.0,
        right: 1.0,
        bottom: 1.0,
    };
}

impl Default for BoxMargins {
    fn default() -> Self {
        Self {
            left: 0.9,
            top: 0.75,
            right: 1.1,
            bottom: 1.1,
        }
    }
}

/// Axis-aligned box in pixel coordinates, `x0 <= x1`, `y0 <= y1`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BBox {
    /// Create a box, normalizing corner order.
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    pub fn width(&self) -> f32 {
        (self.x1 - self.x0).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y1 - self.y0).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// True when the box has no area.
    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Scale each edge by its margin factor.
    pub fn expand(&self, margins: &BoxMargins) -> BBox {
        BBox::new(
            self.x0 * margins.left,
            self.y0 * margins.top,
            self.x1 * margins.right,
            self.y1 * margins.bottom,
        )
    }

    /// Clip the box to `[0, width] x [0, height]`.
    pub fn clamp(&self, width: f32, height: f32) -> BBox {
        BBox {
            x0: self.x0.clamp(0.0, width),
            y0: self.y0.clamp(0.0, height),
            x1: self.x1.clamp(0.0, width),
            y1: self.y1.clamp(0.0, height),
        }
    }

    /// The box after a clockwise quarter turn of a frame `frame_height` tall.
    ///
    /// A `w x h` frame becomes `h x w`; `(x, y)` maps to `(frame_height - y, x)`.
    pub fn turn_clockwise(&self, frame_height: f32) -> BBox {
        BBox::new(frame_height - self.y1, self.x0, frame_height - self.y0, self.x1)
    }

    /// Integer crop rectangle `(x, y, w, h)` suitable for `image::imageops::crop`.
    pub fn to_crop_rect(&self) -> (u32, u32, u32, u32) {
        let x = self.x0.floor().max(0.0) as u32;
        let y = self.y0.floor().max(0.0) as u32;
        let x1 = self.x1.ceil().max(0.0) as u32;
        let y1 = self.y1.ceil().max(0.0) as u32;
        (x, y, x1.saturating_sub(x), y1.saturating_sub(y))
    }
}

/// Area covered by the union of `boxes`.
///
/// Overlapping detections are counted once. Uses coordinate compression,
/// which is fine for the handful of boxes found on a page.
pub fn union_area(boxes: &[BBox]) -> f32 {
    let boxes: Vec<&BBox> = boxes.iter().filter(|b| !b.is_empty()).collect();
    if boxes.is_empty() {
        return 0.0;
    }

    let mut xs: Vec<f32> = boxes.iter().flat_map(|b| [b.x0, b.x1]).collect();
    let mut ys: Vec<f32> = boxes.iter().flat_map(|b| [b.y0, b.y1]).collect();
    xs.sort_by(f32::total_cmp);
    xs.dedup();
    ys.sort_by(f32::total_cmp);
    ys.dedup();

    let mut area = 0.0;
    for xw in xs.windows(2) {
        for yw in ys.windows(2) {
            let (cx, cy) = ((xw[0] + xw[1]) / 2.0, (yw[0] + yw[1]) / 2.0);
            let covered = boxes
                .iter()
                .any(|b| cx > b.x0 && cx < b.x1 && cy > b.y0 && cy < b.y1);
            if covered {
                area += (xw[1] - xw[0]) * (yw[1] - yw[0]);
            }
        }
    }
    area
}
