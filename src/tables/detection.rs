//! Post-processing of raw detector output.

use crate::engine::RawDetections;
use crate::model::BBox;

/// One accepted table region in raster pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub bbox: BBox,
    pub score: f32,
    /// Winning class index (never the "no object" class)
    pub label: usize,
}

impl Detection {
    pub fn new(bbox: BBox, score: f32, label: usize) -> Self {
        Self { bbox, score, label }
    }
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Turn raw per-query logits and normalized boxes into pixel detections.
///
/// Class probabilities come from a softmax over each query's logits; the
/// last class means "no object" and is never selected. Queries whose best
/// class scores at least `threshold` are kept, in query order. Boxes are
/// scaled to `width x height` and clamped to the raster.
pub fn post_process(raw: &RawDetections, width: u32, height: u32, threshold: f32) -> Vec<Detection> {
    let (w, h) = (width as f32, height as f32);

    raw.logits
        .iter()
        .zip(&raw.boxes)
        .filter_map(|(logits, &[cx, cy, bw, bh])| {
            if logits.len() < 2 {
                return None;
            }
            let probs = softmax(logits);
            let (label, score) = probs[..probs.len() - 1]
                .iter()
                .copied()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(&b.1))?;
            if score < threshold {
                return None;
            }

            let bbox = BBox::new(
                (cx - bw / 2.0) * w,
                (cy - bh / 2.0) * h,
                (cx + bw / 2.0) * w,
                (cy + bh / 2.0) * h,
            )
            .clamp(w, h);
            (!bbox.is_empty()).then(|| Detection::new(bbox, score, label))
        })
        .collect()
}
