//! Box arithmetic shared by the ONNX detection backends.

use crate::shared::bounding_box::BoundingBox;

/// A candidate box with its detector score.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoredBox {
    pub bbox: BoundingBox,
    pub score: f64,
}

/// Intersection over union of two boxes.
pub fn iou(a: &BoundingBox, b: &BoundingBox) -> f64 {
    let [ax1, ay1, ax2, ay2] = a.corners();
    let [bx1, by1, bx2, by2] = b.corners();

    let inter = (ax2.min(bx2) - ax1.max(bx1)).max(0.0) * (ay2.min(by2) - ay1.max(by1)).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    inter / (a.area() + b.area() - inter)
}

/// Greedy non-maximum suppression, highest score first.
pub fn nms(mut candidates: Vec<ScoredBox>, iou_thresh: f64) -> Vec<ScoredBox> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut keep: Vec<ScoredBox> = Vec::new();
    for c in candidates {
        if keep.iter().all(|k| iou(&k.bbox, &c.bbox) <= iou_thresh) {
            keep.push(c);
        }
    }
    keep
}

pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
