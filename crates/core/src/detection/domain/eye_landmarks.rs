//! Six-point eye contours and the eye-aspect-ratio (EAR) computed from them.
//!
//! Point order is canonical: outer corner, two upper-lid points, inner
//! corner, two lower-lid points. With 1-indexed points
//! `EAR = (|p2 - p6| + |p3 - p5|) / (2 * |p1 - p4|)`.

use serde::{Deserialize, Serialize};

/// Eye widths below this are treated as a degenerate contour.
const MIN_EYE_WIDTH: f64 = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EyeLandmarks {
    points: [(f64, f64); 6],
}

impl EyeLandmarks {
    pub fn new(points: [(f64, f64); 6]) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[(f64, f64); 6] {
        &self.points
    }

    /// Eye aspect ratio, or `None` when the corners coincide.
    pub fn aspect_ratio(&self) -> Option<f64> {
        let [p1, p2, p3, p4, p5, p6] = self.points;
        let horizontal = distance(p1, p4);
        if horizontal < MIN_EYE_WIDTH {
            return None;
        }
        Some((distance(p2, p6) + distance(p3, p5)) / (2.0 * horizontal))
    }
}

/// Both eye contours of one face.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EyePair {
    pub left: EyeLandmarks,
    pub right: EyeLandmarks,
}

impl EyePair {
    /// `(left_ear, right_ear)` when both contours are usable.
    pub fn aspect_ratios(&self) -> Option<(f64, f64)> {
        Some((self.left.aspect_ratio()?, self.right.aspect_ratio()?))
    }
}

fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}
