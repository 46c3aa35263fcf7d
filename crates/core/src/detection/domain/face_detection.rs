use serde::{Deserialize, Serialize};

use crate::detection::domain::eye_landmarks::EyePair;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::rotation::Rotation;

/// One face found by a landmark provider, in the coordinates of the frame
/// it was detected in.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaceDetection {
    pub bounding_box: BoundingBox,
    pub confidence: f64,
    /// Orientation correction the frame had when this face was found.
    pub rotation_applied: Rotation,
    /// Eye contours when the provider could place them.
    pub eyes: Option<EyePair>,
}

impl FaceDetection {
    pub fn new(bounding_box: BoundingBox, confidence: f64) -> Self {
        Self {
            bounding_box,
            confidence,
            rotation_applied: Rotation::None,
            eyes: None,
        }
    }

    pub fn with_eyes(mut self, eyes: EyePair) -> Self {
        self.eyes = Some(eyes);
        self
    }

    /// True when both eye contours yield a finite aspect ratio.
    pub fn has_usable_eyes(&self) -> bool {
        self.eyes.is_some_and(|e| e.aspect_ratios().is_some())
    }

    /// The active face of a frame: the detection with the largest box.
    pub fn select_primary(detections: &[FaceDetection]) -> Option<&FaceDetection> {
        detections.iter().max_by(|a, b| {
            a.bounding_box
                .area()
                .partial_cmp(&b.bounding_box.area())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    }
}
