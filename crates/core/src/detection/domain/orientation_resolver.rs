//! Compensates for clips captured sideways relative to the decoder's layout.
//!
//! Phones frequently store portrait selfies as landscape frames with a
//! rotation tag that not every container honours. When no face is found at
//! native orientation, a landscape frame is retried turned 90° clockwise,
//! then 90° counter-clockwise; the first orientation with a face wins.

use crate::detection::domain::face_detection::FaceDetection;
use crate::detection::domain::landmark_provider::LandmarkProvider;
use crate::shared::frame::Frame;
use crate::shared::rotation::Rotation;
use crate::shared::BoxError;

/// A frame in the orientation that produced its detections.
#[derive(Debug)]
pub struct OrientedFrame {
    pub frame: Frame,
    pub detections: Vec<FaceDetection>,
    pub rotation: Rotation,
}

/// Runs `provider` on `frame`, retrying fixed rotations if nothing is found.
///
/// Returns the native frame with no detections when no orientation works.
/// Provider errors are returned as-is; the caller decides how to degrade.
pub fn resolve_orientation(
    frame: Frame,
    provider: &dyn LandmarkProvider,
) -> Result<OrientedFrame, BoxError> {
    let detections = provider.detect(&frame)?;
    if !detections.is_empty() || !frame.is_landscape() {
        return Ok(OrientedFrame {
            frame,
            detections,
            rotation: Rotation::None,
        });
    }

    for rotation in Rotation::FALLBACKS {
        let turned = frame.rotated(rotation);
        let mut detections = provider.detect(&turned)?;
        if !detections.is_empty() {
            for d in &mut detections {
                d.rotation_applied = rotation;
            }
            log::debug!(
                "Frame {}: face found after {rotation} correction",
                frame.index()
            );
            return Ok(OrientedFrame {
                frame: turned,
                detections,
                rotation,
            });
        }
    }

    Ok(OrientedFrame {
        frame,
        detections: Vec::new(),
        rotation: Rotation::None,
    })
}
