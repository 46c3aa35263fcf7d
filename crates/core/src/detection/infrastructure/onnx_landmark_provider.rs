use std::path::Path;

use crate::detection::domain::face_detection::FaceDetection;
use crate::detection::domain::landmark_provider::LandmarkProvider;
use crate::detection::infrastructure::math::ScoredBox;
use crate::detection::infrastructure::onnx_blazeface_detector::{
    OnnxBlazefaceDetector, DEFAULT_CONFIDENCE,
};
use crate::detection::infrastructure::onnx_face_mesh::OnnxFaceMesh;
use crate::shared::frame::Frame;
use crate::shared::BoxError;

/// Faces refined with the mesh per frame; the largest win.
pub const DEFAULT_MAX_FACES: usize = 1;

/// [`LandmarkProvider`] backed by a BlazeFace detector and a face mesh.
///
/// Both sessions sit behind mutexes, so one provider can be shared by every
/// worker; no state survives a call.
pub struct OnnxLandmarkProvider {
    detector: OnnxBlazefaceDetector,
    mesh: OnnxFaceMesh,
    max_faces: usize,
}

impl OnnxLandmarkProvider {
    pub fn new(detector_model: &Path, mesh_model: &Path) -> Result<Self, BoxError> {
        Ok(Self {
            detector: OnnxBlazefaceDetector::new(detector_model, DEFAULT_CONFIDENCE)?,
            mesh: OnnxFaceMesh::new(mesh_model)?,
            max_faces: DEFAULT_MAX_FACES,
        })
    }

    pub fn with_max_faces(mut self, max_faces: usize) -> Self {
        self.max_faces = max_faces.max(1);
        self
    }
}

/// The `max_faces` largest boxes, largest first.
fn largest_faces(mut boxes: Vec<ScoredBox>, max_faces: usize) -> Vec<ScoredBox> {
    boxes.sort_by(|a, b| b.bbox.area().total_cmp(&a.bbox.area()));
    boxes.truncate(max_faces);
    boxes
}

impl LandmarkProvider for OnnxLandmarkProvider {
    fn detect(&self, frame: &Frame) -> Result<Vec<FaceDetection>, BoxError> {
        let boxes = self.detector.detect_boxes(frame)?;
        largest_faces(boxes, self.max_faces)
            .into_iter()
            .map(|face| {
                let detection = FaceDetection::new(face.bbox, face.score);
                Ok(match self.mesh.eyes(frame, &face.bbox)? {
                    Some(eyes) => detection.with_eyes(eyes),
                    None => detection,
                })
            })
            .collect()
    }
}
