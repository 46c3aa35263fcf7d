use crate::detection::domain::face_detection::FaceDetection;
use crate::shared::frame::Frame;
use crate::shared::BoxError;

/// Domain interface for face and eye-contour detection.
///
/// Every frame is evaluated independently: no tracking identity is carried
/// between calls. Implementations are shared across analyses and worker
/// threads, hence `&self` and `Sync`; any per-call state is forbidden.
pub trait LandmarkProvider: Send + Sync {
    fn detect(&self, frame: &Frame) -> Result<Vec<FaceDetection>, BoxError>;
}
