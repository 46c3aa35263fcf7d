use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::detection::domain::face_detection::FaceDetection;
use crate::detection::domain::landmark_provider::LandmarkProvider;
use crate::shared::frame::Frame;
use crate::shared::BoxError;

/// Replays precomputed detections by frame index.
///
/// Lets a clip be re-analysed with different blink or scoring settings
/// without running the models again. Frames absent from the cache have no
/// face.
#[derive(Clone)]
pub struct CachedLandmarkProvider {
    cache: Arc<HashMap<usize, Vec<FaceDetection>>>,
}

impl CachedLandmarkProvider {
    pub fn new(cache: Arc<HashMap<usize, Vec<FaceDetection>>>) -> Self {
        Self { cache }
    }

    /// Loads a JSON object mapping frame indices to detection lists.
    pub fn load(path: &Path) -> Result<Self, BoxError> {
        let json = fs::read_to_string(path)
            .map_err(|e| format!("failed to read landmarks {}: {e}", path.display()))?;
        let cache: HashMap<usize, Vec<FaceDetection>> = serde_json::from_str(&json)
            .map_err(|e| format!("failed to parse landmarks {}: {e}", path.display()))?;
        log::info!("Replaying landmarks for {} frame(s) from {}", cache.len(), path.display());
        Ok(Self::new(Arc::new(cache)))
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl LandmarkProvider for CachedLandmarkProvider {
    fn detect(&self, frame: &Frame) -> Result<Vec<FaceDetection>, BoxError> {
        Ok(self.cache.get(&frame.index()).cloned().unwrap_or_default())
    }
}
