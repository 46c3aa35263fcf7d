use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::detection::domain::face_detection::FaceDetection;
use crate::detection::domain::landmark_provider::LandmarkProvider;
use crate::detection::domain::orientation_resolver::resolve_orientation;
use crate::enhancement::domain::frame_enhancer::FrameEnhancer;
use crate::liveness::domain::ear_sample::EarSample;
use crate::shared::frame::Frame;
use crate::shared::rotation::Rotation;

/// What the per-frame stage learned about one frame.
#[derive(Clone, Debug, Serialize)]
pub struct FrameObservation {
    pub frame_index: usize,
    /// Correction that found the face; `None` when no face was found.
    pub rotation: Rotation,
    /// The active (largest) face, in the coordinates of the oriented frame.
    pub detection: Option<FaceDetection>,
    /// Present only when the active face had usable eye contours.
    pub sample: Option<EarSample>,
    /// The landmark provider failed on this frame.
    pub extraction_failed: bool,
    pub stage_ms: f64,
}

impl FrameObservation {
    /// The frame counts towards face coverage.
    pub fn face_accepted(&self) -> bool {
        self.sample.is_some()
    }
}

pub struct ProcessedFrame {
    pub observation: FrameObservation,
    /// The enhanced, oriented frame, kept only when requested.
    pub enhanced: Option<Frame>,
}

/// Enhancement, orientation and EAR extraction for a single frame.
///
/// Stateless apart from the shared handles, so one stage serves every
/// worker thread.
#[derive(Clone)]
pub struct FrameStage {
    enhancer: Arc<dyn FrameEnhancer>,
    provider: Arc<dyn LandmarkProvider>,
}

impl FrameStage {
    pub fn new(enhancer: Arc<dyn FrameEnhancer>, provider: Arc<dyn LandmarkProvider>) -> Self {
        Self { enhancer, provider }
    }

    /// Never fails: a provider error marks the frame as undetected.
    pub fn process(&self, frame: Frame, keep_enhanced: bool) -> ProcessedFrame {
        let start = Instant::now();
        let frame_index = frame.index();

        let enhanced = self.enhancer.enhance(&frame);
        drop(frame);
        let fallback = keep_enhanced.then(|| enhanced.clone());

        let (oriented, extraction_failed) = match resolve_orientation(enhanced, &*self.provider) {
            Ok(oriented) => (Some(oriented), false),
            Err(e) => {
                log::warn!("Frame {frame_index}: landmark extraction failed: {e}");
                (None, true)
            }
        };

        let (rotation, detection, kept) = match oriented {
            Some(o) => {
                let detection = FaceDetection::select_primary(&o.detections).cloned();
                let kept = keep_enhanced.then_some(o.frame);
                (o.rotation, detection, kept)
            }
            None => (Rotation::None, None, fallback),
        };

        let sample = detection
            .as_ref()
            .and_then(|d| d.eyes.as_ref())
            .and_then(|eyes| EarSample::from_eyes(frame_index, eyes));

        ProcessedFrame {
            observation: FrameObservation {
                frame_index,
                rotation,
                detection,
                sample,
                extraction_failed,
                stage_ms: start.elapsed().as_secs_f64() * 1000.0,
            },
            enhanced: kept,
        }
    }
}
