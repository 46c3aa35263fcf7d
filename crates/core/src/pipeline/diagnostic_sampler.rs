use crate::detection::domain::face_detection::FaceDetection;
use crate::shared::frame::Frame;

/// Spacing used when the clip length is unknown.
const FALLBACK_STRIDE: usize = 30;

/// Picks up to `capacity` evenly spaced frames whose enhanced raster is
/// kept for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DiagnosticSampler {
    capacity: usize,
    stride: usize,
}

impl DiagnosticSampler {
    /// `expected_frames` is the container's frame count, 0 when unknown.
    pub fn new(capacity: usize, expected_frames: usize) -> Self {
        let stride = if expected_frames > 0 && capacity > 0 {
            (expected_frames / capacity).max(1)
        } else {
            FALLBACK_STRIDE
        };
        Self { capacity, stride }
    }

    pub fn disabled() -> Self {
        Self::new(0, 0)
    }

    pub fn wants(&self, frame_index: usize) -> bool {
        self.capacity > 0 && frame_index % self.stride == 0 && frame_index / self.stride < self.capacity
    }
}

const BOX_COLOUR: [u8; 3] = [0, 255, 0];
const EYE_COLOUR: [u8; 3] = [255, 0, 0];

/// Copy of `frame` with the face box outlined and eye points marked.
pub fn annotate(frame: &Frame, detection: Option<&FaceDetection>) -> Frame {
    let mut out = frame.clone();
    let Some(detection) = detection else {
        return out;
    };
    if out.channels() < 3 {
        return out;
    }

    let [x1, y1, x2, y2] = detection.bounding_box.corners();
    let (x1, y1) = (x1.round() as i64, y1.round() as i64);
    let (x2, y2) = (x2.round() as i64 - 1, y2.round() as i64 - 1);
    for x in x1..=x2 {
        put(&mut out, x, y1, BOX_COLOUR);
        put(&mut out, x, y2, BOX_COLOUR);
    }
    for y in y1..=y2 {
        put(&mut out, x1, y, BOX_COLOUR);
        put(&mut out, x2, y, BOX_COLOUR);
    }

    if let Some(eyes) = detection.eyes {
        for &(px, py) in eyes.left.points().iter().chain(eyes.right.points()) {
            let (cx, cy) = (px.round() as i64, py.round() as i64);
            for dy in -1..=1 {
                for dx in -1..=1 {
                    put(&mut out, cx + dx, cy + dy, EYE_COLOUR);
                }
            }
        }
    }
    out
}

fn put(frame: &mut Frame, x: i64, y: i64, colour: [u8; 3]) {
    if x < 0 || y < 0 || x >= frame.width() as i64 || y >= frame.height() as i64 {
        return;
    }
    let offset = (y as usize * frame.width() as usize + x as usize) * frame.channels() as usize;
    frame.data_mut()[offset..offset + 3].copy_from_slice(&colour);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::frame_stage::test_support::face;

    #[test]
    fn test_samples_are_evenly_spread() {
        let sampler = DiagnosticSampler::new(5, 150);
        let picked: Vec<usize> = (0..150).filter(|i| sampler.wants(*i)).collect();
        assert_eq!(picked, vec![0, 30, 60, 90, 120]);
    }

    #[test]
    fn test_short_clip_samples_every_frame_up_to_capacity() {
        let sampler = DiagnosticSampler::new(5, 3);
        assert_eq!((0..10).filter(|i| sampler.wants(*i)).count(), 5);
    }

    #[test]
    fn test_unknown_length_uses_fallback_stride() {
        let sampler = DiagnosticSampler::new(2, 0);
        assert!(sampler.wants(0));
        assert!(sampler.wants(30));
        assert!(!sampler.wants(15));
        assert!(!sampler.wants(60));
    }

    #[test]
    fn test_disabled_wants_nothing() {
        assert!(!DiagnosticSampler::disabled().wants(0));
    }

    #[test]
    fn test_annotate_outlines_box_and_marks_eyes() {
        let frame = Frame::new(vec![0u8; 64 * 64 * 3], 64, 64, 3, 0);
        // box (1,1)-(41,41), eyes drawn around (1..11, 1)
        let annotated = annotate(&frame, Some(&face(40.0, Some(0.3))));
        let px = |x: usize, y: usize| {
            let i = (y * 64 + x) * 3;
            [annotated.data()[i], annotated.data()[i + 1], annotated.data()[i + 2]]
        };
        assert_eq!(px(20, 40), BOX_COLOUR);
        assert_eq!(px(40, 20), BOX_COLOUR);
        assert_eq!(px(20, 20), [0, 0, 0]);
        assert_eq!(px(10, 0), EYE_COLOUR);
        assert_eq!(frame.data().iter().filter(|v| **v != 0).count(), 0);
    }

    #[test]
    fn test_annotate_without_face_is_a_copy() {
        let frame = Frame::new(vec![7u8; 8 * 8 * 3], 8, 8, 3, 0);
        assert_eq!(annotate(&frame, None).data(), frame.data());
    }

    #[test]
    fn test_annotate_clips_boxes_outside_frame() {
        let frame = Frame::new(vec![0u8; 8 * 8 * 3], 8, 8, 3, 0);
        let annotated = annotate(&frame, Some(&face(100.0, None)));
        assert_eq!(annotated.data().len(), frame.data().len());
    }
}
