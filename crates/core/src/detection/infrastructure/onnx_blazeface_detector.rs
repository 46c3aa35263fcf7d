//! BlazeFace short-range face detector on ONNX Runtime.
//!
//! Produces scored face boxes only; eye contours come from the face mesh.

use std::path::Path;
use std::sync::Mutex;

use ort::session::Session;

use crate::detection::infrastructure::execution_provider::load_session;
use crate::detection::infrastructure::math::{nms, sigmoid, ScoredBox};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;
use crate::shared::BoxError;

/// BlazeFace model input resolution.
const INPUT_SIZE: u32 = 128;

/// Minimum face score, matching the usual face-mesh detection confidence.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

const NMS_IOU_THRESH: f64 = 0.3;

/// Anchors of the short-range model: 16x16x2 + 8x8x6.
const NUM_ANCHORS: usize = 896;

/// Values per anchor in the regressor output (box + six keypoints).
const REGRESSOR_STRIDE: usize = 16;

pub struct OnnxBlazefaceDetector {
    session: Mutex<Session>,
    confidence: f64,
    anchors: Vec<[f32; 2]>,
}

impl OnnxBlazefaceDetector {
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, BoxError> {
        Ok(Self {
            session: Mutex::new(load_session(model_path)?),
            confidence,
            anchors: generate_anchors(),
        })
    }

    /// Face boxes in frame pixels after score filtering and NMS.
    pub fn detect_boxes(&self, frame: &Frame) -> Result<Vec<ScoredBox>, BoxError> {
        let input = ort::value::Tensor::from_array(preprocess(frame, INPUT_SIZE))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| "face detector session poisoned")?;
        let outputs = session.run(ort::inputs![input])?;

        // regressors [1, 896, 16], classificators [1, 896, 1]
        if outputs.len() < 2 {
            return Err(format!("BlazeFace expected 2 outputs, got {}", outputs.len()).into());
        }
        let regressors = outputs[0].try_extract_array::<f32>()?;
        let scores = outputs[1].try_extract_array::<f32>()?;
        let reg = regressors.as_slice().ok_or("regressor output is not contiguous")?;
        let raw_scores = scores.as_slice().ok_or("score output is not contiguous")?;

        let candidates = decode(
            reg,
            raw_scores,
            &self.anchors,
            self.confidence as f32,
            frame.width() as f32,
            frame.height() as f32,
        );
        Ok(nms(candidates, NMS_IOU_THRESH))
    }
}

/// Turns anchor-relative regressions into clamped frame-space boxes.
fn decode(
    reg: &[f32],
    raw_scores: &[f32],
    anchors: &[[f32; 2]],
    confidence: f32,
    fw: f32,
    fh: f32,
) -> Vec<ScoredBox> {
    let size = INPUT_SIZE as f32;
    let mut out = Vec::new();

    for (i, (&raw, anchor)) in raw_scores.iter().zip(anchors).enumerate() {
        let score = sigmoid(raw);
        if score < confidence {
            continue;
        }
        let offset = i * REGRESSOR_STRIDE;
        let Some(r) = reg.get(offset..offset + 4) else {
            break;
        };

        let cx = anchor[0] + r[0] / size;
        let cy = anchor[1] + r[1] / size;
        let (w, h) = (r[2] / size, r[3] / size);

        let x1 = ((cx - w / 2.0) * fw).max(0.0);
        let y1 = ((cy - h / 2.0) * fh).max(0.0);
        let x2 = ((cx + w / 2.0) * fw).min(fw);
        let y2 = ((cy + h / 2.0) * fh).min(fh);
        if x2 <= x1 || y2 <= y1 {
            continue;
        }

        out.push(ScoredBox {
            bbox: BoundingBox::from_corners(x1 as f64, y1 as f64, x2 as f64, y2 as f64),
            score: score as f64,
        });
    }
    out
}

/// Nearest-neighbour resize to `size x size`, scaled to [0, 1], NCHW.
fn preprocess(frame: &Frame, size: u32) -> ndarray::Array4<f32> {
    let src = frame.as_ndarray();
    let (src_h, src_w) = (frame.height() as usize, frame.width() as usize);
    let s = size as usize;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, s, s));
    for y in 0..s {
        let sy = (((y as f64 + 0.5) * src_h as f64 / s as f64) as usize).min(src_h - 1);
        for x in 0..s {
            let sx = (((x as f64 + 0.5) * src_w as f64 / s as f64) as usize).min(src_w - 1);
            for c in 0..3 {
                tensor[[0, c, y, x]] = src[[sy, sx, c]] as f32 / 255.0;
            }
        }
    }
    tensor
}

/// Anchor centres for the short-range model, normalised to [0, 1].
fn generate_anchors() -> Vec<[f32; 2]> {
    let mut anchors = Vec::with_capacity(NUM_ANCHORS);
    for (stride, per_cell) in [(8usize, 2usize), (16, 6)] {
        let grid = INPUT_SIZE as usize / stride;
        for y in 0..grid {
            for x in 0..grid {
                let centre = [
                    (x as f32 + 0.5) / grid as f32,
                    (y as f32 + 0.5) / grid as f32,
                ];
                anchors.extend(std::iter::repeat(centre).take(per_cell));
            }
        }
    }
    anchors
}
