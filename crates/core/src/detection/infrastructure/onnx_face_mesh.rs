//! 468-point face mesh on ONNX Runtime, reduced to the two eye contours.

use std::path::Path;
use std::sync::Mutex;

use ort::session::Session;

use crate::detection::domain::eye_landmarks::{EyeLandmarks, EyePair};
use crate::detection::infrastructure::execution_provider::{image_input_layout, load_session};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;
use crate::shared::BoxError;

const DEFAULT_INPUT_SIZE: u32 = 192;
const MESH_POINTS: usize = 468;

/// Mesh indices of the six-point contours, in EAR order
/// (outer corner, upper lid x2, inner corner, lower lid x2).
pub const LEFT_EYE_INDICES: [usize; 6] = [33, 160, 158, 133, 153, 144];
pub const RIGHT_EYE_INDICES: [usize; 6] = [362, 385, 387, 263, 373, 380];

/// The crop fed to the mesh is the face box grown by this factor.
const CROP_SCALE: f64 = 1.5;

/// Smallest crop side (pixels) worth running the mesh on.
const MIN_CROP_SIDE: f64 = 8.0;

/// A square region of the frame, in frame pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Crop {
    x: f64,
    y: f64,
    side: f64,
}

pub struct OnnxFaceMesh {
    session: Mutex<Session>,
    input_size: u32,
    channels_last: bool,
}

impl OnnxFaceMesh {
    pub fn new(model_path: &Path) -> Result<Self, BoxError> {
        let session = load_session(model_path)?;
        let (input_size, channels_last) =
            image_input_layout(&session).unwrap_or((DEFAULT_INPUT_SIZE, false));
        Ok(Self {
            session: Mutex::new(session),
            input_size,
            channels_last,
        })
    }

    /// Eye contours for the face in `face`, in frame pixels.
    ///
    /// `None` when the face is too close to the frame edge to crop.
    pub fn eyes(&self, frame: &Frame, face: &BoundingBox) -> Result<Option<EyePair>, BoxError> {
        let Some(crop) = square_crop(face, frame.width() as f64, frame.height() as f64) else {
            return Ok(None);
        };
        let input = ort::value::Tensor::from_array(crop_tensor(
            frame,
            &crop,
            self.input_size,
            self.channels_last,
        ))?;

        let mut session = self.session.lock().map_err(|_| "face mesh session poisoned")?;
        let outputs = session.run(ort::inputs![input])?;
        let (_, data) = outputs[0].try_extract_tensor::<f32>()?;

        eyes_from_mesh(data, &crop, self.input_size).map(Some)
    }
}

/// Square crop centred on `face`, grown by [`CROP_SCALE`] and clamped to the
/// frame.
fn square_crop(face: &BoundingBox, frame_w: f64, frame_h: f64) -> Option<Crop> {
    let (cx, cy) = face.center();
    let mut side = face.width.max(face.height) * CROP_SCALE;
    side = side.min(frame_w).min(frame_h);
    if side < MIN_CROP_SIDE {
        return None;
    }
    let x = (cx - side / 2.0).clamp(0.0, frame_w - side);
    let y = (cy - side / 2.0).clamp(0.0, frame_h - side);
    Some(Crop { x, y, side })
}

/// Bilinear resample of `crop` to `size x size`, scaled to [0, 1].
fn crop_tensor(frame: &Frame, crop: &Crop, size: u32, channels_last: bool) -> ndarray::Array4<f32> {
    let src = frame.as_ndarray();
    let (w, h) = (frame.width() as usize, frame.height() as usize);
    let s = size as usize;
    let step = crop.side / s as f64;

    let mut tensor = if channels_last {
        ndarray::Array4::<f32>::zeros((1, s, s, 3))
    } else {
        ndarray::Array4::<f32>::zeros((1, 3, s, s))
    };

    for ty in 0..s {
        let fy = (crop.y + (ty as f64 + 0.5) * step - 0.5).clamp(0.0, (h - 1) as f64);
        let y0 = fy.floor() as usize;
        let y1 = (y0 + 1).min(h - 1);
        let wy = fy - y0 as f64;
        for tx in 0..s {
            let fx = (crop.x + (tx as f64 + 0.5) * step - 0.5).clamp(0.0, (w - 1) as f64);
            let x0 = fx.floor() as usize;
            let x1 = (x0 + 1).min(w - 1);
            let wx = fx - x0 as f64;
            for c in 0..3 {
                let top = src[[y0, x0, c]] as f64 * (1.0 - wx) + src[[y0, x1, c]] as f64 * wx;
                let bottom = src[[y1, x0, c]] as f64 * (1.0 - wx) + src[[y1, x1, c]] as f64 * wx;
                let v = ((top * (1.0 - wy) + bottom * wy) / 255.0) as f32;
                if channels_last {
                    tensor[[0, ty, tx, c]] = v;
                } else {
                    tensor[[0, c, ty, tx]] = v;
                }
            }
        }
    }
    tensor
}

/// Picks the eye contours out of a flat `[468 x 3]` mesh output and maps
/// them into frame pixels.
///
/// Models differ in whether they emit crop-normalised coordinates or
/// input-pixel coordinates; values no larger than ~1 are taken as
/// normalised.
fn eyes_from_mesh(data: &[f32], crop: &Crop, input_size: u32) -> Result<EyePair, BoxError> {
    if data.len() < MESH_POINTS * 3 {
        return Err(format!(
            "face mesh output has {} values, expected at least {}",
            data.len(),
            MESH_POINTS * 3
        )
        .into());
    }

    let max_xy = data[..MESH_POINTS * 3]
        .chunks_exact(3)
        .flat_map(|p| [p[0].abs(), p[1].abs()])
        .fold(0.0f32, f32::max);
    let unit = if max_xy <= 1.5 { 1.0 } else { input_size as f64 };

    let point = |i: usize| {
        let nx = data[i * 3] as f64 / unit;
        let ny = data[i * 3 + 1] as f64 / unit;
        (crop.x + nx * crop.side, crop.y + ny * crop.side)
    };
    let contour = |indices: &[usize; 6]| EyeLandmarks::new(indices.map(&point));

    Ok(EyePair {
        left: contour(&LEFT_EYE_INDICES),
        right: contour(&RIGHT_EYE_INDICES),
    })
}
