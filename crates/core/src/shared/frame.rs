use ndarray::ArrayView3;

use crate::shared::rotation::Rotation;

/// ITU-R BT.601 luma weights for R, G, B.
const LUMA_WEIGHTS: [f64; 3] = [0.299, 0.587, 0.114];

/// A single video frame: contiguous RGB bytes in row-major order.
///
/// Format conversion happens at I/O boundaries only; the domain layer
/// treats pixel data as opaque.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Seconds since the start of the clip. Zero when `fps` is unknown.
    pub fn timestamp(&self, fps: f64) -> f64 {
        if fps > 0.0 {
            self.index as f64 / fps
        } else {
            0.0
        }
    }

    pub fn is_landscape(&self) -> bool {
        self.width > self.height
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Per-pixel luma plane (row-major, one byte per pixel).
    ///
    /// Single-channel frames are returned as-is.
    pub fn luma(&self) -> Vec<u8> {
        let channels = self.channels as usize;
        if channels < 3 {
            return self.data.iter().step_by(channels.max(1)).copied().collect();
        }
        self.data
            .chunks_exact(channels)
            .map(|px| luma_of(px[0], px[1], px[2]))
            .collect()
    }

    /// Mean grayscale brightness in `[0, 255]`. Zero for an empty frame.
    pub fn mean_brightness(&self) -> f64 {
        let luma = self.luma();
        if luma.is_empty() {
            return 0.0;
        }
        luma.iter().map(|&v| v as f64).sum::<f64>() / luma.len() as f64
    }

    /// Returns a copy of this frame turned by `rotation`, keeping the index.
    pub fn rotated(&self, rotation: Rotation) -> Frame {
        let w = self.width as usize;
        let h = self.height as usize;
        let c = self.channels as usize;

        let (new_w, new_h) = match rotation {
            Rotation::None => return self.clone(),
            Rotation::Clockwise90 | Rotation::CounterClockwise90 => (h, w),
        };

        let mut out = vec![0u8; self.data.len()];
        for y in 0..h {
            for x in 0..w {
                let (nx, ny) = match rotation {
                    Rotation::Clockwise90 => (h - 1 - y, x),
                    Rotation::CounterClockwise90 => (y, w - 1 - x),
                    Rotation::None => (x, y),
                };
                let src = (y * w + x) * c;
                let dst = (ny * new_w + nx) * c;
                out[dst..dst + c].copy_from_slice(&self.data[src..src + c]);
            }
        }

        Frame::new(out, new_w as u32, new_h as u32, self.channels, self.index)
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}

/// BT.601 luma of one RGB pixel, rounded to the nearest byte.
pub fn luma_of(r: u8, g: u8, b: u8) -> u8 {
    let y = LUMA_WEIGHTS[0] * r as f64 + LUMA_WEIGHTS[1] * g as f64 + LUMA_WEIGHTS[2] * b as f64;
    y.round().clamp(0.0, 255.0) as u8
}
