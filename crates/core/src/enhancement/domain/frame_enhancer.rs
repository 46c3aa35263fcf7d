use serde::{Deserialize, Serialize};

use crate::shared::frame::Frame;

/// Normalizes a frame's contrast and brightness before landmark extraction.
///
/// Implementations are stateless per call and shared across worker threads.
pub trait FrameEnhancer: Send + Sync {
    fn enhance(&self, frame: &Frame) -> Frame;
}

/// Passes frames through unchanged.
pub struct IdentityEnhancer;

impl FrameEnhancer for IdentityEnhancer {
    fn enhance(&self, frame: &Frame) -> Frame {
        frame.clone()
    }
}

/// Tuning for the adaptive enhancer.
///
/// Frames are classified by mean luma into dark, mid and bright bands; each
/// band has its own contrast gain and brightness offset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancementConfig {
    pub enabled: bool,
    pub clahe_clip_limit: f64,
    pub clahe_grid: usize,
    /// Mean brightness below this is "dark".
    pub dark_threshold: f64,
    /// Mean brightness above this is "bright".
    pub bright_threshold: f64,
    pub dark_offset: f64,
    pub mid_offset: f64,
    pub bright_offset: f64,
    pub contrast_gain: f64,
    pub bright_contrast_gain: f64,
    /// Odd Gaussian kernel size; 1 disables the blur.
    pub blur_kernel: usize,
}

impl Default for EnhancementConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            clahe_clip_limit: 2.0,
            clahe_grid: 8,
            dark_threshold: 80.0,
            bright_threshold: 200.0,
            dark_offset: 30.0,
            mid_offset: 10.0,
            bright_offset: -10.0,
            contrast_gain: 1.2,
            bright_contrast_gain: 1.1,
            blur_kernel: 3,
        }
    }
}

impl EnhancementConfig {
    /// `(contrast_gain, brightness_offset)` for a frame of the given mean luma.
    pub fn adjustment_for(&self, mean_brightness: f64) -> (f64, f64) {
        if mean_brightness < self.dark_threshold {
            (self.contrast_gain, self.dark_offset)
        } else if mean_brightness > self.bright_threshold {
            (self.bright_contrast_gain, self.bright_offset)
        } else {
            (self.contrast_gain, self.mid_offset)
        }
    }
}
