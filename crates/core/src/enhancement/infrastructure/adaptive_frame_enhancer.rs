use crate::enhancement::domain::frame_enhancer::{EnhancementConfig, FrameEnhancer};
use crate::enhancement::infrastructure::clahe;
use crate::enhancement::infrastructure::gaussian::{gaussian_kernel_1d, separable_blur};
use crate::shared::frame::Frame;

/// CPU enhancer: local contrast equalization on luma, a brightness-banded
/// gain/offset, then a light Gaussian blur.
///
/// The luma change is added equally to R, G and B so hue is left alone.
/// Gain is applied around the frame's own mean so it stretches contrast
/// without shifting exposure; the offset does the shifting.
pub struct AdaptiveFrameEnhancer {
    config: EnhancementConfig,
    kernel: Vec<f32>,
}

impl AdaptiveFrameEnhancer {
    pub fn new(config: EnhancementConfig) -> Self {
        let size = config.blur_kernel.max(1) | 1;
        Self {
            kernel: gaussian_kernel_1d(size),
            config,
        }
    }
}

impl Default for AdaptiveFrameEnhancer {
    fn default() -> Self {
        Self::new(EnhancementConfig::default())
    }
}

impl FrameEnhancer for AdaptiveFrameEnhancer {
    fn enhance(&self, frame: &Frame) -> Frame {
        if !self.config.enabled {
            return frame.clone();
        }
        let width = frame.width() as usize;
        let height = frame.height() as usize;
        let channels = frame.channels() as usize;

        let luma = frame.luma();
        if luma.is_empty() {
            return frame.clone();
        }
        let mean = luma.iter().map(|&v| v as f64).sum::<f64>() / luma.len() as f64;
        let (gain, offset) = self.config.adjustment_for(mean);
        let equalized = clahe::equalize(
            &luma,
            width,
            height,
            self.config.clahe_clip_limit,
            self.config.clahe_grid,
        );

        let mut out = frame.clone();
        let colour = channels.min(3);
        for ((px, &before), &eq) in out
            .data_mut()
            .chunks_exact_mut(channels)
            .zip(&luma)
            .zip(&equalized)
        {
            let target = ((eq as f64 - mean) * gain + mean + offset).clamp(0.0, 255.0);
            let delta = target - before as f64;
            for v in &mut px[..colour] {
                *v = (*v as f64 + delta).round().clamp(0.0, 255.0) as u8;
            }
        }

        let mut temp = Vec::new();
        separable_blur(out.data_mut(), width, height, channels, &self.kernel, &mut temp);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform(rgb: [u8; 3], w: u32, h: u32) -> Frame {
        let data = rgb.iter().copied().cycle().take((w * h * 3) as usize).collect();
        Frame::new(data, w, h, 3, 4)
    }

    #[test]
    fn test_dark_frame_is_brightened() {
        let frame = uniform([40, 40, 40], 64, 64);
        let out = AdaptiveFrameEnhancer::default().enhance(&frame);
        assert!(out.mean_brightness() > frame.mean_brightness() + 20.0);
    }

    #[test]
    fn test_bright_frame_is_dimmed() {
        let frame = uniform([230, 230, 230], 64, 64);
        let out = AdaptiveFrameEnhancer::default().enhance(&frame);
        assert!(out.mean_brightness() < frame.mean_brightness());
    }

    #[test]
    fn test_mid_frame_gets_small_lift() {
        let frame = uniform([128, 128, 128], 64, 64);
        let out = AdaptiveFrameEnhancer::default().enhance(&frame);
        let lift = out.mean_brightness() - frame.mean_brightness();
        assert!(lift > 0.0 && lift < 30.0, "lift was {lift}");
    }

    #[test]
    fn test_chroma_is_preserved() {
        let frame = uniform([100, 60, 40], 16, 16);
        let out = AdaptiveFrameEnhancer::default().enhance(&frame);
        let px = &out.data()[..3];
        assert_eq!(px[0] as i32 - px[1] as i32, 40);
        assert_eq!(px[1] as i32 - px[2] as i32, 20);
    }

    #[test]
    fn test_shape_and_index_preserved() {
        let frame = uniform([90, 90, 90], 20, 12);
        let out = AdaptiveFrameEnhancer::default().enhance(&frame);
        assert_eq!((out.width(), out.height(), out.channels()), (20, 12, 3));
        assert_eq!(out.index(), 4);
    }

    #[test]
    fn test_disabled_is_identity() {
        let frame = uniform([10, 20, 30], 8, 8);
        let enhancer = AdaptiveFrameEnhancer::new(EnhancementConfig {
            enabled: false,
            ..Default::default()
        });
        assert_eq!(enhancer.enhance(&frame).data(), frame.data());
    }
}
