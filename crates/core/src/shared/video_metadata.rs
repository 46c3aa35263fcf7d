use std::path::PathBuf;

use crate::shared::constants::DEFAULT_FPS;

#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Frame count reported by the container; 0 when unknown.
    pub total_frames: usize,
    pub codec: String,
    pub source_path: Option<PathBuf>,
    /// Display rotation tagged by the container (0, 90, 180 or 270).
    /// Frames are delivered as stored; the tag is informational.
    pub container_rotation: i32,
}

impl VideoMetadata {
    /// Container fps, or [`DEFAULT_FPS`] when the container reports none.
    pub fn effective_fps(&self) -> f64 {
        if self.fps.is_finite() && self.fps > 0.0 {
            self.fps
        } else {
            DEFAULT_FPS
        }
    }

    /// Clip duration in seconds for `frame_count` decoded frames.
    pub fn duration_secs(&self, frame_count: usize) -> f64 {
        frame_count as f64 / self.effective_fps()
    }
}
