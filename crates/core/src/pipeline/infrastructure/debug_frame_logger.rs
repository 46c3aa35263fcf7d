use std::path::PathBuf;

use crate::detection::domain::face_detection::FaceDetection;
use crate::pipeline::analysis_logger::AnalysisLogger;
use crate::pipeline::diagnostic_sampler::annotate;
use crate::shared::frame::Frame;
use crate::video::domain::image_writer::ImageWriter;

/// Longest side of a saved debug frame.
const MAX_SIDE: u32 = 640;

/// Saves sampled enhanced frames, annotated with the detected face, as
/// `frame_NNNNNN.png` under `dir`.
pub struct DebugFrameLogger {
    writer: Box<dyn ImageWriter>,
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl DebugFrameLogger {
    pub fn new(writer: Box<dyn ImageWriter>, dir: PathBuf) -> Self {
        Self {
            writer,
            dir,
            written: Vec::new(),
        }
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl AnalysisLogger for DebugFrameLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}

    fn diagnostic_frame(&mut self, frame: &Frame, detection: Option<&FaceDetection>) {
        let path = self.dir.join(format!("frame_{:06}.png", frame.index()));
        match self.writer.write(&path, &annotate(frame, detection), Some(MAX_SIDE)) {
            Ok(()) => self.written.push(path),
            Err(e) => log::warn!("Failed to save debug frame {}: {e}", path.display()),
        }
    }

    fn summary(&self) {
        if !self.written.is_empty() {
            log::info!(
                "Saved {} debug frame(s) to {}",
                self.written.len(),
                self.dir.display()
            );
        }
    }
}
