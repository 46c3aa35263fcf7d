use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::liveness::domain::blink_detector::BlinkDiagnostic;
use crate::pipeline::analysis_logger::AnalysisLogger;
use crate::pipeline::analysis_state::AnalysisState;
use crate::pipeline::frame_stage::FrameObservation;
use crate::shared::BoxError;

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Line<'a> {
    State { from: AnalysisState, to: AnalysisState },
    Frame(&'a FrameObservation),
    Blink(&'a BlinkDiagnostic),
    Info { message: &'a str },
}

/// Writes one JSON object per line: every blink-detector step, every
/// state transition and, optionally, every frame observation.
///
/// Write failures are logged once and further output is dropped; a broken
/// diagnostics file never fails the analysis.
pub struct JsonlDiagnosticLogger<W: Write + Send = BufWriter<File>> {
    out: W,
    include_frames: bool,
    failed: bool,
}

impl JsonlDiagnosticLogger {
    pub fn create(path: &Path, include_frames: bool) -> Result<Self, BoxError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)
            .map_err(|e| format!("failed to create diagnostics {}: {e}", path.display()))?;
        Ok(Self::from_writer(BufWriter::new(file), include_frames))
    }
}

impl<W: Write + Send> JsonlDiagnosticLogger<W> {
    pub fn from_writer(out: W, include_frames: bool) -> Self {
        Self {
            out,
            include_frames,
            failed: false,
        }
    }

    pub fn into_inner(mut self) -> W {
        let _ = self.out.flush();
        self.out
    }

    fn write_line(&mut self, line: &Line<'_>) {
        if self.failed {
            return;
        }
        let result = serde_json::to_writer(&mut self.out, line)
            .map_err(BoxError::from)
            .and_then(|_| self.out.write_all(b"\n").map_err(BoxError::from));
        if let Err(e) = result {
            log::warn!("Diagnostics output disabled after write error: {e}");
            self.failed = true;
        }
    }
}

impl<W: Write + Send> AnalysisLogger for JsonlDiagnosticLogger<W> {
    fn progress(&mut self, _current: usize, _total: usize) {}

    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}

    fn metric(&mut self, _name: &str, _value: f64) {}

    fn info(&mut self, message: &str) {
        self.write_line(&Line::Info { message });
    }

    fn state(&mut self, from: AnalysisState, to: AnalysisState) {
        self.write_line(&Line::State { from, to });
        if to.is_terminal() {
            if let Err(e) = self.out.flush() {
                log::warn!("Failed to flush diagnostics: {e}");
            }
        }
    }

    fn observation(&mut self, observation: &FrameObservation) {
        if self.include_frames {
            self.write_line(&Line::Frame(observation));
        }
    }

    fn blink_diagnostic(&mut self, diagnostic: &BlinkDiagnostic) {
        self.write_line(&Line::Blink(diagnostic));
    }
}
