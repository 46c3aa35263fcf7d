use std::collections::HashMap;
use std::time::Instant;

use crate::detection::domain::face_detection::FaceDetection;
use crate::liveness::domain::blink_detector::BlinkDiagnostic;
use crate::pipeline::analysis_state::AnalysisState;
use crate::pipeline::frame_stage::FrameObservation;
use crate::shared::frame::Frame;

/// Observer for everything an analysis run reports.
///
/// The use case never prints or writes files itself; callers pick the
/// sinks (stdout, JSON lines, debug images) by choosing loggers.
pub trait AnalysisLogger: Send {
    /// Frames handed to the blink detector so far; `total` is 0 when the
    /// container does not know its length.
    fn progress(&mut self, current: usize, total: usize);

    /// How long a named stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// A point-in-time measurement (e.g. per-frame EAR).
    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    fn state(&mut self, from: AnalysisState, to: AnalysisState) {
        self.info(&format!("State {from} -> {to}"));
    }

    fn observation(&mut self, _observation: &FrameObservation) {}

    fn blink_diagnostic(&mut self, _diagnostic: &BlinkDiagnostic) {}

    /// An enhanced frame picked by the diagnostic sampler, with the face
    /// found in it (coordinates relative to this frame).
    fn diagnostic_frame(&mut self, _frame: &Frame, _detection: Option<&FaceDetection>) {}

    /// End-of-run report. Default: no-op.
    fn summary(&self) {}
}

/// Discards every event.
pub struct NullAnalysisLogger;

impl AnalysisLogger for NullAnalysisLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
    fn state(&mut self, _from: AnalysisState, _to: AnalysisState) {}
}

/// Logs through the `log` facade and keeps per-stage timings and metric
/// series for an end-of-run summary.
///
/// Progress lines are throttled to one every `throttle_frames` frames.
pub struct StdoutAnalysisLogger {
    throttle_frames: usize,
    timings: HashMap<String, Vec<f64>>,
    metrics: HashMap<String, Vec<f64>>,
    start_time: Instant,
    frames_seen: usize,
    blinks: usize,
    messages: Vec<String>,
}

impl StdoutAnalysisLogger {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            start_time: Instant::now(),
            frames_seen: 0,
            blinks: 0,
            messages: Vec::new(),
        }
    }

    /// The formatted summary, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let frames = self.frames_seen;
        let mut lines = vec![format!(
            "Analysis summary ({frames} frames, {} blink(s), {:.1}s total):",
            self.blinks,
            elapsed_ms / 1000.0
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &self.timings[stage];
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = mean(durations);
            // Worker timings overlap, so the share can exceed 100%.
            let pct = if elapsed_ms > 0.0 {
                total_ms / elapsed_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!(
                "  {stage:12}: avg {avg_ms:6.1}ms  total {total_ms:7.0}ms  ({pct:4.1}%)"
            ));
        }

        let mut names: Vec<_> = self.metrics.keys().collect();
        names.sort();
        for name in names {
            let values = &self.metrics[name];
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            lines.push(format!(
                "  {name}: avg {:.3}  min {min:.3}  max {max:.3}  (n={})",
                mean(values),
                values.len()
            ));
        }

        if frames > 0 && elapsed_ms > 0.0 {
            let fps = frames as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    pub fn metrics_for(&self, name: &str) -> Option<&[f64]> {
        self.metrics.get(name).map(|v| v.as_slice())
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

impl Default for StdoutAnalysisLogger {
    fn default() -> Self {
        Self::new(30)
    }
}

impl AnalysisLogger for StdoutAnalysisLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.frames_seen = current;
        if current % self.throttle_frames != 0 && current != total {
            return;
        }
        if total > 0 {
            let pct = current as f64 / total as f64 * 100.0;
            log::info!("Analysing: {current}/{total} frames ({pct:.1}%)");
        } else {
            log::info!("Analysing: {current} frames");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.entry(name.to_string()).or_default().push(value);
    }

    fn info(&mut self, message: &str) {
        self.messages.push(message.to_string());
        log::info!("{message}");
    }

    fn state(&mut self, from: AnalysisState, to: AnalysisState) {
        log::debug!("State {from} -> {to}");
    }

    fn blink_diagnostic(&mut self, diagnostic: &BlinkDiagnostic) {
        if let Some(method) = diagnostic.emitted {
            self.blinks += 1;
            log::debug!(
                "Blink #{} at frame {} ({method:?}, EAR {:.3})",
                self.blinks,
                diagnostic.frame_index,
                diagnostic.combined_ear
            );
        }
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

/// Forwards every event to each inner logger, in order.
pub struct FanoutAnalysisLogger {
    loggers: Vec<Box<dyn AnalysisLogger>>,
}

impl FanoutAnalysisLogger {
    pub fn new(loggers: Vec<Box<dyn AnalysisLogger>>) -> Self {
        Self { loggers }
    }

    pub fn push(&mut self, logger: Box<dyn AnalysisLogger>) {
        self.loggers.push(logger);
    }
}

impl AnalysisLogger for FanoutAnalysisLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.loggers.iter_mut().for_each(|l| l.progress(current, total));
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.loggers.iter_mut().for_each(|l| l.timing(stage, duration_ms));
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.loggers.iter_mut().for_each(|l| l.metric(name, value));
    }

    fn info(&mut self, message: &str) {
        self.loggers.iter_mut().for_each(|l| l.info(message));
    }

    fn state(&mut self, from: AnalysisState, to: AnalysisState) {
        self.loggers.iter_mut().for_each(|l| l.state(from, to));
    }

    fn observation(&mut self, observation: &FrameObservation) {
        self.loggers.iter_mut().for_each(|l| l.observation(observation));
    }

    fn blink_diagnostic(&mut self, diagnostic: &BlinkDiagnostic) {
        self.loggers.iter_mut().for_each(|l| l.blink_diagnostic(diagnostic));
    }

    fn diagnostic_frame(&mut self, frame: &Frame, detection: Option<&FaceDetection>) {
        self.loggers
            .iter_mut()
            .for_each(|l| l.diagnostic_frame(frame, detection));
    }

    fn summary(&self) {
        self.loggers.iter().for_each(|l| l.summary());
    }
}
