//! Turns an ordered EAR series into blink events.
//!
//! The primary method is a closed-eye run: combined EAR below the closed
//! threshold for at least `min_closed_frames` consecutive samples, closed
//! out by the first sample back above it. Two auxiliary heuristics catch
//! partial closures (a relative drop against the running average, and a
//! sharp frame-to-frame fall) but only until the first blink of the clip
//! has been found, and each fires at most once. A closed run that starts
//! before the eye has reopened past the auxiliary ceilings belongs to the
//! closure the auxiliary event already counted.

use serde::{Deserialize, Serialize};

use crate::liveness::domain::ear_sample::EarSample;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlinkMethod {
    Threshold,
    RelativeDrop,
    Derivative,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BlinkEvent {
    pub start_frame: usize,
    pub end_frame: usize,
    pub method: BlinkMethod,
    /// 1-based, strictly increasing within a clip.
    pub sequence_number: usize,
}

/// What the detector saw and decided for one sample.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BlinkDiagnostic {
    pub frame_index: usize,
    pub combined_ear: f64,
    /// Mean of the samples before this one; `None` for the first sample.
    pub running_average: Option<f64>,
    pub previous_ear: Option<f64>,
    pub samples_seen: usize,
    /// Length of the closed-eye run after this sample (0 when open).
    pub closed_run: usize,
    pub emitted: Option<BlinkMethod>,
    /// A closed run ended here but belonged to the closure an auxiliary
    /// event already counted.
    pub continuation_suppressed: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlinkConfig {
    pub ear_closed_threshold: f64,
    pub min_closed_frames: usize,
    pub relative_drop_warmup: usize,
    pub relative_drop_ratio: f64,
    pub relative_drop_ceiling: f64,
    pub derivative_warmup: usize,
    pub derivative_min_drop: f64,
    pub derivative_ceiling: f64,
    pub derivative_ratio: f64,
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            ear_closed_threshold: 0.13,
            min_closed_frames: 2,
            relative_drop_warmup: 10,
            relative_drop_ratio: 0.7,
            relative_drop_ceiling: 0.18,
            derivative_warmup: 15,
            derivative_min_drop: 0.05,
            derivative_ceiling: 0.15,
            derivative_ratio: 0.7,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EyeState {
    Open,
    Closing { start: usize, end: usize, run: usize },
}

/// Per-clip detector state. Feed samples in frame order via [`update`].
///
/// [`update`]: BlinkDetector::update
#[derive(Debug)]
pub struct BlinkDetector {
    config: BlinkConfig,
    state: EyeState,
    samples_seen: usize,
    ear_sum: f64,
    previous_ear: Option<f64>,
    relative_drop_fired: bool,
    derivative_fired: bool,
    /// An auxiliary event fired and the eye has not reopened past the
    /// auxiliary ceilings since.
    auxiliary_closure: bool,
    events: Vec<BlinkEvent>,
}

impl BlinkDetector {
    pub fn new(config: BlinkConfig) -> Self {
        Self {
            config,
            state: EyeState::Open,
            samples_seen: 0,
            ear_sum: 0.0,
            previous_ear: None,
            relative_drop_fired: false,
            derivative_fired: false,
            auxiliary_closure: false,
            events: Vec::new(),
        }
    }

    pub fn into_events(self) -> Vec<BlinkEvent> {
        self.events
    }

    /// Consumes one sample. Returns the event it completed, if any.
    ///
    /// A run still closed when the clip ends never becomes an event.
    pub fn update(&mut self, sample: &EarSample) -> (Option<BlinkEvent>, BlinkDiagnostic) {
        let ear = sample.combined_ear;
        let frame = sample.frame_index;
        let running_average =
            (self.samples_seen > 0).then(|| self.ear_sum / self.samples_seen as f64);

        let mut emitted = None;
        let mut suppressed = false;

        if ear < self.config.ear_closed_threshold {
            self.state = match self.state {
                EyeState::Open => EyeState::Closing {
                    start: frame,
                    end: frame,
                    run: 1,
                },
                EyeState::Closing { start, run, .. } => EyeState::Closing {
                    start,
                    end: frame,
                    run: run + 1,
                },
            };
        } else {
            if let EyeState::Closing { start, end, run } = self.state {
                if run >= self.config.min_closed_frames {
                    if self.auxiliary_closure {
                        suppressed = true;
                    } else {
                        emitted = Some((start, end, BlinkMethod::Threshold));
                    }
                }
            }
            self.state = EyeState::Open;

            if emitted.is_none() && self.events.is_empty() {
                emitted = self
                    .auxiliary(ear, running_average)
                    .map(|method| (frame, frame, method));
            }
        }

        let event = emitted.map(|(start, end, method)| self.record(start, end, method));
        if ear >= self.auxiliary_ceiling() {
            self.auxiliary_closure = false;
        }

        self.samples_seen += 1;
        self.ear_sum += ear;
        let previous_ear = self.previous_ear.replace(ear);

        let diagnostic = BlinkDiagnostic {
            frame_index: frame,
            combined_ear: ear,
            running_average,
            previous_ear,
            samples_seen: self.samples_seen,
            closed_run: match self.state {
                EyeState::Open => 0,
                EyeState::Closing { run, .. } => run,
            },
            emitted: event.as_ref().map(|e| e.method),
            continuation_suppressed: suppressed,
        };
        (event, diagnostic)
    }

    /// Runs the auxiliary heuristics in priority order on an open-eye sample.
    fn auxiliary(&mut self, ear: f64, running_average: Option<f64>) -> Option<BlinkMethod> {
        let avg = running_average?;
        let cfg = &self.config;

        if !self.relative_drop_fired
            && self.samples_seen >= cfg.relative_drop_warmup
            && ear < cfg.relative_drop_ratio * avg
            && ear < cfg.relative_drop_ceiling
        {
            self.relative_drop_fired = true;
            return Some(BlinkMethod::RelativeDrop);
        }

        if !self.derivative_fired && self.samples_seen >= cfg.derivative_warmup {
            if let Some(prev) = self.previous_ear {
                if prev - ear > cfg.derivative_min_drop
                    && ear < cfg.derivative_ceiling
                    && ear < cfg.derivative_ratio * avg
                {
                    self.derivative_fired = true;
                    return Some(BlinkMethod::Derivative);
                }
            }
        }
        None
    }

    fn auxiliary_ceiling(&self) -> f64 {
        self.config
            .relative_drop_ceiling
            .max(self.config.derivative_ceiling)
    }

    fn record(&mut self, start: usize, end: usize, method: BlinkMethod) -> BlinkEvent {
        if method != BlinkMethod::Threshold {
            self.auxiliary_closure = true;
        }
        let event = BlinkEvent {
            start_frame: start,
            end_frame: end,
            method,
            sequence_number: self.events.len() + 1,
        };
        log::debug!(
            "Blink #{} ({:?}) frames {start}..={end}",
            event.sequence_number,
            method
        );
        self.events.push(event.clone());
        event
    }
}

impl Default for BlinkDetector {
    fn default() -> Self {
        Self::new(BlinkConfig::default())
    }
}
