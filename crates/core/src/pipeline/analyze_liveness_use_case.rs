use std::path::Path;
use std::sync::Arc;

use crate::detection::domain::landmark_provider::LandmarkProvider;
use crate::enhancement::domain::frame_enhancer::FrameEnhancer;
use crate::liveness::domain::blink_detector::BlinkDetector;
use crate::liveness::domain::distribution_analyzer::DistributionAnalyzer;
use crate::liveness::domain::ear_sample::EarSeries;
use crate::liveness::domain::liveness_config::LivenessConfig;
use crate::liveness::domain::liveness_result::{LivenessReport, LivenessResult};
use crate::liveness::domain::score_aggregator::{ScoreAggregator, ScoreInputs};
use crate::pipeline::analysis_logger::AnalysisLogger;
use crate::pipeline::analysis_state::AnalysisState;
use crate::pipeline::diagnostic_sampler::DiagnosticSampler;
use crate::pipeline::frame_processor::FrameProcessor;
use crate::pipeline::frame_stage::{FrameStage, ProcessedFrame};
use crate::pipeline::liveness_error::LivenessError;
use crate::video::domain::video_reader::VideoReader;

/// Per-clip counters gathered while frames stream past.
#[derive(Default)]
struct Coverage {
    processed: usize,
    accepted: usize,
    rotated: usize,
    failed: usize,
}

/// Decides whether a clip shows a live, blinking face.
///
/// The provider, enhancer and processor are shared, stateless handles;
/// everything that accumulates over a clip (EAR series, blink state,
/// counters) is created fresh inside [`analyze`](Self::analyze), so one use
/// case can analyse any number of clips.
pub struct AnalyzeLivenessUseCase {
    stage: FrameStage,
    processor: Box<dyn FrameProcessor>,
    config: LivenessConfig,
    state: AnalysisState,
}

impl AnalyzeLivenessUseCase {
    pub fn new(
        provider: Arc<dyn LandmarkProvider>,
        enhancer: Arc<dyn FrameEnhancer>,
        processor: Box<dyn FrameProcessor>,
        config: LivenessConfig,
    ) -> Self {
        Self {
            stage: FrameStage::new(enhancer, provider),
            processor,
            config,
            state: AnalysisState::Ingested,
        }
    }

    /// Last state reached by the most recent analysis.
    pub fn state(&self) -> AnalysisState {
        self.state
    }

    pub fn config(&self) -> &LivenessConfig {
        &self.config
    }

    /// Analyses the clip at `path` read through `reader`.
    ///
    /// Only an unreadable or empty clip is an error; poor face coverage
    /// yields a zero-score result.
    pub fn analyze(
        &mut self,
        reader: &mut dyn VideoReader,
        path: &Path,
        logger: &mut dyn AnalysisLogger,
    ) -> Result<LivenessReport, LivenessError> {
        self.state = AnalysisState::Ingested;
        let outcome = self.run(reader, path, logger);
        reader.close();
        match &outcome {
            Ok(report) => log::info!(
                "{}: score {:.3}, {} blink(s), coverage {:.1}%",
                path.display(),
                report.result.liveness_score,
                report.result.blink_count,
                report.result.face_detection_ratio * 100.0
            ),
            Err(e) => {
                log::warn!("Analysis failed: {e}");
                self.advance(AnalysisState::Failed, logger);
            }
        }
        logger.summary();
        outcome
    }

    fn advance(&mut self, to: AnalysisState, logger: &mut dyn AnalysisLogger) {
        debug_assert!(self.state.can_advance_to(to), "{} -> {to}", self.state);
        logger.state(self.state, to);
        self.state = to;
    }

    fn run(
        &mut self,
        reader: &mut dyn VideoReader,
        path: &Path,
        logger: &mut dyn AnalysisLogger,
    ) -> Result<LivenessReport, LivenessError> {
        let metadata = reader
            .open(path)
            .map_err(|e| LivenessError::decode(path, e))?;
        logger.info(&format!(
            "Analysing {}: {}x{} @ {:.2} fps, {} frame(s) reported",
            path.display(),
            metadata.width,
            metadata.height,
            metadata.fps,
            metadata.total_frames
        ));
        if metadata.container_rotation != 0 {
            log::debug!("Container rotation tag {}°", metadata.container_rotation);
        }
        self.advance(AnalysisState::FramesDecoded, logger);

        let sampler = DiagnosticSampler::new(
            self.config.pipeline.diagnostic_samples,
            metadata.total_frames,
        );
        let keep = move |index: usize| sampler.wants(index);
        let total = metadata.total_frames;

        let mut detector = BlinkDetector::new(self.config.blink.clone());
        let mut series = EarSeries::new();
        let mut coverage = Coverage::default();

        let mut sink = |processed: ProcessedFrame| {
            let obs = &processed.observation;
            coverage.processed += 1;
            coverage.failed += usize::from(obs.extraction_failed);
            coverage.rotated += usize::from(obs.rotation.is_corrected());

            logger.timing("frame_stage", obs.stage_ms);
            logger.observation(obs);
            if let Some(frame) = &processed.enhanced {
                logger.diagnostic_frame(frame, obs.detection.as_ref());
            }
            if let Some(sample) = obs.sample {
                coverage.accepted += 1;
                logger.metric("ear", sample.combined_ear);
                let (_, diagnostic) = detector.update(&sample);
                logger.blink_diagnostic(&diagnostic);
                series.push(sample);
            }
            logger.progress(coverage.processed, total);
        };

        let decoded = self
            .processor
            .process(reader, &self.stage, &keep, &mut sink)
            .map_err(|e| LivenessError::decode(path, e))?;
        if decoded == 0 {
            return Err(LivenessError::decode(path, "no frames could be decoded"));
        }
        self.advance(AnalysisState::PerFrameProcessed, logger);

        let fps = metadata.effective_fps();
        let ratio = coverage.accepted as f64 / decoded as f64;
        if coverage.failed > 0 {
            logger.info(&format!(
                "{} frame(s) skipped after landmark failures",
                coverage.failed
            ));
        }

        if coverage.accepted < self.config.pipeline.min_face_frames {
            logger.info(&format!(
                "Only {} of {decoded} frame(s) had a usable face (need {}); scoring 0",
                coverage.accepted, self.config.pipeline.min_face_frames
            ));
            self.advance(AnalysisState::Aggregated, logger);
            self.advance(AnalysisState::Done, logger);
            return Ok(LivenessReport {
                result: LivenessResult::insufficient_coverage(),
                events: Vec::new(),
                distribution: None,
                scores: None,
                decoded_frames: decoded,
                failed_frames: coverage.failed,
                fps,
            });
        }

        let mut events = detector.into_events();
        let distribution = DistributionAnalyzer::new(self.config.distribution.clone())
            .analyze(&series.combined(), events.len());
        let blink_count = distribution.adjusted_count;
        events.truncate(blink_count);

        let average_ear = series.mean();
        let duration = metadata.duration_secs(decoded);
        let blink_rate = if duration > 0.0 {
            blink_count as f64 / duration
        } else {
            0.0
        };

        let scores = ScoreAggregator::new(self.config.scoring.clone()).score(&ScoreInputs {
            blink_count,
            average_ear,
            blink_rate,
            face_detection_ratio: ratio,
        });
        self.advance(AnalysisState::Aggregated, logger);

        let result = LivenessResult {
            liveness_score: scores.liveness_score,
            blink_count,
            average_ear,
            blink_rate,
            face_detected_frames: coverage.accepted,
            face_detection_ratio: ratio,
            rotated_frame_count: coverage.rotated,
        };
        self.advance(AnalysisState::Done, logger);

        Ok(LivenessReport {
            result,
            events,
            distribution: Some(distribution),
            scores: Some(scores),
            decoded_frames: decoded,
            failed_frames: coverage.failed,
            fps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::face_detection::FaceDetection;
    use crate::enhancement::domain::frame_enhancer::IdentityEnhancer;
    use crate::pipeline::analysis_logger::NullAnalysisLogger;
    use crate::pipeline::frame_processor::test_support::StubReader;
    use crate::pipeline::frame_processor::SequentialFrameProcessor;
    use crate::pipeline::frame_stage::test_support::{face, ScriptedProvider};
    use crate::pipeline::infrastructure::threaded_frame_processor::ThreadedFrameProcessor;
    use crate::liveness::domain::blink_detector::{BlinkDiagnostic, BlinkMethod};
    use crate::shared::BoxError;
    use approx::assert_relative_eq;

    fn use_case<F>(script: F, processor: Box<dyn FrameProcessor>) -> AnalyzeLivenessUseCase
    where
        F: Fn(usize) -> Result<Vec<FaceDetection>, BoxError> + Send + Sync + 'static,
    {
        AnalyzeLivenessUseCase::new(
            Arc::new(ScriptedProvider(script)),
            Arc::new(IdentityEnhancer),
            processor,
            LivenessConfig::default(),
        )
    }

    /// Open eyes everywhere except closed runs covering `closed` frames.
    fn blinking(closed: &'static [usize]) -> impl Fn(usize) -> Result<Vec<FaceDetection>, BoxError> {
        move |i| {
            let ear = if closed.contains(&i) { 0.08 } else { 0.3 };
            Ok(vec![face(40.0, Some(ear))])
        }
    }

    fn analyze(uc: &mut AnalyzeLivenessUseCase, reader: &mut StubReader) -> Result<LivenessReport, LivenessError> {
        uc.analyze(reader, Path::new("/clips/selfie.mp4"), &mut NullAnalysisLogger)
    }

    #[test]
    fn test_sparse_faces_score_zero_without_error() {
        let mut uc = use_case(
            |i| Ok(if i < 9 { vec![face(40.0, Some(0.3))] } else { Vec::new() }),
            Box::new(SequentialFrameProcessor),
        );
        let mut reader = StubReader::new(500);
        let report = analyze(&mut uc, &mut reader).unwrap();

        assert_eq!(report.result.liveness_score, 0.0);
        assert_eq!(report.result.blink_count, 0);
        assert_eq!(report.result.face_detected_frames, 0);
        assert_eq!(report.decoded_frames, 500);
        assert!(report.scores.is_none());
        assert_eq!(uc.state(), AnalysisState::Done);
        assert!(reader.closed);
    }

    #[test]
    fn test_single_blink_scores_at_least_point_nine() {
        let mut uc = use_case(blinking(&[10, 11]), Box::new(SequentialFrameProcessor));
        let mut reader = StubReader::new(30);
        let report = analyze(&mut uc, &mut reader).unwrap();

        assert_eq!(report.result.blink_count, 1);
        assert!(report.result.liveness_score >= 0.9);
        assert_eq!(report.events.len(), 1);
        assert_eq!(report.events[0].start_frame, 10);
        assert_eq!(report.result.face_detected_frames, 30);
        assert_relative_eq!(report.result.face_detection_ratio, 1.0);
        // 1 blink over 1 s
        assert_relative_eq!(report.result.blink_rate, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_partial_closure_survives_distribution_check() {
        let mut uc = use_case(
            |i| Ok(vec![face(40.0, Some(if i == 12 { 0.16 } else { 0.3 }))]),
            Box::new(SequentialFrameProcessor),
        );
        let report = analyze(&mut uc, &mut StubReader::new(30)).unwrap();

        assert!(report.distribution.unwrap().ratio < 0.85);
        assert_eq!(report.result.blink_count, 1);
        assert_eq!(report.events[0].method, BlinkMethod::RelativeDrop);
    }

    #[test]
    fn test_shallow_dip_in_long_clip_is_vetoed() {
        let mut uc = use_case(blinking(&[40, 41]), Box::new(SequentialFrameProcessor));
        let report = analyze(&mut uc, &mut StubReader::new(150)).unwrap();

        let distribution = report.distribution.unwrap();
        assert_eq!(distribution.original_count, 1);
        assert_eq!(report.result.blink_count, 0);
        assert!(report.events.is_empty());
        // full coverage still lifts the score
        assert_relative_eq!(report.result.liveness_score, 0.85);
    }

    #[test]
    fn test_three_blinks_are_accepted_by_default_policy() {
        let mut uc = use_case(
            blinking(&[20, 21, 60, 61, 100, 101]),
            Box::new(ThreadedFrameProcessor::new(3, 4)),
        );
        let mut reader = StubReader::new(150);
        let report = analyze(&mut uc, &mut reader).unwrap();

        assert_eq!(report.result.blink_count, 3);
        assert!(uc.config().acceptance.evaluate(&report.result).accepted);
    }

    #[test]
    fn test_no_blinks_rely_on_coverage_floor() {
        let mut uc = use_case(blinking(&[]), Box::new(SequentialFrameProcessor));
        let mut reader = StubReader::new(90);
        let report = analyze(&mut uc, &mut reader).unwrap();

        assert_eq!(report.result.blink_count, 0);
        assert_relative_eq!(report.result.average_ear, 0.3, epsilon = 1e-9);
        assert_relative_eq!(report.result.liveness_score, 0.85);
        assert!(!uc.config().acceptance.evaluate(&report.result).accepted);
    }

    #[test]
    fn test_provider_failures_count_as_undetected() {
        let mut uc = use_case(
            |i| {
                if i % 2 == 0 {
                    Err("inference failed".into())
                } else {
                    Ok(vec![face(40.0, Some(0.3))])
                }
            },
            Box::new(SequentialFrameProcessor),
        );
        let mut reader = StubReader::new(40);
        let report = analyze(&mut uc, &mut reader).unwrap();

        assert_eq!(report.failed_frames, 20);
        assert_eq!(report.result.face_detected_frames, 20);
        assert_relative_eq!(report.result.face_detection_ratio, 0.5);
    }

    #[test]
    fn test_open_failure_is_decode_error() {
        let mut uc = use_case(blinking(&[]), Box::new(SequentialFrameProcessor));
        let mut reader = StubReader::new(10);
        reader.fail_open = true;

        let err = analyze(&mut uc, &mut reader).unwrap_err();
        assert!(matches!(err, LivenessError::Decode { .. }));
        assert_eq!(uc.state(), AnalysisState::Failed);
    }

    #[test]
    fn test_mid_stream_decode_error_yields_no_result() {
        let mut uc = use_case(blinking(&[]), Box::new(SequentialFrameProcessor));
        let mut reader = StubReader::new(100);
        reader.fail_at = Some(50);

        let err = analyze(&mut uc, &mut reader).unwrap_err();
        assert!(err.to_string().contains("corrupt packet"));
        assert_eq!(uc.state(), AnalysisState::Failed);
        assert!(reader.closed);
    }

    #[test]
    fn test_empty_clip_is_decode_error() {
        let mut uc = use_case(blinking(&[]), Box::new(SequentialFrameProcessor));
        let mut reader = StubReader::new(0);
        assert!(matches!(
            analyze(&mut uc, &mut reader),
            Err(LivenessError::Decode { .. })
        ));
    }

    #[test]
    fn test_use_case_is_reusable_across_clips() {
        let mut uc = use_case(blinking(&[10, 11]), Box::new(SequentialFrameProcessor));
        let first = analyze(&mut uc, &mut StubReader::new(30)).unwrap();
        let second = analyze(&mut uc, &mut StubReader::new(30)).unwrap();
        assert_eq!(first.result, second.result);
    }

    /// Records state transitions and blink diagnostics.
    #[derive(Default)]
    struct Recorder {
        states: Vec<AnalysisState>,
        samples: usize,
        blinks: usize,
    }

    impl AnalysisLogger for Recorder {
        fn progress(&mut self, _current: usize, _total: usize) {}
        fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
        fn metric(&mut self, _name: &str, _value: f64) {}
        fn info(&mut self, _message: &str) {}
        fn state(&mut self, _from: AnalysisState, to: AnalysisState) {
            self.states.push(to);
        }
        fn blink_diagnostic(&mut self, diagnostic: &BlinkDiagnostic) {
            self.samples += 1;
            self.blinks += usize::from(diagnostic.emitted.is_some());
        }
    }

    #[test]
    fn test_logger_sees_states_and_diagnostics() {
        let mut uc = use_case(blinking(&[10, 11]), Box::new(SequentialFrameProcessor));
        let mut recorder = Recorder::default();

        uc.analyze(&mut StubReader::new(30), Path::new("/clips/a.mp4"), &mut recorder)
            .unwrap();

        assert_eq!(
            recorder.states,
            vec![
                AnalysisState::FramesDecoded,
                AnalysisState::PerFrameProcessed,
                AnalysisState::Aggregated,
                AnalysisState::Done,
            ]
        );
        assert_eq!(recorder.samples, 30);
        assert_eq!(recorder.blinks, 1);
    }

    #[test]
    fn test_failure_is_reported_to_logger() {
        let mut uc = use_case(blinking(&[]), Box::new(SequentialFrameProcessor));
        let mut recorder = Recorder::default();
        let mut reader = StubReader::new(30);
        reader.fail_at = Some(3);

        assert!(uc.analyze(&mut reader, Path::new("/clips/a.mp4"), &mut recorder).is_err());
        assert_eq!(
            recorder.states,
            vec![AnalysisState::FramesDecoded, AnalysisState::Failed]
        );
    }
}
