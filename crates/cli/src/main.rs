use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::Parser;

use blinkcheck_core::detection::domain::landmark_provider::LandmarkProvider;
use blinkcheck_core::detection::infrastructure::cached_landmark_provider::CachedLandmarkProvider;
use blinkcheck_core::detection::infrastructure::model_resolver::{self, ModelSource};
use blinkcheck_core::detection::infrastructure::onnx_landmark_provider::{
    OnnxLandmarkProvider, DEFAULT_MAX_FACES,
};
use blinkcheck_core::enhancement::infrastructure::adaptive_frame_enhancer::AdaptiveFrameEnhancer;
use blinkcheck_core::liveness::domain::liveness_config::LivenessConfig;
use blinkcheck_core::pipeline::analysis_logger::{FanoutAnalysisLogger, StdoutAnalysisLogger};
use blinkcheck_core::pipeline::analyze_liveness_use_case::AnalyzeLivenessUseCase;
use blinkcheck_core::pipeline::frame_processor::{FrameProcessor, SequentialFrameProcessor};
use blinkcheck_core::pipeline::infrastructure::debug_frame_logger::DebugFrameLogger;
use blinkcheck_core::pipeline::infrastructure::jsonl_diagnostic_logger::JsonlDiagnosticLogger;
use blinkcheck_core::pipeline::infrastructure::threaded_frame_processor::ThreadedFrameProcessor;
use blinkcheck_core::pipeline::liveness_error::LivenessError;
use blinkcheck_core::shared::constants::{
    FACE_DETECTOR_MODEL_NAME, FACE_MESH_MODEL_NAME, MAX_VIDEO_FILE_SIZE, VIDEO_EXTENSIONS,
};
use blinkcheck_core::video::domain::video_reader::VideoReader;
use blinkcheck_core::video::infrastructure::ffmpeg_reader::FfmpegReader;
use blinkcheck_core::video::infrastructure::image_file_writer::ImageFileWriter;
use blinkcheck_core::video::infrastructure::image_sequence_reader::ImageSequenceReader;

const EXIT_REJECTED: i32 = 2;

/// Blink-based liveness check for short face videos.
#[derive(Parser)]
#[command(name = "blinkcheck")]
struct Cli {
    /// Input video (mp4, mov, webm) or a directory of frames.
    input: PathBuf,

    /// JSON config file (defaults to the user config file if present).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Frame rate assumed for a directory of frames.
    #[arg(long)]
    frames_dir_fps: Option<f64>,

    /// Face detector ONNX model.
    #[arg(long)]
    detector_model: Option<PathBuf>,

    /// Face mesh ONNX model.
    #[arg(long)]
    mesh_model: Option<PathBuf>,

    /// Base URL to download missing models from.
    #[arg(long)]
    model_url_base: Option<String>,

    /// Replay detections from a JSON file instead of running the models.
    #[arg(long, conflicts_with_all = ["detector_model", "mesh_model"])]
    replay_landmarks: Option<PathBuf>,

    /// Faces refined with the face mesh per frame, largest first.
    #[arg(long, default_value_t = DEFAULT_MAX_FACES)]
    max_faces: usize,

    /// Frame worker threads (1 runs everything on the calling thread).
    #[arg(long)]
    workers: Option<usize>,

    /// Accept only scores strictly above this (0.0-1.0).
    #[arg(long)]
    min_liveness_score: Option<f64>,

    /// Accept only clips with at least this many blinks.
    #[arg(long)]
    min_blink_count: Option<usize>,

    /// Write per-sample blink diagnostics as JSON lines.
    #[arg(long)]
    diagnostics: Option<PathBuf>,

    /// Also write one JSON line per frame to the diagnostics file.
    #[arg(long, requires = "diagnostics")]
    diagnostics_frames: bool,

    /// Save a few annotated enhanced frames to this directory.
    #[arg(long)]
    debug_frames: Option<PathBuf>,

    /// Pretty-print the JSON output.
    #[arg(long)]
    pretty: bool,

    /// No progress or summary on stderr.
    #[arg(long, short)]
    quiet: bool,
}

fn main() {
    env_logger::init();

    match run() {
        Ok(true) => {}
        Ok(false) => process::exit(EXIT_REJECTED),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

/// Returns whether the clip was accepted.
fn run() -> Result<bool, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate_input(&cli.input)?;
    let config = load_config(&cli)?;

    let provider = build_provider(&cli)?;
    let enhancer = Arc::new(AdaptiveFrameEnhancer::new(config.enhancement.clone()));
    let processor = build_processor(&config);
    let mut logger = build_logger(&cli)?;

    let mut reader: Box<dyn VideoReader> = if cli.input.is_dir() {
        Box::new(ImageSequenceReader::new(config.pipeline.frames_dir_fps))
    } else {
        Box::new(FfmpegReader::new())
    };

    let policy = config.acceptance.clone();
    let mut use_case = AnalyzeLivenessUseCase::new(provider, enhancer, processor, config);
    let report = use_case.analyze(reader.as_mut(), &cli.input, &mut logger)?;
    let verdict = policy.evaluate(&report.result);

    let output = serde_json::json!({
        "result": report.result,
        "verdict": verdict,
    });
    let text = if cli.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{text}");

    for reason in &verdict.reasons {
        log::info!("Rejected: {reason}");
    }
    Ok(verdict.accepted)
}

fn load_config(cli: &Cli) -> Result<LivenessConfig, LivenessError> {
    let mut config = match &cli.config {
        Some(path) => LivenessConfig::load_from_file(path)?,
        None => LivenessConfig::load_or_default()?,
    };

    if let Some(fps) = cli.frames_dir_fps {
        config.pipeline.frames_dir_fps = fps;
    }
    if let Some(workers) = cli.workers {
        config.pipeline.workers = Some(workers);
    }
    if let Some(score) = cli.min_liveness_score {
        config.acceptance.min_liveness_score = score;
    }
    if let Some(count) = cli.min_blink_count {
        config.acceptance.min_blink_count = count;
    }
    if cli.debug_frames.is_none() {
        config.pipeline.diagnostic_samples = 0;
    }
    config.validate()?;
    Ok(config)
}

fn build_provider(cli: &Cli) -> Result<Arc<dyn LandmarkProvider>, LivenessError> {
    if let Some(path) = &cli.replay_landmarks {
        let cached = CachedLandmarkProvider::load(path).map_err(LivenessError::Model)?;
        log::info!(
            "Replaying detections for {} frame(s) from {}",
            cached.len(),
            path.display()
        );
        return Ok(Arc::new(cached));
    }

    let bundled = bundled_models_dir();
    let detector = resolve_model(
        FACE_DETECTOR_MODEL_NAME,
        cli.detector_model.as_deref(),
        bundled.as_deref(),
        cli.model_url_base.as_deref(),
    )?;
    let mesh = resolve_model(
        FACE_MESH_MODEL_NAME,
        cli.mesh_model.as_deref(),
        bundled.as_deref(),
        cli.model_url_base.as_deref(),
    )?;

    let provider = OnnxLandmarkProvider::new(&detector, &mesh)
        .map_err(LivenessError::Model)?
        .with_max_faces(cli.max_faces);
    Ok(Arc::new(provider))
}

fn resolve_model(
    name: &str,
    path: Option<&Path>,
    bundled_dir: Option<&Path>,
    url_base: Option<&str>,
) -> Result<PathBuf, LivenessError> {
    log::info!("Resolving model: {name}");
    let source = ModelSource {
        path,
        bundled_dir,
        url_base,
    };
    let resolved = model_resolver::resolve(name, &source, Some(Box::new(download_progress)))?;
    log::debug!("{name} -> {}", resolved.display());
    Ok(resolved)
}

/// `models/` next to the executable.
fn bundled_models_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("models")))
}

fn build_processor(config: &LivenessConfig) -> Box<dyn FrameProcessor> {
    let workers = config
        .pipeline
        .workers
        .unwrap_or_else(ThreadedFrameProcessor::default_workers);
    if workers <= 1 {
        Box::new(SequentialFrameProcessor)
    } else {
        log::debug!("Using {workers} frame workers");
        Box::new(ThreadedFrameProcessor::new(
            workers,
            config.pipeline.channel_capacity,
        ))
    }
}

fn build_logger(cli: &Cli) -> Result<FanoutAnalysisLogger, Box<dyn std::error::Error>> {
    let mut logger = FanoutAnalysisLogger::new(Vec::new());
    if !cli.quiet {
        logger.push(Box::new(StdoutAnalysisLogger::default()));
    }
    if let Some(path) = &cli.diagnostics {
        logger.push(Box::new(JsonlDiagnosticLogger::create(
            path,
            cli.diagnostics_frames,
        )?));
    }
    if let Some(dir) = &cli.debug_frames {
        fs::create_dir_all(dir)?;
        logger.push(Box::new(DebugFrameLogger::new(
            Box::new(ImageFileWriter::new()),
            dir.clone(),
        )));
    }
    Ok(logger)
}

fn validate_input(input: &Path) -> Result<(), String> {
    if !input.exists() {
        return Err(format!("Input not found: {}", input.display()));
    }
    if input.is_dir() {
        return Ok(());
    }

    let extension = input
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    if !VIDEO_EXTENSIONS.contains(&extension.as_str()) {
        return Err(format!(
            "Unsupported input {}: expected one of {} or a directory of frames",
            input.display(),
            VIDEO_EXTENSIONS.join(", ")
        ));
    }

    let size = fs::metadata(input)
        .map_err(|e| format!("Cannot stat {}: {e}", input.display()))?
        .len();
    if size > MAX_VIDEO_FILE_SIZE {
        return Err(format!(
            "Input is {size} bytes; the limit is {MAX_VIDEO_FILE_SIZE} bytes"
        ));
    }
    Ok(())
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading model... {pct}%");
    } else {
        eprint!("\rDownloading model... {downloaded} bytes");
    }
    if total > 0 && downloaded >= total {
        eprintln!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_accepts_supported_extensions_case_insensitively() {
        let tmp = TempDir::new().unwrap();
        for name in ["a.mp4", "b.MOV", "c.webm"] {
            let path = tmp.path().join(name);
            fs::write(&path, b"clip").unwrap();
            validate_input(&path).unwrap();
        }
    }

    #[test]
    fn test_accepts_frame_directory() {
        let tmp = TempDir::new().unwrap();
        validate_input(tmp.path()).unwrap();
    }

    #[test]
    fn test_rejects_other_extensions() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("clip.avi");
        fs::write(&path, b"clip").unwrap();
        let err = validate_input(&path).unwrap_err();
        assert!(err.contains("Unsupported input"));
    }

    #[test]
    fn test_rejects_missing_input() {
        assert!(validate_input(Path::new("/nonexistent/clip.mp4")).is_err());
    }

    #[test]
    fn test_rejects_oversized_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("big.mp4");
        let file = fs::File::create(&path).unwrap();
        file.set_len(MAX_VIDEO_FILE_SIZE + 1).unwrap();
        let err = validate_input(&path).unwrap_err();
        assert!(err.contains("limit"));
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "blinkcheck",
            "clip.mp4",
            "--workers",
            "2",
            "--min-blink-count",
            "1",
            "--min-liveness-score",
            "0.5",
        ]);
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        fs::write(&path, r#"{"acceptance": {"min_blink_count": 4}}"#).unwrap();
        let cli = Cli {
            config: Some(path),
            ..cli
        };

        let config = load_config(&cli).unwrap();
        assert_eq!(config.pipeline.workers, Some(2));
        assert_eq!(config.acceptance.min_blink_count, 1);
        assert_eq!(config.acceptance.min_liveness_score, 0.5);
        assert_eq!(config.pipeline.diagnostic_samples, 0);
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        fs::write(&path, "{}").unwrap();
        let cli = Cli::parse_from([
            "blinkcheck",
            "clip.mp4",
            "--config",
            path.to_str().unwrap(),
            "--min-liveness-score",
            "1.5",
        ]);
        assert!(matches!(load_config(&cli), Err(LivenessError::Config(_))));
    }

    #[test]
    fn test_replay_conflicts_with_model_paths() {
        let parsed = Cli::try_parse_from([
            "blinkcheck",
            "clip.mp4",
            "--replay-landmarks",
            "faces.json",
            "--detector-model",
            "face.onnx",
        ]);
        assert!(parsed.is_err());
    }
}
