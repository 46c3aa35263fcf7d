use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::enhancement::domain::frame_enhancer::EnhancementConfig;
use crate::liveness::domain::acceptance_policy::AcceptancePolicy;
use crate::liveness::domain::blink_detector::BlinkConfig;
use crate::liveness::domain::distribution_analyzer::DistributionConfig;
use crate::liveness::domain::score_aggregator::ScoringConfig;
use crate::shared::constants::{DEFAULT_FPS, MIN_FACE_FRAMES};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Orchestration knobs that are not part of any single heuristic.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Fewer accepted frames than this yields a zero-score result.
    pub min_face_frames: usize,
    /// Worker threads for the per-frame stage; `None` picks from the host.
    pub workers: Option<usize>,
    /// Bounded channel depth between pipeline threads.
    pub channel_capacity: usize,
    /// Enhanced frames kept for diagnostics.
    pub diagnostic_samples: usize,
    /// Frame rate assumed for image-directory input.
    pub frames_dir_fps: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_face_frames: MIN_FACE_FRAMES,
            workers: None,
            channel_capacity: 8,
            diagnostic_samples: 5,
            frames_dir_fps: DEFAULT_FPS,
        }
    }
}

/// Every tuned constant of the analysis, loadable from JSON.
///
/// Missing sections and fields fall back to their defaults, so a config
/// file only needs the values it changes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LivenessConfig {
    pub enhancement: EnhancementConfig,
    pub blink: BlinkConfig,
    pub distribution: DistributionConfig,
    pub scoring: ScoringConfig,
    pub acceptance: AcceptancePolicy,
    pub pipeline: PipelineConfig,
}

impl LivenessConfig {
    /// `<config dir>/blinkcheck/config.json`, when the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("blinkcheck").join("config.json"))
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads [`default_path`](Self::default_path) if it exists, else defaults.
    pub fn load_or_default() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => {
                log::info!("Using config {}", path.display());
                Self::load_from_file(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));
        let b = &self.blink;
        let s = &self.scoring;
        let e = &self.enhancement;

        if !(b.ear_closed_threshold > 0.0 && b.ear_closed_threshold < 1.0) {
            return invalid(format!(
                "blink.ear_closed_threshold must be in (0, 1), got {}",
                b.ear_closed_threshold
            ));
        }
        if b.min_closed_frames == 0 {
            return invalid("blink.min_closed_frames must be at least 1".into());
        }
        if !(0.0..=1.0).contains(&b.relative_drop_ratio) || !(0.0..=1.0).contains(&b.derivative_ratio) {
            return invalid("blink ratios must be in [0, 1]".into());
        }
        if !(0.0..=1.0).contains(&self.distribution.flatness_ratio) {
            return invalid(format!(
                "distribution.flatness_ratio must be in [0, 1], got {}",
                self.distribution.flatness_ratio
            ));
        }
        for (name, (lo, hi)) in [("scoring.ear_band", s.ear_band), ("scoring.rate_band", s.rate_band)] {
            if lo > hi {
                return invalid(format!("{name} lower bound {lo} exceeds upper bound {hi}"));
            }
        }
        if s.ear_centre <= 0.0 || s.rate_centre <= 0.0 {
            return invalid("scoring centres must be positive".into());
        }
        let weights = [s.blink_weight, s.ear_weight, s.rate_weight, s.face_weight];
        if weights.iter().any(|w| *w < 0.0) {
            return invalid("scoring weights must be non-negative".into());
        }
        if !(0.0..=1.0).contains(&self.acceptance.min_liveness_score) {
            return invalid(format!(
                "acceptance.min_liveness_score must be in [0, 1], got {}",
                self.acceptance.min_liveness_score
            ));
        }
        if e.clahe_grid == 0 {
            return invalid("enhancement.clahe_grid must be at least 1".into());
        }
        if e.blur_kernel % 2 == 0 {
            return invalid(format!("enhancement.blur_kernel must be odd, got {}", e.blur_kernel));
        }
        if self.pipeline.workers == Some(0) {
            return invalid("pipeline.workers must be at least 1".into());
        }
        if self.pipeline.channel_capacity == 0 {
            return invalid("pipeline.channel_capacity must be at least 1".into());
        }
        if !(self.pipeline.frames_dir_fps > 0.0) {
            return invalid("pipeline.frames_dir_fps must be positive".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        LivenessConfig::default().validate().unwrap();
    }

    #[test]
    fn test_default_thresholds() {
        let cfg = LivenessConfig::default();
        assert_eq!(cfg.blink.ear_closed_threshold, 0.13);
        assert_eq!(cfg.blink.min_closed_frames, 2);
        assert_eq!(cfg.distribution.flatness_ratio, 0.85);
        assert_eq!(cfg.scoring.blink_floor, 0.9);
        assert_eq!(cfg.scoring.coverage_floor, 0.85);
        assert_eq!(cfg.pipeline.min_face_frames, 10);
    }

    #[test]
    fn test_partial_file_overrides_only_given_fields() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        fs::write(
            &path,
            r#"{"blink": {"ear_closed_threshold": 0.15}, "acceptance": {"min_blink_count": 2}}"#,
        )
        .unwrap();

        let cfg = LivenessConfig::load_from_file(&path).unwrap();
        assert_eq!(cfg.blink.ear_closed_threshold, 0.15);
        assert_eq!(cfg.blink.min_closed_frames, 2);
        assert_eq!(cfg.acceptance.min_blink_count, 2);
        assert_eq!(cfg.acceptance.min_liveness_score, 0.3);
    }

    #[test]
    fn test_round_trips_through_json() {
        let cfg = LivenessConfig::default();
        let json = cfg.to_json_pretty().unwrap();
        let back: LivenessConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = LivenessConfig::load_from_file(Path::new("/nonexistent/blinkcheck.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();
        let err = LivenessConfig::load_from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_out_of_range_value_rejected_on_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        fs::write(&path, r#"{"enhancement": {"blur_kernel": 4}}"#).unwrap();
        let err = LivenessConfig::load_from_file(&path).unwrap_err();
        assert!(err.to_string().contains("blur_kernel"));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let cfg = LivenessConfig {
            pipeline: PipelineConfig {
                workers: Some(0),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }
}
