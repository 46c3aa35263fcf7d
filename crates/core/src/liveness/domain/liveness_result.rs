use serde::Serialize;

use crate::liveness::domain::blink_detector::BlinkEvent;
use crate::liveness::domain::distribution_analyzer::DistributionVerdict;
use crate::liveness::domain::score_aggregator::ScoreBreakdown;

/// The outcome handed back to callers, one per analysed clip.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct LivenessResult {
    pub liveness_score: f64,
    pub blink_count: usize,
    #[serde(rename = "avg_ear")]
    pub average_ear: f64,
    /// Blinks per second of decoded footage.
    pub blink_rate: f64,
    pub face_detected_frames: usize,
    pub face_detection_ratio: f64,
    pub rotated_frame_count: usize,
}

impl LivenessResult {
    /// Zero-score result with every counter zeroed, for clips with too few
    /// usable faces.
    pub fn insufficient_coverage() -> Self {
        Self::default()
    }
}

/// Everything the analysis learned about a clip, for diagnostics.
#[derive(Clone, Debug, Serialize)]
pub struct LivenessReport {
    pub result: LivenessResult,
    pub events: Vec<BlinkEvent>,
    /// `None` when coverage was too low to analyse blinks.
    pub distribution: Option<DistributionVerdict>,
    pub scores: Option<ScoreBreakdown>,
    pub decoded_frames: usize,
    /// Frames whose landmark extraction failed (counted as undetected).
    pub failed_frames: usize,
    pub fps: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_contract_field_names() {
        let result = LivenessResult {
            liveness_score: 0.9,
            blink_count: 2,
            average_ear: 0.27,
            blink_rate: 0.4,
            face_detected_frames: 140,
            face_detection_ratio: 0.93,
            rotated_frame_count: 0,
        };
        let json = serde_json::to_value(&result).unwrap();
        let mut keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(
            keys,
            vec![
                "avg_ear",
                "blink_count",
                "blink_rate",
                "face_detected_frames",
                "face_detection_ratio",
                "liveness_score",
                "rotated_frame_count",
            ]
        );
        assert_eq!(json["avg_ear"], 0.27);
    }

    #[test]
    fn test_insufficient_coverage_is_all_zero() {
        let result = LivenessResult::insufficient_coverage();
        assert_eq!(result.liveness_score, 0.0);
        assert_eq!(result.blink_count, 0);
        assert_eq!(result.face_detected_frames, 0);
        assert_eq!(result.face_detection_ratio, 0.0);
        assert_eq!(result.rotated_frame_count, 0);
    }
}
