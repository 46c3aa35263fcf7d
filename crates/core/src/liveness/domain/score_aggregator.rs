use serde::{Deserialize, Serialize};

/// Weights, bands and floors for the final score.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// A clip with this many blinks always earns the full blink score.
    pub strong_blink_count: usize,
    /// Caller-tunable minimum that also earns the full blink score.
    pub min_blinks: usize,
    pub ear_band: (f64, f64),
    pub ear_centre: f64,
    pub rate_band: (f64, f64),
    pub rate_centre: f64,
    pub coverage_multiplier: f64,
    pub blink_weight: f64,
    pub ear_weight: f64,
    pub rate_weight: f64,
    pub face_weight: f64,
    /// Score floor once at least one blink is seen.
    pub blink_floor: f64,
    /// Coverage above this lifts the score to `coverage_floor`.
    pub coverage_floor_ratio: f64,
    pub coverage_floor: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            strong_blink_count: 3,
            min_blinks: 3,
            ear_band: (0.20, 0.35),
            ear_centre: 0.275,
            rate_band: (0.2, 0.4),
            rate_centre: 0.3,
            coverage_multiplier: 1.5,
            blink_weight: 0.7,
            ear_weight: 0.1,
            rate_weight: 0.1,
            face_weight: 0.1,
            blink_floor: 0.9,
            coverage_floor_ratio: 0.8,
            coverage_floor: 0.85,
        }
    }
}

/// Clip-level measurements the score is computed from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoreInputs {
    pub blink_count: usize,
    pub average_ear: f64,
    pub blink_rate: f64,
    pub face_detection_ratio: f64,
}

/// Component scores and the final, floored score.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub blink_score: f64,
    pub ear_score: f64,
    pub rate_score: f64,
    pub face_score: f64,
    pub weighted: f64,
    pub liveness_score: f64,
}

pub struct ScoreAggregator {
    config: ScoringConfig,
}

impl ScoreAggregator {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn score(&self, inputs: &ScoreInputs) -> ScoreBreakdown {
        let cfg = &self.config;

        let blink_score =
            if inputs.blink_count >= cfg.strong_blink_count || inputs.blink_count >= cfg.min_blinks {
                1.0
            } else {
                0.0
            };
        let ear_score = band_score(inputs.average_ear, cfg.ear_band, cfg.ear_centre);
        let rate_score = band_score(inputs.blink_rate, cfg.rate_band, cfg.rate_centre);
        let face_score = (inputs.face_detection_ratio * cfg.coverage_multiplier).min(1.0);

        let weighted = cfg.blink_weight * blink_score
            + cfg.ear_weight * ear_score
            + cfg.rate_weight * rate_score
            + cfg.face_weight * face_score;

        let mut score = weighted;
        if inputs.blink_count >= 1 {
            score = score.max(cfg.blink_floor);
        }
        if inputs.face_detection_ratio > cfg.coverage_floor_ratio {
            score = score.max(cfg.coverage_floor);
        }

        ScoreBreakdown {
            blink_score,
            ear_score,
            rate_score,
            face_score,
            weighted,
            liveness_score: score.clamp(0.0, 1.0),
        }
    }
}

impl Default for ScoreAggregator {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}

/// 1.0 inside `band`, otherwise linear decay by `|x - centre| / centre`,
/// reaching zero at 0 and at twice the centre.
fn band_score(x: f64, band: (f64, f64), centre: f64) -> f64 {
    if !x.is_finite() {
        return 0.0;
    }
    if (band.0..=band.1).contains(&x) {
        return 1.0;
    }
    if centre <= 0.0 {
        return 0.0;
    }
    (1.0 - (x - centre).abs() / centre).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn inputs(blinks: usize, ear: f64, rate: f64, coverage: f64) -> ScoreInputs {
        ScoreInputs {
            blink_count: blinks,
            average_ear: ear,
            blink_rate: rate,
            face_detection_ratio: coverage,
        }
    }

    #[rstest]
    #[case::inside_low(0.20, 1.0)]
    #[case::inside_mid(0.30, 1.0)]
    #[case::inside_high(0.35, 1.0)]
    #[case::below(0.11, 0.4)]
    #[case::above(0.44, 0.4)]
    #[case::zero(0.0, 0.0)]
    #[case::far_above(0.9, 0.0)]
    fn test_ear_band_score(#[case] ear: f64, #[case] expected: f64) {
        assert_relative_eq!(band_score(ear, (0.20, 0.35), 0.275), expected, epsilon = 1e-9);
    }

    #[test]
    fn test_rate_band_score() {
        assert_relative_eq!(band_score(0.25, (0.2, 0.4), 0.3), 1.0);
        assert_relative_eq!(band_score(0.15, (0.2, 0.4), 0.3), 0.5, epsilon = 1e-9);
        assert_relative_eq!(band_score(0.5, (0.2, 0.4), 0.3), 1.0 - 0.2 / 0.3, epsilon = 1e-9);
    }

    #[test]
    fn test_single_blink_floors_at_point_nine() {
        let b = ScoreAggregator::default().score(&inputs(1, 0.0, 0.0, 0.0));
        assert_relative_eq!(b.weighted, 0.0);
        assert_relative_eq!(b.liveness_score, 0.9);
    }

    #[test]
    fn test_high_coverage_floor_without_blinks() {
        let b = ScoreAggregator::default().score(&inputs(0, 0.0, 0.0, 0.81));
        assert_relative_eq!(b.face_score, 1.0);
        assert_relative_eq!(b.liveness_score, 0.85);
    }

    #[test]
    fn test_coverage_floor_is_strict() {
        let b = ScoreAggregator::default().score(&inputs(0, 0.0, 0.0, 0.8));
        assert_relative_eq!(b.liveness_score, 0.1, epsilon = 1e-9);
    }

    #[test]
    fn test_ideal_clip_scores_one() {
        let b = ScoreAggregator::default().score(&inputs(4, 0.28, 0.3, 1.0));
        assert_relative_eq!(b.liveness_score, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_no_blinks_partial_signals() {
        // ear in band, rate 0, coverage 0.5 -> face 0.75
        let b = ScoreAggregator::default().score(&inputs(0, 0.3, 0.0, 0.5));
        assert_relative_eq!(b.blink_score, 0.0);
        assert_relative_eq!(b.liveness_score, 0.1 + 0.075, epsilon = 1e-9);
    }

    #[test]
    fn test_lower_min_blinks_earns_full_blink_score() {
        let aggregator = ScoreAggregator::new(ScoringConfig {
            min_blinks: 2,
            ..Default::default()
        });
        assert_relative_eq!(aggregator.score(&inputs(2, 0.0, 0.0, 0.0)).blink_score, 1.0);
        assert_relative_eq!(
            ScoreAggregator::default().score(&inputs(2, 0.0, 0.0, 0.0)).blink_score,
            0.0
        );
    }

    #[test]
    fn test_score_is_bounded() {
        let aggregator = ScoreAggregator::new(ScoringConfig {
            blink_floor: 1.7,
            ..Default::default()
        });
        assert_relative_eq!(aggregator.score(&inputs(1, 0.3, 0.3, 1.0)).liveness_score, 1.0);
    }
}
