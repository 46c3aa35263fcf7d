use serde::{Deserialize, Serialize};

use crate::liveness::domain::liveness_result::LivenessResult;

/// Caller-side gate on a [`LivenessResult`].
///
/// A clip is accepted when its score is strictly above
/// `min_liveness_score` and it has at least `min_blink_count` blinks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcceptancePolicy {
    pub min_liveness_score: f64,
    pub min_blink_count: usize,
}

impl Default for AcceptancePolicy {
    fn default() -> Self {
        Self {
            min_liveness_score: 0.3,
            min_blink_count: 3,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Verdict {
    pub accepted: bool,
    /// Why the clip was rejected; empty when accepted.
    pub reasons: Vec<String>,
}

impl AcceptancePolicy {
    pub fn evaluate(&self, result: &LivenessResult) -> Verdict {
        let mut reasons = Vec::new();
        if result.liveness_score <= self.min_liveness_score {
            reasons.push(format!(
                "liveness score {:.3} not above {:.3}",
                result.liveness_score, self.min_liveness_score
            ));
        }
        if result.blink_count < self.min_blink_count {
            reasons.push(format!(
                "{} blink(s), need at least {}",
                result.blink_count, self.min_blink_count
            ));
        }
        Verdict {
            accepted: reasons.is_empty(),
            reasons,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn result(score: f64, blinks: usize) -> LivenessResult {
        LivenessResult {
            liveness_score: score,
            blink_count: blinks,
            ..Default::default()
        }
    }

    #[rstest]
    #[case::accepted(0.95, 3, true)]
    #[case::score_at_minimum(0.3, 5, false)]
    #[case::too_few_blinks(0.95, 2, false)]
    #[case::both_fail(0.0, 0, false)]
    fn test_gate(#[case] score: f64, #[case] blinks: usize, #[case] accepted: bool) {
        let verdict = AcceptancePolicy::default().evaluate(&result(score, blinks));
        assert_eq!(verdict.accepted, accepted);
        assert_eq!(verdict.reasons.is_empty(), accepted);
    }

    #[test]
    fn test_both_reasons_reported() {
        let verdict = AcceptancePolicy::default().evaluate(&result(0.1, 1));
        assert_eq!(verdict.reasons.len(), 2);
    }

    #[test]
    fn test_custom_thresholds() {
        let policy = AcceptancePolicy {
            min_liveness_score: 0.5,
            min_blink_count: 1,
        };
        assert!(policy.evaluate(&result(0.9, 1)).accepted);
    }
}
