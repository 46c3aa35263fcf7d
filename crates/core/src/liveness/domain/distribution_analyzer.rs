use serde::{Deserialize, Serialize};

/// Post-hoc check on the whole EAR series.
///
/// A real blink pulls the lowest decile of the series well below the
/// interquartile mean. When the two are close the series never really
/// dipped, and a high blink count is more likely noise than blinking.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributionConfig {
    /// `low10 / mid50` above this means the series is too flat.
    pub flatness_ratio: f64,
    /// Counts above this are clamped to `clamp_to_high`, others to zero.
    pub clamp_above: usize,
    pub clamp_to_high: usize,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            flatness_ratio: 0.85,
            clamp_above: 3,
            clamp_to_high: 1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DistributionVerdict {
    pub low10: f64,
    pub mid50: f64,
    pub ratio: f64,
    pub original_count: usize,
    pub adjusted_count: usize,
}

impl DistributionVerdict {
    pub fn vetoed(&self) -> bool {
        self.adjusted_count != self.original_count
    }
}

/// Below this the interquartile mean is treated as zero.
const FLAT_EPSILON: f64 = 1e-9;

pub struct DistributionAnalyzer {
    config: DistributionConfig,
}

impl DistributionAnalyzer {
    pub fn new(config: DistributionConfig) -> Self {
        Self { config }
    }

    /// Applies the flatness veto to `blink_count`. Never raises the count.
    pub fn analyze(&self, combined_ears: &[f64], blink_count: usize) -> DistributionVerdict {
        if combined_ears.is_empty() {
            return DistributionVerdict {
                low10: 0.0,
                mid50: 0.0,
                ratio: 0.0,
                original_count: blink_count,
                adjusted_count: blink_count,
            };
        }

        let mut sorted = combined_ears.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let n = sorted.len();

        let low10 = mean(&sorted[..(n / 10).max(1)]);
        let iqr = &sorted[n / 4..(3 * n) / 4];
        let mid50 = if iqr.is_empty() { mean(&sorted) } else { mean(iqr) };
        let ratio = if mid50.abs() <= FLAT_EPSILON {
            1.0
        } else {
            low10 / mid50
        };

        let adjusted_count = if ratio > self.config.flatness_ratio && blink_count > 0 {
            if blink_count > self.config.clamp_above {
                self.config.clamp_to_high
            } else {
                0
            }
        } else {
            blink_count
        };

        if adjusted_count != blink_count {
            log::info!(
                "EAR distribution too flat (low10/mid50 = {ratio:.3}); blink count {blink_count} -> {adjusted_count}"
            );
        }

        DistributionVerdict {
            low10,
            mid50,
            ratio,
            original_count: blink_count,
            adjusted_count,
        }
    }
}

impl Default for DistributionAnalyzer {
    fn default() -> Self {
        Self::new(DistributionConfig::default())
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
