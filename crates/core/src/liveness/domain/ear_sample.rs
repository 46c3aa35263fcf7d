use serde::Serialize;

use crate::detection::domain::eye_landmarks::EyePair;

/// Eye aspect ratios measured on one frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct EarSample {
    pub frame_index: usize,
    pub left_ear: f64,
    pub right_ear: f64,
    /// Mean of both eyes.
    pub combined_ear: f64,
}

impl EarSample {
    pub fn new(frame_index: usize, left_ear: f64, right_ear: f64) -> Self {
        Self {
            frame_index,
            left_ear,
            right_ear,
            combined_ear: (left_ear + right_ear) / 2.0,
        }
    }

    /// Sample with both eyes at `ear`; handy where only the combined value matters.
    pub fn uniform(frame_index: usize, ear: f64) -> Self {
        Self::new(frame_index, ear, ear)
    }

    /// `None` when either contour is degenerate.
    pub fn from_eyes(frame_index: usize, eyes: &EyePair) -> Option<Self> {
        let (left, right) = eyes.aspect_ratios()?;
        Some(Self::new(frame_index, left, right))
    }
}

/// Per-clip EAR sequence, appended in frame order.
#[derive(Clone, Debug, Default)]
pub struct EarSeries {
    samples: Vec<EarSample>,
}

impl EarSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: EarSample) {
        debug_assert!(
            self.samples
                .last()
                .map_or(true, |last| last.frame_index < sample.frame_index),
            "samples must arrive in frame order"
        );
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn combined(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.combined_ear).collect()
    }

    /// Mean combined EAR; 0 for an empty series.
    pub fn mean(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().map(|s| s.combined_ear).sum::<f64>() / self.samples.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::eye_landmarks::EyeLandmarks;
    use approx::assert_relative_eq;

    #[test]
    fn test_combined_is_mean_of_eyes_from_literal_points() {
        // Left: 20 wide, lids 3 above / 3 below -> (6 + 6) / 40 = 0.3
        let left = EyeLandmarks::new([
            (0.0, 10.0),
            (7.0, 7.0),
            (13.0, 7.0),
            (20.0, 10.0),
            (13.0, 13.0),
            (7.0, 13.0),
        ]);
        // Right: 20 wide, lids 1 above / 1 below -> (2 + 2) / 40 = 0.1
        let right = EyeLandmarks::new([
            (40.0, 10.0),
            (47.0, 9.0),
            (53.0, 9.0),
            (60.0, 10.0),
            (53.0, 11.0),
            (47.0, 11.0),
        ]);
        let sample = EarSample::from_eyes(3, &EyePair { left, right }).unwrap();
        assert_relative_eq!(sample.left_ear, 0.3);
        assert_relative_eq!(sample.right_ear, 0.1);
        assert_relative_eq!(sample.combined_ear, 0.2);
        assert_eq!(sample.frame_index, 3);
    }

    #[test]
    fn test_degenerate_eye_gives_no_sample() {
        let flat = EyeLandmarks::new([(1.0, 1.0); 6]);
        assert!(EarSample::from_eyes(0, &EyePair { left: flat, right: flat }).is_none());
    }

    #[test]
    fn test_series_mean() {
        let mut series = EarSeries::new();
        assert_relative_eq!(series.mean(), 0.0);
        series.push(EarSample::uniform(0, 0.2));
        series.push(EarSample::uniform(2, 0.4));
        assert_eq!(series.len(), 2);
        assert_relative_eq!(series.mean(), 0.3);
        assert_eq!(series.combined(), vec![0.2, 0.4]);
    }
}
