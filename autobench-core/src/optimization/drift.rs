use std::collections::VecDeque;

use serde::Serialize;

/// Default number of scores kept in the rolling window.
pub const DEFAULT_WINDOW_SIZE: usize = 10;

/// Default deviation, in standard deviations, that counts as drift.
pub const DEFAULT_DEVIATION_THRESHOLD: f64 = 2.0;

/// Scores recorded before drift checks begin.
const WARMUP_SCORES: usize = 3;

/// Verdict for one recorded score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DriftResult {
    pub is_drift_detected: bool,
    pub score: f64,
    /// Mean of the window before this score was added.
    pub window_mean: f64,
    /// Population standard deviation of the window before this score.
    pub window_std_dev: f64,
    /// Distance from the mean in standard deviations (raw distance when the
    /// window has no spread).
    pub deviation_from_mean: f64,
}

/// Flags benchmark scores that stray from a rolling baseline.
///
/// The first three scores only seed the window. After that each score is
/// compared with the mean and standard deviation of the window as it was
/// before the score arrived.
#[derive(Debug, Clone)]
pub struct DriftDetector {
    window: VecDeque<f64>,
    window_size: usize,
    deviation_threshold: f64,
}

impl Default for DriftDetector {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE, DEFAULT_DEVIATION_THRESHOLD)
    }
}

impl DriftDetector {
    pub fn new(window_size: usize, deviation_threshold: f64) -> Self {
        Self {
            window: VecDeque::with_capacity(window_size + 1),
            window_size: window_size.max(1),
            deviation_threshold,
        }
    }

    /// Record `score` and report whether it is drift.
    pub fn record_score(&mut self, score: f64) -> DriftResult {
        if self.window.len() < WARMUP_SCORES {
            self.push(score);
            return DriftResult {
                is_drift_detected: false,
                score,
                window_mean: score,
                window_std_dev: 0.0,
                deviation_from_mean: 0.0,
            };
        }

        let n = self.window.len() as f64;
        let mean = self.window.iter().sum::<f64>() / n;
        let variance = self.window.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
        let std_dev = variance.sqrt();
        let distance = (score - mean).abs();

        self.push(score);

        DriftResult {
            is_drift_detected: std_dev > 0.0 && distance > self.deviation_threshold * std_dev,
            score,
            window_mean: mean,
            window_std_dev: std_dev,
            deviation_from_mean: distance / if std_dev > 0.0 { std_dev } else { 1.0 },
        }
    }

    /// Clear the window.
    pub fn reset(&mut self) {
        self.window.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.window.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    fn push(&mut self, score: f64) {
        self.window.push_back(score);
        while self.window.len() > self.window_size {
            self.window.pop_front();
        }
    }
}
