//! Helpers for refining results across runs: drift detection over a model's
//! score history and hill-climb neighbour generation around a known-good
//! configuration.

mod drift;
mod hill_climb;

pub use drift::{DEFAULT_DEVIATION_THRESHOLD, DEFAULT_WINDOW_SIZE, DriftDetector, DriftResult};
pub use hill_climb::{DEFAULT_EPSILON, DEFAULT_STEP, is_improvement, neighbors};
