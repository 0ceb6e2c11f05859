//! Parameter sweep declarations and their expansion into configurations.
//!
//! Float ranges are enumerated by integer step index (`min + i * step`) and
//! each value is rounded once to 4 decimals. [`count`] and [`generate`] share
//! the same per-dimension step count, so `count(s) == generate(s).len()` for
//! every valid sweep.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{Configuration, round4};

/// Fraction of a step tolerated past `max` so that a boundary value is not
/// lost to floating point error.
const RANGE_EPSILON: f64 = 0.001;

/// Smallest float step that survives rounding to 4 decimals, less a margin
/// for `f32` representation error.
const MIN_FLOAT_STEP: f64 = 0.0001 - 1e-9;

/// Largest sweep that may be generated.
pub const MAX_CONFIGURATIONS: usize = 100_000;

/// Errors raised while validating or expanding a sweep.
#[derive(Debug, Error, PartialEq)]
pub enum SweepError {
    /// `max` lies below `min` on a swept dimension.
    #[error("invalid range for {parameter}: min {min} > max {max} (step {step})")]
    InvalidRange {
        parameter: &'static str,
        min: f64,
        max: f64,
        step: f64,
    },

    /// A positive step too fine to tell neighbouring values apart after
    /// rounding to 4 decimals.
    #[error("step {step} for {parameter} is below the 0.0001 resolution")]
    StepTooSmall { parameter: &'static str, step: f64 },

    /// A bound or step is NaN or infinite.
    #[error("non-finite bound or step for {parameter}")]
    NonFinite { parameter: &'static str },

    /// The expansion would exceed [`MAX_CONFIGURATIONS`].
    #[error("sweep expands to {count} configurations (limit {limit})")]
    TooLarge { count: u128, limit: usize },
}

/// Result type for sweep operations.
pub type Result<T> = std::result::Result<T, SweepError>;

/// Which parameters a sweep varies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepMode {
    /// Vary only temperature, hold everything else at its default.
    #[default]
    TemperatureOnly,
    /// Cartesian product of every swept range.
    AllCombinations,
}

impl SweepMode {
    /// Convert to database string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TemperatureOnly => "temperature_only",
            Self::AllCombinations => "all_combinations",
        }
    }

    /// Parse from database string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "temperature_only" => Some(Self::TemperatureOnly),
            "all_combinations" => Some(Self::AllCombinations),
            _ => None,
        }
    }
}

/// Declarative description of a parameter search space.
///
/// A step of zero or less on any dimension means "no sweep": the range
/// collapses to the single value `min`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub mode: SweepMode,

    pub temperature_min: f32,
    pub temperature_max: f32,
    pub temperature_step: f32,

    pub top_p_min: f32,
    pub top_p_max: f32,
    pub top_p_step: f32,

    pub top_k_min: i32,
    pub top_k_max: i32,
    pub top_k_step: i32,

    pub min_p_min: f32,
    pub min_p_max: f32,
    pub min_p_step: f32,

    pub repeat_penalty_min: f32,
    pub repeat_penalty_max: f32,
    pub repeat_penalty_step: f32,

    // Held constant where a dimension is not swept
    pub default_temperature: f32,
    pub default_top_p: f32,
    pub default_top_k: i32,
    pub default_min_p: f32,
    pub default_repeat_penalty: f32,
    pub default_frequency_penalty: f32,
    pub default_presence_penalty: f32,
    pub max_tokens: u32,

    /// Use [`seed`](Self::seed) for every configuration instead of letting
    /// the backend choose.
    pub deterministic_seed: bool,
    pub seed: u32,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            mode: SweepMode::TemperatureOnly,
            temperature_min: 0.1,
            temperature_max: 1.0,
            temperature_step: 0.1,
            top_p_min: 0.9,
            top_p_max: 1.0,
            top_p_step: 0.05,
            top_k_min: 20,
            top_k_max: 60,
            top_k_step: 10,
            min_p_min: 0.05,
            min_p_max: 0.2,
            min_p_step: 0.05,
            repeat_penalty_min: 1.0,
            repeat_penalty_max: 1.15,
            repeat_penalty_step: 0.05,
            default_temperature: 0.7,
            default_top_p: 0.9,
            default_top_k: 40,
            default_min_p: 0.1,
            default_repeat_penalty: 1.0,
            default_frequency_penalty: 0.0,
            default_presence_penalty: 0.0,
            max_tokens: 2048,
            deterministic_seed: true,
            seed: 42,
        }
    }
}

impl SweepConfig {
    fn effective_seed(&self) -> u32 {
        if self.deterministic_seed { self.seed } else { 0 }
    }
}

/// Number of values enumerated on each dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Dimensions {
    temperature: usize,
    top_p: usize,
    top_k: usize,
    min_p: usize,
    repeat_penalty: usize,
}

impl Dimensions {
    fn resolve(sweep: &SweepConfig) -> Result<Self> {
        let temperature = float_steps(
            "temperature",
            sweep.temperature_min,
            sweep.temperature_max,
            sweep.temperature_step,
        )?;

        let dims = match sweep.mode {
            SweepMode::TemperatureOnly => Self {
                temperature,
                top_p: 1,
                top_k: 1,
                min_p: 1,
                repeat_penalty: 1,
            },
            SweepMode::AllCombinations => Self {
                temperature,
                top_p: float_steps("top_p", sweep.top_p_min, sweep.top_p_max, sweep.top_p_step)?,
                top_k: int_steps("top_k", sweep.top_k_min, sweep.top_k_max, sweep.top_k_step)?,
                min_p: float_steps("min_p", sweep.min_p_min, sweep.min_p_max, sweep.min_p_step)?,
                repeat_penalty: float_steps(
                    "repeat_penalty",
                    sweep.repeat_penalty_min,
                    sweep.repeat_penalty_max,
                    sweep.repeat_penalty_step,
                )?,
            },
        };

        let total = [dims.top_p, dims.top_k, dims.min_p, dims.repeat_penalty]
            .iter()
            .fold(dims.temperature as u128, |acc, n| acc * *n as u128);
        if total > MAX_CONFIGURATIONS as u128 {
            return Err(SweepError::TooLarge {
                count: total,
                limit: MAX_CONFIGURATIONS,
            });
        }
        Ok(dims)
    }

    fn total(&self) -> usize {
        self.temperature * self.top_p * self.top_k * self.min_p * self.repeat_penalty
    }
}

/// Number of configurations [`generate`] will produce, without producing them.
pub fn count(sweep: &SweepConfig) -> Result<usize> {
    Ok(Dimensions::resolve(sweep)?.total())
}

/// Expand a sweep into its ordered list of configurations.
///
/// In all-combinations mode the nesting order is fixed: temperature
/// outermost, then top-p, top-k, min-p, and repeat penalty innermost.
pub fn generate(sweep: &SweepConfig) -> Result<Vec<Configuration>> {
    let dims = Dimensions::resolve(sweep)?;
    let seed = sweep.effective_seed();

    let temperatures = float_values(sweep.temperature_min, sweep.temperature_step, dims.temperature);

    let configs = match sweep.mode {
        SweepMode::TemperatureOnly => temperatures
            .into_iter()
            .map(|temperature| Configuration {
                temperature,
                top_p: sweep.default_top_p,
                top_k: sweep.default_top_k,
                min_p: sweep.default_min_p,
                repeat_penalty: sweep.default_repeat_penalty,
                frequency_penalty: sweep.default_frequency_penalty,
                presence_penalty: sweep.default_presence_penalty,
                max_tokens: sweep.max_tokens,
                seed,
            })
            .collect(),
        SweepMode::AllCombinations => {
            let top_ps = float_values(sweep.top_p_min, sweep.top_p_step, dims.top_p);
            let top_ks = int_values(sweep.top_k_min, sweep.top_k_max, sweep.top_k_step, dims.top_k);
            let min_ps = float_values(sweep.min_p_min, sweep.min_p_step, dims.min_p);
            let repeat_penalties = float_values(
                sweep.repeat_penalty_min,
                sweep.repeat_penalty_step,
                dims.repeat_penalty,
            );

            let mut configs = Vec::with_capacity(dims.total());
            for &temperature in &temperatures {
                for &top_p in &top_ps {
                    for &top_k in &top_ks {
                        for &min_p in &min_ps {
                            for &repeat_penalty in &repeat_penalties {
                                configs.push(Configuration {
                                    temperature,
                                    top_p,
                                    top_k,
                                    min_p,
                                    repeat_penalty,
                                    frequency_penalty: sweep.default_frequency_penalty,
                                    presence_penalty: sweep.default_presence_penalty,
                                    max_tokens: sweep.max_tokens,
                                    seed,
                                });
                            }
                        }
                    }
                }
            }
            configs
        }
    };

    Ok(configs)
}

fn float_steps(parameter: &'static str, min: f32, max: f32, step: f32) -> Result<usize> {
    if !(min.is_finite() && max.is_finite() && step.is_finite()) {
        return Err(SweepError::NonFinite { parameter });
    }
    if step <= 0.0 {
        return Ok(1);
    }
    if f64::from(step) < MIN_FLOAT_STEP {
        return Err(SweepError::StepTooSmall {
            parameter,
            step: step.into(),
        });
    }
    if max < min {
        return Err(SweepError::InvalidRange {
            parameter,
            min: min.into(),
            max: max.into(),
            step: step.into(),
        });
    }

    let span = (f64::from(max) - f64::from(min)) / f64::from(step);
    let steps = (span + RANGE_EPSILON).floor() + 1.0;
    if steps > MAX_CONFIGURATIONS as f64 {
        return Err(SweepError::TooLarge {
            count: steps as u128,
            limit: MAX_CONFIGURATIONS,
        });
    }
    Ok(steps as usize)
}

fn int_steps(parameter: &'static str, min: i32, max: i32, step: i32) -> Result<usize> {
    if step <= 0 {
        return Ok(1);
    }
    if max < min {
        return Err(SweepError::InvalidRange {
            parameter,
            min: min.into(),
            max: max.into(),
            step: step.into(),
        });
    }
    let steps = (i64::from(max) - i64::from(min)) / i64::from(step) + 1;
    Ok(steps as usize)
}

fn float_values(min: f32, step: f32, n: usize) -> Vec<f32> {
    let (min, step) = (f64::from(min), f64::from(step));
    (0..n).map(|i| round4(min + i as f64 * step)).collect()
}

// Widened to i64: `i * step` can leave i32 even though every value lies in
// `min..=max`.
fn int_values(min: i32, max: i32, step: i32, n: usize) -> Vec<i32> {
    let (min, max, step) = (i64::from(min), i64::from(max), i64::from(step.max(0)));
    (0..n as i64)
        .map(|i| (min + i * step).min(max) as i32)
        .collect()
}
