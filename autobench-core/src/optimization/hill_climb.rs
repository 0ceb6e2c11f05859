use crate::config::{Configuration, round4};

/// Default adjustment applied to each float parameter.
pub const DEFAULT_STEP: f64 = 0.05;

/// Default margin a score must clear to count as an improvement.
pub const DEFAULT_EPSILON: f64 = 0.5;

type Field = fn(&mut Configuration) -> &mut f32;

/// Parameters explored by [`neighbors`], with inclusive bounds.
const DIMENSIONS: [(Field, f32, f32); 4] = [
    (|c| &mut c.temperature, 0.05, 2.0),
    (|c| &mut c.top_p, 0.1, 1.0),
    (|c| &mut c.min_p, 0.0, 1.0),
    (|c| &mut c.repeat_penalty, 1.0, 2.0),
];

/// Configurations one `step` away from `base` in a single parameter.
///
/// Order: temperature down/up, top-p down/up, min-p down/up, repeat
/// penalty down/up. Candidates outside a parameter's bounds are skipped.
#[must_use]
pub fn neighbors(base: &Configuration, step: f64) -> Vec<Configuration> {
    let mut out = Vec::with_capacity(DIMENSIONS.len() * 2);
    for (field, lower, upper) in DIMENSIONS {
        for delta in [-step, step] {
            let mut candidate = *base;
            let slot = field(&mut candidate);
            let value = round4(f64::from(*slot) + delta);
            if value < lower || value > upper {
                continue;
            }
            *slot = value;
            out.push(candidate);
        }
    }
    out
}

/// `true` when `new_score` beats `baseline` by more than `epsilon`.
#[must_use]
pub fn is_improvement(baseline: f64, new_score: f64, epsilon: f64) -> bool {
    new_score > baseline + epsilon
}
