//! Sampling parameter configuration for a single inference call.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// One concrete point in the sampling-parameter space.
///
/// Configurations are aggregated per key while a run is in progress, so
/// equality and hashing are structural over every field. Floating point
/// fields compare by bit pattern after folding `-0.0` into `0.0`; the sweep
/// generator rounds every value it emits, so equal intents share one
/// representation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: i32,
    pub min_p: f32,
    pub repeat_penalty: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
    pub max_tokens: u32,
    /// Sampler seed. `0` lets the backend choose.
    pub seed: u32,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            temperature: 0.75,
            top_p: 0.9,
            top_k: 40,
            min_p: 0.1,
            repeat_penalty: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            max_tokens: 2048,
            seed: 0,
        }
    }
}

impl Configuration {
    /// Short human-readable summary for tables and progress lines.
    #[must_use]
    pub fn to_short_string(&self) -> String {
        format!(
            "T={:.2} P={:.2} K={} Min={:.2} Rep={:.2}",
            self.temperature, self.top_p, self.top_k, self.min_p, self.repeat_penalty
        )
    }

    fn key_bits(&self) -> [u32; 9] {
        [
            canonical_bits(self.temperature),
            canonical_bits(self.top_p),
            self.top_k as u32,
            canonical_bits(self.min_p),
            canonical_bits(self.repeat_penalty),
            canonical_bits(self.frequency_penalty),
            canonical_bits(self.presence_penalty),
            self.max_tokens,
            self.seed,
        ]
    }
}

impl PartialEq for Configuration {
    fn eq(&self, other: &Self) -> bool {
        self.key_bits() == other.key_bits()
    }
}

impl Eq for Configuration {}

impl Hash for Configuration {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key_bits().hash(state);
    }
}

fn canonical_bits(value: f32) -> u32 {
    if value == 0.0 { 0 } else { value.to_bits() }
}

/// Round a value to 4 decimal digits.
#[must_use]
pub fn round4(value: f64) -> f32 {
    ((value * 10_000.0).round() / 10_000.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_matches_documented_values() {
        let config = Configuration::default();
        assert_eq!(config.temperature, 0.75);
        assert_eq!(config.top_k, 40);
        assert_eq!(config.max_tokens, 2048);
        assert_eq!(config.seed, 0);
    }

    #[test]
    fn equal_fields_make_equal_map_keys() {
        let a = Configuration {
            temperature: 0.3,
            ..Default::default()
        };
        let b = Configuration {
            temperature: 0.3,
            ..Default::default()
        };

        let mut scores: HashMap<Configuration, Vec<f64>> = HashMap::new();
        scores.entry(a).or_default().push(1.0);
        scores.entry(b).or_default().push(2.0);

        assert_eq!(scores.len(), 1);
        assert_eq!(scores[&a], vec![1.0, 2.0]);
    }

    #[test]
    fn negative_zero_equals_zero() {
        let a = Configuration {
            frequency_penalty: -0.0,
            ..Default::default()
        };
        let b = Configuration {
            frequency_penalty: 0.0,
            ..Default::default()
        };
        assert_eq!(a, b);
    }

    #[test]
    fn differing_seed_is_a_different_configuration() {
        let a = Configuration::default();
        let b = Configuration {
            seed: 42,
            ..Default::default()
        };
        assert_ne!(a, b);
    }

    #[test]
    fn short_string_formats_swept_parameters() {
        let config = Configuration {
            temperature: 0.7,
            ..Default::default()
        };
        assert_eq!(
            config.to_short_string(),
            "T=0.70 P=0.90 K=40 Min=0.10 Rep=1.00"
        );
    }

    #[test]
    fn round4_removes_float_drift() {
        assert_eq!(round4(0.1 + 0.2), 0.3);
        assert_eq!(round4(0.123_456), 0.1235);
    }

    #[test]
    fn missing_fields_deserialize_to_defaults() {
        let config: Configuration = serde_json::from_str(r#"{"temperature":0.2}"#).unwrap();
        assert_eq!(config.temperature, 0.2);
        assert_eq!(config.top_p, 0.9);
    }
}
