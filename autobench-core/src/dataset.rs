//! Test cases and named datasets.
//!
//! Datasets are stored as pretty-printed JSON and round-trip losslessly
//! through [`TestDataset::save_to_file`] / [`TestDataset::load_from_file`].

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::TestCaseId;

/// Errors reading, writing or validating a dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("dataset I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("dataset JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A similarity threshold outside 0..=100.
    #[error("test case '{name}' has threshold {threshold}, expected 0-100")]
    InvalidThreshold { name: String, threshold: f64 },
}

/// Difficulty tier of a test case. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Complex,
}

impl Difficulty {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Complex => "complex",
        }
    }
}

/// How a response is compared with the expected text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Case-insensitive equality after normalization.
    Exact,
    /// Composite string similarity against a pass threshold.
    #[default]
    Similarity,
}

impl MatchMode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Similarity => "similarity",
        }
    }
}

/// A single prompt with its expected response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestCase {
    pub id: TestCaseId,
    pub name: String,
    pub difficulty: Difficulty,
    pub prompt: String,
    pub expected_response: String,
    pub match_mode: MatchMode,
    /// Minimum composite score (0-100) required to pass. Only used in
    /// [`MatchMode::Similarity`].
    pub similarity_threshold: f64,
}

impl Default for TestCase {
    fn default() -> Self {
        Self {
            id: TestCaseId::new(),
            name: String::new(),
            difficulty: Difficulty::Easy,
            prompt: String::new(),
            expected_response: String::new(),
            match_mode: MatchMode::Similarity,
            similarity_threshold: 70.0,
        }
    }
}

impl TestCase {
    /// Create a similarity-mode test case with the default threshold.
    pub fn new(
        name: impl Into<String>,
        prompt: impl Into<String>,
        expected_response: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            prompt: prompt.into(),
            expected_response: expected_response.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    #[must_use]
    pub fn with_match_mode(mut self, match_mode: MatchMode) -> Self {
        self.match_mode = match_mode;
        self
    }

    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold;
        self
    }
}

/// Named, ordered collection of test cases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestDataset {
    pub name: String,
    pub test_cases: Vec<TestCase>,
}

impl Default for TestDataset {
    fn default() -> Self {
        Self {
            name: "Default".to_string(),
            test_cases: Vec::new(),
        }
    }
}

impl TestDataset {
    /// Built-in dataset with one easy, one medium and one complex case.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            name: "Default".to_string(),
            test_cases: vec![
                TestCase::new(
                    "Simple Arithmetic",
                    "What is 2 + 2? Answer with just the number.",
                    "4",
                )
                .with_threshold(80.0),
                TestCase::new(
                    "Python Factorial",
                    "Write a Python function called 'factorial' that takes an integer n and returns its factorial. Return only the code, no explanation.",
                    "def factorial(n):\n    if n <= 1:\n        return 1\n    return n * factorial(n - 1)",
                )
                .with_difficulty(Difficulty::Medium)
                .with_threshold(60.0),
                TestCase::new(
                    "TCP vs UDP Comparison",
                    "Explain the key differences between TCP and UDP protocols. Include: connection type, reliability, ordering, speed, and typical use cases. Be concise.",
                    "TCP is connection-oriented, reliable, ordered, slower, used for web/email/file transfer. UDP is connectionless, unreliable, unordered, faster, used for streaming/gaming/DNS.",
                )
                .with_difficulty(Difficulty::Complex)
                .with_threshold(40.0),
            ],
        }
    }

    /// Check every similarity threshold lies in 0..=100.
    pub fn validate(&self) -> Result<(), DatasetError> {
        for case in &self.test_cases {
            if !(0.0..=100.0).contains(&case.similarity_threshold) {
                return Err(DatasetError::InvalidThreshold {
                    name: case.name.clone(),
                    threshold: case.similarity_threshold,
                });
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, DatasetError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, DatasetError> {
        let dataset: Self = serde_json::from_str(json)?;
        dataset.validate()?;
        Ok(dataset)
    }

    /// Write the dataset as JSON, creating parent directories as needed.
    pub fn save_to_file(&self, path: &Path) -> Result<(), DatasetError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self, DatasetError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }
}
