//! Sampling-parameter benchmarking for local language models.
//!
//! This crate expands a parameter sweep into concrete configurations, runs
//! every configuration against every test case of a dataset, scores each
//! response against the expected text and persists every result as soon as
//! it is produced.
//!
//! # Architecture
//!
//! - **Sweep** ([`sweep::generate`]) turns range/step declarations into an
//!   ordered list of [`Configuration`]s
//! - **Scoring** ([`SimilarityScorer`]) normalizes text and combines
//!   Levenshtein, Jaccard and LCS similarity
//! - **Engine** ([`BenchmarkEngine`]) drives the cross product through an
//!   [`InferenceClient`]
//! - **Storage** ([`BenchmarkStore`]) keeps runs and results crash-safe in
//!   libSQL

mod commands;
mod config;
mod dataset;
mod engine;
pub mod export;
mod inference;
pub mod optimization;
mod result;
pub mod scoring;
pub mod storage;
pub mod sweep;
mod types;

// Command types
pub use commands::{CreateRun, FinishRun, RunBenchmark};

// Configuration
pub use config::{Configuration, round4};

// Datasets
pub use dataset::{DatasetError, Difficulty, MatchMode, TestCase, TestDataset};

// Engine
pub use engine::{
    BenchmarkEngine, BenchmarkProgress, BenchmarkRunSummary, EngineError, estimate_remaining,
};

// Inference capability
pub use inference::{InferenceClient, InferenceError, InferenceResult, PerformanceMetrics};

// Result types
pub use result::{BenchmarkResult, RunRecord, RunStatus, model_name_from_path};

// Scoring
pub use scoring::{ResponseScorer, ScoringResult, SimilarityScorer};

// Sweep
pub use sweep::{SweepConfig, SweepError, SweepMode};

// ID types
pub use types::{RunId, TestCaseId};

// Storage traits (re-export from storage module)
pub use storage::{BenchmarkStore, TursoBenchmarkStore};
