//! The inference capability consumed by the benchmark engine.
//!
//! The engine depends only on [`InferenceClient`]; concrete HTTP backends
//! live in `autobench-models`.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::Configuration;

/// Errors raised by an inference backend.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// The cancellation token fired while the call was in flight.
    #[error("inference cancelled")]
    Cancelled,

    #[error("no model loaded")]
    ModelNotLoaded,

    /// The backend answered with an error.
    #[error("backend error: {0}")]
    Backend(String),

    /// The request could not be delivered or the response was unreadable.
    #[error("request failed: {0}")]
    Request(String),
}

impl InferenceError {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Performance figures for one inference call.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub tokens_per_second: f64,
    /// Time to first token, in milliseconds.
    pub time_to_first_token_ms: f64,
    /// Wall time of the whole call, in milliseconds.
    pub total_latency_ms: f64,
    pub token_count: u32,
}

impl PerformanceMetrics {
    /// Derive throughput from a token count and the generation window.
    #[must_use]
    pub fn from_timing(token_count: u32, first_token: Duration, total: Duration) -> Self {
        let generation = total.saturating_sub(first_token).as_secs_f64();
        let tokens_per_second = if generation > 0.0 {
            f64::from(token_count) / generation
        } else {
            0.0
        };
        Self {
            tokens_per_second,
            time_to_first_token_ms: first_token.as_secs_f64() * 1000.0,
            total_latency_ms: total.as_secs_f64() * 1000.0,
            token_count,
        }
    }
}

/// Response text plus metrics.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InferenceResult {
    pub response: String,
    pub metrics: PerformanceMetrics,
}

/// A loaded model that can answer prompts.
///
/// Implementations keep a conversation history seeded with the system
/// prompt. The engine calls [`reset_conversation`](Self::reset_conversation)
/// before every test case so each prompt is answered from a clean context.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Prepare `model` for inference.
    async fn load_model(
        &self,
        model: &Path,
        system_prompt: &str,
        threads: u32,
        context_size: u32,
    ) -> Result<(), InferenceError>;

    fn is_loaded(&self) -> bool;

    /// Answer `prompt` with the given sampling parameters.
    ///
    /// Must return [`InferenceError::Cancelled`] promptly once `cancel` fires.
    async fn run_inference(
        &self,
        prompt: &str,
        config: &Configuration,
        cancel: &CancellationToken,
    ) -> Result<InferenceResult, InferenceError>;

    /// Drop every turn except the system prompt, replacing it with `system_prompt`.
    async fn reset_conversation(&self, system_prompt: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throughput_excludes_time_to_first_token() {
        let metrics =
            PerformanceMetrics::from_timing(20, Duration::from_millis(500), Duration::from_millis(2500));

        assert_eq!(metrics.tokens_per_second, 10.0);
        assert_eq!(metrics.time_to_first_token_ms, 500.0);
        assert_eq!(metrics.total_latency_ms, 2500.0);
    }

    #[test]
    fn zero_generation_window_reports_zero_throughput() {
        let metrics = PerformanceMetrics::from_timing(5, Duration::ZERO, Duration::ZERO);
        assert_eq!(metrics.tokens_per_second, 0.0);
    }

    #[test]
    fn only_cancelled_is_cancellation() {
        assert!(InferenceError::Cancelled.is_cancelled());
        assert!(!InferenceError::Backend("boom".into()).is_cancelled());
        assert!(!InferenceError::ModelNotLoaded.is_cancelled());
    }
}
