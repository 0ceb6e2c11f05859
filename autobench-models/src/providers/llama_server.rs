//! llama.cpp `llama-server` backend.
//!
//! The server loads its model at startup, so `load_model` only verifies the
//! server is healthy. Requests go through the OpenAI-compatible
//! `/v1/chat/completions` endpoint; llama.cpp adds a `timings` block with
//! its own throughput measurements.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use autobench_core::{
    Configuration, InferenceClient, InferenceError, InferenceResult, PerformanceMetrics,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::types::{ChatMessage, Conversation};
use crate::{Error, Result};

/// Default llama-server base URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

#[derive(Debug, Serialize)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: i32,
    pub min_p: f32,
    pub repeat_penalty: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
    pub max_tokens: u32,
    /// llama.cpp treats -1 as "random seed".
    pub seed: i64,
}

#[derive(Debug, Deserialize)]
pub struct CompletionResponse {
    pub choices: Vec<CompletionChoice>,
    #[serde(default)]
    pub usage: Option<CompletionUsage>,
    #[serde(default)]
    pub timings: Option<CompletionTimings>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionChoice {
    pub message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
pub struct CompletionMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionUsage {
    #[serde(default)]
    pub completion_tokens: u32,
}

/// Server-side timings reported by llama.cpp.
#[derive(Debug, Deserialize)]
pub struct CompletionTimings {
    #[serde(default)]
    pub prompt_ms: f64,
    #[serde(default)]
    pub predicted_n: u32,
    #[serde(default)]
    pub predicted_per_second: f64,
}

impl CompletionResponse {
    /// Turn the response into a result, preferring server timings.
    pub fn into_result(self, total: Duration) -> Result<InferenceResult> {
        let Some(choice) = self.choices.into_iter().next() else {
            return Err(Error::ProviderApi("response contained no choices".to_string()));
        };
        let response = choice.message.content.unwrap_or_default();
        let total_latency_ms = total.as_secs_f64() * 1000.0;

        let metrics = match self.timings {
            Some(timings) => PerformanceMetrics {
                tokens_per_second: timings.predicted_per_second,
                time_to_first_token_ms: timings.prompt_ms,
                total_latency_ms,
                token_count: timings.predicted_n,
            },
            None => {
                let tokens = self.usage.map_or(0, |usage| usage.completion_tokens);
                PerformanceMetrics::from_timing(tokens, Duration::ZERO, total)
            }
        };

        Ok(InferenceResult { response, metrics })
    }
}

/// Client for a running `llama-server` instance.
pub struct LlamaServerClient {
    base_url: String,
    client: reqwest::Client,
    model: std::sync::RwLock<String>,
    loaded: AtomicBool,
    conversation: Conversation,
}

impl LlamaServerClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            model: std::sync::RwLock::new(String::new()),
            loaded: AtomicBool::new(false),
            conversation: Conversation::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check `/health`; the server answers 503 while still loading.
    pub async fn health(&self) -> Result<()> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::ProviderApi(format!(
                "llama-server not ready ({}): {}",
                status, body
            )));
        }
        Ok(())
    }

    fn model_name(&self) -> String {
        self.model
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &Configuration,
    ) -> Result<InferenceResult> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let model = self.model_name();
        let request = CompletionRequest {
            model: &model,
            messages,
            stream: false,
            temperature: config.temperature,
            top_p: config.top_p,
            top_k: config.top_k,
            min_p: config.min_p,
            repeat_penalty: config.repeat_penalty,
            frequency_penalty: config.frequency_penalty,
            presence_penalty: config.presence_penalty,
            max_tokens: config.max_tokens,
            seed: if config.seed == 0 {
                -1
            } else {
                i64::from(config.seed)
            },
        };

        let started = Instant::now();
        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::ProviderApi(format!(
                "llama-server returned {}: {}",
                status, body
            )));
        }

        let body: CompletionResponse = response.json().await?;
        body.into_result(started.elapsed())
    }
}

impl Default for LlamaServerClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InferenceClient for LlamaServerClient {
    fn name(&self) -> &str {
        "llama-server"
    }

    #[instrument(skip(self, system_prompt), level = "debug")]
    async fn load_model(
        &self,
        model: &Path,
        system_prompt: &str,
        threads: u32,
        context_size: u32,
    ) -> std::result::Result<(), InferenceError> {
        self.health().await?;
        if threads != 0 || context_size != 0 {
            debug!(
                threads,
                context_size, "llama-server fixes threads and context at startup; ignoring"
            );
        }

        let name = model.to_string_lossy().into_owned();
        info!(model = %name, url = %self.base_url, "llama-server ready");
        *self
            .model
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = name;
        self.loaded.store(true, Ordering::SeqCst);
        self.conversation.reset(system_prompt);
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    async fn run_inference(
        &self,
        prompt: &str,
        config: &Configuration,
        cancel: &CancellationToken,
    ) -> std::result::Result<InferenceResult, InferenceError> {
        if !self.is_loaded() {
            return Err(InferenceError::ModelNotLoaded);
        }
        let messages = self.conversation.with_user_turn(prompt);

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(InferenceError::Cancelled),
            result = self.complete(messages, config) => result?,
        };

        self.conversation.record_exchange(prompt, &result.response);
        Ok(result)
    }

    async fn reset_conversation(&self, system_prompt: &str) {
        self.conversation.reset(system_prompt);
    }
}
