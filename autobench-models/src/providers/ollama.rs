//! Ollama local model backend.
//!
//! Streams `/api/chat` responses as NDJSON so time to first token can be
//! measured on the client.
//!
//! # Example
//!
//! ```ignore
//! use autobench_models::providers::OllamaClient;
//!
//! let client = OllamaClient::new();  // Uses localhost:11434
//! let client = OllamaClient::with_base_url("http://192.168.1.100:11434");
//! ```

use std::path::Path;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use autobench_core::{
    Configuration, InferenceClient, InferenceError, InferenceResult, PerformanceMetrics,
};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::types::{ChatMessage, Conversation};
use crate::{Error, Result};

/// Default Ollama API base URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

// ────────────────────────────────────────────────────────────────────────────
// Ollama API Types
// ────────────────────────────────────────────────────────────────────────────

/// Response from Ollama's `/api/tags` endpoint.
#[derive(Debug, Deserialize)]
pub struct OllamaTagsResponse {
    pub models: Vec<OllamaModel>,
}

/// Model information from Ollama's API.
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaModel {
    pub name: String,
    #[serde(default)]
    pub size: u64,
}

impl OllamaModel {
    /// Whether this model answers to `name`, allowing the implicit `:latest` tag.
    pub fn matches(&self, name: &str) -> bool {
        self.name == name || self.name.strip_suffix(":latest") == Some(name)
    }
}

/// Request body for Ollama's `/api/chat` endpoint.
#[derive(Debug, Serialize)]
pub struct OllamaChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    pub options: OllamaOptions,
}

/// Sampling and runtime options for Ollama.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OllamaOptions {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: i32,
    pub min_p: f32,
    pub repeat_penalty: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
    pub num_predict: u32,
    /// Omitted when the configuration leaves the seed to the backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_ctx: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_thread: Option<u32>,
}

impl OllamaOptions {
    /// Map a configuration onto Ollama options. Zero means "unset" for the
    /// seed, thread count and context size.
    pub fn new(config: &Configuration, threads: u32, context_size: u32) -> Self {
        Self {
            temperature: config.temperature,
            top_p: config.top_p,
            top_k: config.top_k,
            min_p: config.min_p,
            repeat_penalty: config.repeat_penalty,
            frequency_penalty: config.frequency_penalty,
            presence_penalty: config.presence_penalty,
            num_predict: config.max_tokens,
            seed: (config.seed != 0).then_some(config.seed),
            num_ctx: (context_size != 0).then_some(context_size),
            num_thread: (threads != 0).then_some(threads),
        }
    }
}

/// One NDJSON line of a streaming `/api/chat` response.
#[derive(Debug, Deserialize)]
pub struct OllamaChatChunk {
    #[serde(default)]
    pub message: Option<OllamaChunkMessage>,
    #[serde(default)]
    pub done: bool,
    /// Generated token count, reported on the final chunk.
    #[serde(default)]
    pub eval_count: Option<u64>,
    /// Generation time in nanoseconds, reported on the final chunk.
    #[serde(default)]
    pub eval_duration: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OllamaChunkMessage {
    #[serde(default)]
    pub content: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Stream collection
// ────────────────────────────────────────────────────────────────────────────

/// Accumulates a streamed response, splitting NDJSON lines across network
/// chunk boundaries.
#[derive(Debug)]
pub(crate) struct StreamCollector {
    started: Instant,
    pending: Vec<u8>,
    text: String,
    first_token: Option<Duration>,
    deltas: u32,
    eval_count: Option<u64>,
    eval_duration: Option<u64>,
}

impl StreamCollector {
    pub(crate) fn new(started: Instant) -> Self {
        Self {
            started,
            pending: Vec::new(),
            text: String::new(),
            first_token: None,
            deltas: 0,
            eval_count: None,
            eval_duration: None,
        }
    }

    /// Consume raw bytes, handling every complete line.
    pub(crate) fn feed(&mut self, bytes: &[u8]) -> Result<()> {
        self.pending.extend_from_slice(bytes);
        while let Some(newline) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=newline).collect();
            self.handle_line(&line)?;
        }
        Ok(())
    }

    /// Flush a trailing unterminated line and compute metrics.
    pub(crate) fn finish(mut self, total: Duration) -> Result<InferenceResult> {
        if !self.pending.is_empty() {
            let line = std::mem::take(&mut self.pending);
            self.handle_line(&line)?;
        }

        let first_token = self.first_token.unwrap_or(total);
        let token_count = self
            .eval_count
            .map_or(self.deltas, |count| u32::try_from(count).unwrap_or(u32::MAX));

        let metrics = match (self.eval_count, self.eval_duration) {
            (Some(count), Some(nanos)) if nanos > 0 => PerformanceMetrics {
                tokens_per_second: count as f64 / (nanos as f64 / 1e9),
                time_to_first_token_ms: first_token.as_secs_f64() * 1000.0,
                total_latency_ms: total.as_secs_f64() * 1000.0,
                token_count,
            },
            _ => PerformanceMetrics::from_timing(token_count, first_token, total),
        };

        Ok(InferenceResult {
            response: self.text,
            metrics,
        })
    }

    fn handle_line(&mut self, line: &[u8]) -> Result<()> {
        let text = String::from_utf8_lossy(line);
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(());
        }

        let chunk: OllamaChatChunk = serde_json::from_str(trimmed)?;
        if let Some(error) = chunk.error {
            return Err(Error::ProviderApi(error));
        }
        if let Some(message) = chunk.message
            && !message.content.is_empty()
        {
            if self.first_token.is_none() {
                self.first_token = Some(self.started.elapsed());
            }
            self.deltas += 1;
            self.text.push_str(&message.content);
        }
        if chunk.done {
            self.eval_count = chunk.eval_count;
            self.eval_duration = chunk.eval_duration;
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// OllamaClient
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct LoadedModel {
    name: String,
    threads: u32,
    context_size: u32,
}

/// Ollama inference backend.
///
/// The model "path" is the Ollama model tag, e.g. `llama3.1:8b`.
pub struct OllamaClient {
    base_url: String,
    client: reqwest::Client,
    model: RwLock<Option<LoadedModel>>,
    conversation: Conversation,
}

impl OllamaClient {
    /// Create a new Ollama client with default URL (localhost:11434).
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a new Ollama client with a custom base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            model: RwLock::new(None),
            conversation: Conversation::new(),
        }
    }

    /// Get the base URL for this client.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the locally available models from `/api/tags`.
    pub async fn list_models(&self) -> Result<Vec<OllamaModel>> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(Error::ProviderApi(format!(
                "Ollama API returned status {}",
                response.status()
            )));
        }

        let tags: OllamaTagsResponse = response.json().await?;
        Ok(tags.models)
    }

    fn loaded(&self) -> Option<LoadedModel> {
        self.model
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Send one streaming chat request and collect the reply.
    async fn chat(
        &self,
        model: &LoadedModel,
        messages: Vec<ChatMessage>,
        config: &Configuration,
    ) -> Result<InferenceResult> {
        let url = format!("{}/api/chat", self.base_url);
        let request = OllamaChatRequest {
            model: &model.name,
            messages,
            stream: true,
            options: OllamaOptions::new(config, model.threads, model.context_size),
        };

        let started = Instant::now();
        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::ProviderApi(format!(
                "Ollama API returned {}: {}",
                status, body
            )));
        }

        let mut collector = StreamCollector::new(started);
        let mut stream = response.bytes_stream();
        while let Some(bytes) = stream.next().await {
            collector.feed(&bytes?)?;
        }
        collector.finish(started.elapsed())
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InferenceClient for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    #[instrument(skip(self, system_prompt), level = "debug")]
    async fn load_model(
        &self,
        model: &Path,
        system_prompt: &str,
        threads: u32,
        context_size: u32,
    ) -> std::result::Result<(), InferenceError> {
        let name = model.to_string_lossy().into_owned();
        let available = self.list_models().await?;
        if !available.iter().any(|m| m.matches(&name)) {
            return Err(Error::ModelNotFound(name).into());
        }

        info!(model = %name, "ollama model ready");
        *self.model.write().unwrap_or_else(PoisonError::into_inner) = Some(LoadedModel {
            name,
            threads,
            context_size,
        });
        self.conversation.reset(system_prompt);
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.loaded().is_some()
    }

    async fn run_inference(
        &self,
        prompt: &str,
        config: &Configuration,
        cancel: &CancellationToken,
    ) -> std::result::Result<InferenceResult, InferenceError> {
        let model = self.loaded().ok_or(InferenceError::ModelNotLoaded)?;
        let messages = self.conversation.with_user_turn(prompt);

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(InferenceError::Cancelled),
            result = self.chat(&model, messages, config) => result?,
        };

        debug!(
            tokens = result.metrics.token_count,
            tokens_per_second = result.metrics.tokens_per_second,
            "ollama inference complete"
        );
        self.conversation.record_exchange(prompt, &result.response);
        Ok(result)
    }

    async fn reset_conversation(&self, system_prompt: &str) {
        self.conversation.reset(system_prompt);
    }
}
