//! HTTP inference backends for autobench.
//!
//! Provides [`InferenceClient`](autobench_core::InferenceClient)
//! implementations for local model servers:
//!
//! - [`OllamaClient`] streams `/api/chat` and measures time to first token
//! - [`LlamaServerClient`] calls llama.cpp's OpenAI-compatible endpoint
//!
//! Both keep a [`Conversation`] so consecutive prompts share history until
//! the engine resets it.

mod error;
mod types;

pub mod providers;

pub use error::{Error, Result};
pub use providers::{BackendKind, LlamaServerClient, OllamaClient, create_client};
pub use types::{ChatMessage, Conversation, Role};
