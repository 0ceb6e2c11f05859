//! Inference backends.
//!
//! Each backend implements [`InferenceClient`] over HTTP against a locally
//! running model server. [`create_client`] picks one by [`BackendKind`].
//!
//! # Example
//!
//! ```ignore
//! use autobench_models::providers::{BackendKind, create_client};
//!
//! let client = create_client(BackendKind::Ollama, None);
//! client.load_model(Path::new("llama3.1:8b"), "", 0, 0).await?;
//! ```

mod llama_server;
mod ollama;

use std::fmt;

use autobench_core::InferenceClient;
use serde::{Deserialize, Serialize};

pub use llama_server::LlamaServerClient;
pub use ollama::{OllamaClient, OllamaModel, OllamaOptions};

/// Which model server to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    #[default]
    Ollama,
    LlamaServer,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Ollama => "ollama",
            BackendKind::LlamaServer => "llama-server",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ollama" => Some(BackendKind::Ollama),
            "llama-server" => Some(BackendKind::LlamaServer),
            _ => None,
        }
    }

    /// Where the backend listens by default.
    pub fn default_url(&self) -> &'static str {
        match self {
            BackendKind::Ollama => ollama::DEFAULT_BASE_URL,
            BackendKind::LlamaServer => llama_server::DEFAULT_BASE_URL,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build a client for `kind`, falling back to its default URL.
pub fn create_client(kind: BackendKind, base_url: Option<&str>) -> Box<dyn InferenceClient> {
    let url = base_url.unwrap_or(kind.default_url());
    match kind {
        BackendKind::Ollama => Box::new(OllamaClient::with_base_url(url)),
        BackendKind::LlamaServer => Box::new(LlamaServerClient::with_base_url(url)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_kind_round_trips_through_str() {
        for kind in [BackendKind::Ollama, BackendKind::LlamaServer] {
            assert_eq!(BackendKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(BackendKind::parse("vllm"), None);
    }

    #[test]
    fn backend_kind_serde_matches_as_str() {
        let json = serde_json::to_string(&BackendKind::LlamaServer).unwrap();
        assert_eq!(json, "\"llama-server\"");
    }

    #[test]
    fn create_client_selects_backend() {
        assert_eq!(create_client(BackendKind::Ollama, None).name(), "ollama");
        assert_eq!(
            create_client(BackendKind::LlamaServer, Some("http://gpu-box:8080")).name(),
            "llama-server"
        );
    }
}
