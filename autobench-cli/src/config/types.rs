use std::path::PathBuf;

use autobench_core::SweepConfig;
use autobench_models::BackendKind;
use serde::{Deserialize, Serialize};

/// Default inference thread count handed to the backend.
pub const DEFAULT_THREADS: u32 = 10;

/// Default context window handed to the backend.
pub const DEFAULT_CONTEXT_SIZE: u32 = 4096;

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawAutobenchConfig {
    #[serde(default)]
    pub backend: RawBackendConfig,

    #[serde(default)]
    pub benchmark: RawBenchmarkConfig,

    #[serde(default)]
    pub storage: RawStorageConfig,

    /// Kept as a table so layers merge per key before defaults apply.
    #[serde(default)]
    pub sweep: toml::Table,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawBackendConfig {
    pub kind: Option<BackendKind>,
    pub url: Option<String>,
    pub threads: Option<u32>,
    pub context_size: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawBenchmarkConfig {
    pub system_prompt: Option<String>,
    pub dataset: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawStorageConfig {
    pub database: Option<PathBuf>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AutobenchConfig {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub benchmark: BenchmarkConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub sweep: SweepConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub kind: BackendKind,

    /// Base URL; the backend's well-known local address when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    pub threads: u32,

    pub context_size: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::default(),
            url: None,
            threads: DEFAULT_THREADS,
            context_size: DEFAULT_CONTEXT_SIZE,
        }
    }
}

impl BackendConfig {
    pub fn effective_url(&self) -> &str {
        self.url.as_deref().unwrap_or(self.kind.default_url())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BenchmarkConfig {
    pub system_prompt: String,

    /// Dataset file; the built-in dataset when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,
}

impl StorageConfig {
    pub fn database_path(&self) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(autobench_paths::default_database)
    }
}
