use super::types::{
    AutobenchConfig, BackendConfig, BenchmarkConfig, DEFAULT_CONTEXT_SIZE, DEFAULT_THREADS,
    RawAutobenchConfig, RawBackendConfig, RawBenchmarkConfig, RawStorageConfig, StorageConfig,
};
use anyhow::{Context, Result};
use autobench_core::SweepConfig;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<AutobenchConfig> {
        Self::load_layers(&[Self::user_config_path(), Self::project_config_path()])
    }

    /// Merge the given files in order; missing files are skipped.
    pub fn load_layers(paths: &[PathBuf]) -> Result<AutobenchConfig> {
        let mut raw = RawAutobenchConfig::default();
        for path in paths {
            if let Some(layer) = Self::read_layer(path)? {
                debug!(path = %path.display(), "loaded config layer");
                raw = Self::merge_raw(raw, layer);
            }
        }
        Self::finalize(raw)
    }

    /// Get user config path (`$XDG_CONFIG_HOME/autobench/config.toml`)
    pub fn user_config_path() -> PathBuf {
        autobench_paths::config_dir().join("config.toml")
    }

    /// Get project config path
    /// Can be overridden with AUTOBENCH_PROJECT_CONFIG_DIR env var (useful for isolated tests)
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("AUTOBENCH_PROJECT_CONFIG_DIR") {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".autobench/config.toml")
        }
    }

    fn read_layer(path: &Path) -> Result<Option<RawAutobenchConfig>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let layer = toml::from_str(&contents)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        Ok(Some(layer))
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawAutobenchConfig, overlay: RawAutobenchConfig) -> RawAutobenchConfig {
        let mut sweep = base.sweep;
        sweep.extend(overlay.sweep);

        RawAutobenchConfig {
            backend: RawBackendConfig {
                kind: overlay.backend.kind.or(base.backend.kind),
                url: overlay.backend.url.or(base.backend.url),
                threads: overlay.backend.threads.or(base.backend.threads),
                context_size: overlay.backend.context_size.or(base.backend.context_size),
            },
            benchmark: RawBenchmarkConfig {
                system_prompt: overlay
                    .benchmark
                    .system_prompt
                    .or(base.benchmark.system_prompt),
                dataset: overlay.benchmark.dataset.or(base.benchmark.dataset),
            },
            storage: RawStorageConfig {
                database: overlay.storage.database.or(base.storage.database),
            },
            sweep,
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawAutobenchConfig) -> Result<AutobenchConfig> {
        let sweep: SweepConfig = toml::Value::Table(raw.sweep)
            .try_into()
            .context("invalid [sweep] section")?;

        Ok(AutobenchConfig {
            backend: BackendConfig {
                kind: raw.backend.kind.unwrap_or_default(),
                url: raw.backend.url,
                threads: raw.backend.threads.unwrap_or(DEFAULT_THREADS),
                context_size: raw.backend.context_size.unwrap_or(DEFAULT_CONTEXT_SIZE),
            },
            benchmark: BenchmarkConfig {
                system_prompt: raw.benchmark.system_prompt.unwrap_or_default(),
                dataset: raw.benchmark.dataset,
            },
            storage: StorageConfig {
                database: raw.storage.database,
            },
            sweep,
        })
    }
}
