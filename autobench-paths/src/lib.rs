//! XDG Base Directory paths for autobench.
//!
//! Uses XDG paths on every platform rather than platform-native ones, so
//! `~/.config/autobench` is the same place on Linux and macOS.

use std::path::PathBuf;

const APP_DIR: &str = "autobench";

/// Get the autobench config directory.
///
/// Returns `$XDG_CONFIG_HOME/autobench` if set, otherwise
/// `~/.config/autobench`.
///
/// # Examples
///
/// ```
/// use autobench_paths::config_dir;
///
/// let config_file = config_dir().join("config.toml");
/// ```
pub fn config_dir() -> PathBuf {
    xdg_dir("XDG_CONFIG_HOME", ".config")
}

/// Get the autobench data directory.
///
/// Returns `$XDG_DATA_HOME/autobench` if set, otherwise
/// `~/.local/share/autobench`. Benchmark databases live here.
pub fn data_dir() -> PathBuf {
    xdg_dir("XDG_DATA_HOME", ".local/share")
}

/// Default location of the results database.
pub fn default_database() -> PathBuf {
    data_dir().join("telemetry.db")
}

fn xdg_dir(env: &str, home_relative: &str) -> PathBuf {
    match std::env::var(env) {
        Ok(base) if !base.is_empty() => PathBuf::from(base).join(APP_DIR),
        _ => dirs::home_dir()
            .map(|home| home.join(home_relative))
            .unwrap_or_else(|| PathBuf::from(home_relative))
            .join(APP_DIR),
    }
}
