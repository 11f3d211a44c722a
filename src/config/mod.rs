//! Configuration location and persistence.
//!
//! The configuration types themselves live in [`ristbond_core::config`].

pub mod persist;

use std::path::{Path, PathBuf};

pub use persist::{ConfigStore, DEFAULT_CONFIG};
pub use ristbond_core::config::*;

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "CONFIG_PATH";

/// Default config location on the appliance.
pub const DEFAULT_CONFIG_PATH: &str = "/data/config.yml";

/// Pick the config path: CLI flag, then `CONFIG_PATH`, then the default.
pub fn resolve_config_path(cli: Option<&Path>) -> PathBuf {
    if let Some(path) = cli {
        return path.to_path_buf();
    }
    match std::env::var_os(CONFIG_PATH_ENV) {
        Some(p) if !p.is_empty() => PathBuf::from(p),
        _ => PathBuf::from(DEFAULT_CONFIG_PATH),
    }
}
