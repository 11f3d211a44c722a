//! Configuration persistence: YAML on disk, replaced atomically.

use std::io::Write;
use std::path::{Path, PathBuf};

use ristbond_core::{Config, Error, Result};

/// Bundled default document, written on first start.
pub const DEFAULT_CONFIG: &str = include_str!("../../config.default.yml");

/// File-backed configuration store.
///
/// Saves go through a temporary file in the same directory that is renamed
/// over the target, so readers see either the old or the new document.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the bundled default if no file exists yet.
    ///
    /// Returns `true` when a new file was written.
    pub fn ensure_materialized(&self) -> Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }
        tracing::info!("No config at {}, writing bundled default", self.path.display());
        self.write_atomic(DEFAULT_CONFIG)?;
        Ok(true)
    }

    /// Raw document text, materializing the default first if needed.
    pub fn load_text(&self) -> Result<String> {
        self.ensure_materialized()?;
        std::fs::read_to_string(&self.path).map_err(|e| {
            Error::Config(format!("failed to read {}: {e}", self.path.display()))
        })
    }

    /// Parse the stored document.
    pub fn load(&self) -> Result<Config> {
        let text = self.load_text()?;
        Config::from_yaml(&text)
            .map_err(|e| Error::Config(format!("{}: {e}", self.path.display())))
    }

    /// Serialize and persist `config`.
    pub fn save(&self, config: &Config) -> Result<()> {
        let text = config.to_yaml()?;
        self.write_atomic(&text)
    }

    /// Persist raw document text as-is, keeping the operator's comments.
    pub fn save_text(&self, text: &str) -> Result<()> {
        self.write_atomic(text)
    }

    fn write_atomic(&self, text: &str) -> Result<()> {
        let dir = match self.path.parent() {
            Some(d) if !d.as_os_str().is_empty() => d.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(text.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| Error::Io { source: e.error })?;

        tracing::debug!("Saved config to {}", self.path.display());
        Ok(())
    }
}
