//! External tool detection.
//!
//! The [`ToolRegistry`] resolves the three programs the appliance drives
//! (ffmpeg, ristsender, mediamtx) so startup can report what is missing
//! before the pipeline is launched.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ristbond_core::config::ToolsConfig;
use serde::Serialize;

/// Known tool names that the registry manages.
pub const KNOWN_TOOLS: &[&str] = &["ffmpeg", "ristsender", "mediamtx"];

/// Availability information for a tool, returned by [`ToolRegistry::check_all`].
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub available: bool,
    /// First line of the tool's version output, if it printed one.
    pub version: Option<String>,
    pub path: Option<PathBuf>,
}

/// Registry of resolved tool paths.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, PathBuf>,
}

impl ToolRegistry {
    /// Resolve each known tool from its configured path or from `PATH`.
    ///
    /// A configured path is used as-is when it exists; otherwise it is handed
    /// to [`which::which`], which accepts both bare names and full paths.
    /// Tools that cannot be found are omitted.
    pub fn discover(tools_config: &ToolsConfig) -> Self {
        let mut tools = HashMap::new();

        for &name in KNOWN_TOOLS {
            let configured = match name {
                "ffmpeg" => tools_config.ffmpeg(),
                "ristsender" => tools_config.ristsender(),
                _ => tools_config.mediamtx(),
            };

            let resolved = if configured.is_absolute() && configured.exists() {
                Some(configured)
            } else {
                which::which(&configured)
                    .or_else(|_| which::which(name))
                    .ok()
            };

            match resolved {
                Some(path) => {
                    tracing::debug!(tool = name, path = %path.display(), "Tool resolved");
                    tools.insert(name.to_string(), path);
                }
                None => tracing::debug!(tool = name, "Tool not found"),
            }
        }

        Self { tools }
    }

    /// Resolved path for `name`, if it was found.
    pub fn path(&self, name: &str) -> Option<&Path> {
        self.tools.get(name).map(PathBuf::as_path)
    }

    /// Names of known tools that could not be resolved.
    pub fn missing(&self) -> Vec<&'static str> {
        KNOWN_TOOLS
            .iter()
            .copied()
            .filter(|name| !self.tools.contains_key(*name))
            .collect()
    }

    /// Check all known tools and return availability information.
    pub fn check_all(&self) -> Vec<ToolInfo> {
        KNOWN_TOOLS
            .iter()
            .map(|&name| match self.tools.get(name) {
                Some(path) => ToolInfo {
                    name: name.to_string(),
                    available: true,
                    version: detect_version(name, path),
                    path: Some(path.clone()),
                },
                None => ToolInfo {
                    name: name.to_string(),
                    available: false,
                    version: None,
                    path: None,
                },
            })
            .collect()
    }
}

/// Run the tool's version flag and return the first non-empty output line.
fn detect_version(name: &str, path: &Path) -> Option<String> {
    let version_arg = match name {
        "ffmpeg" => "-version",
        _ => "--version",
    };

    let output = std::process::Command::new(path)
        .arg(version_arg)
        .stdin(std::process::Stdio::null())
        .output()
        .ok()?;

    // ristsender prints its banner on stderr.
    let first = [&output.stdout, &output.stderr]
        .into_iter()
        .find_map(|bytes| first_line(&String::from_utf8_lossy(bytes)));
    first
}

fn first_line(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
}
