//! Structured description of an external process to launch.

use std::collections::BTreeMap;
use std::path::PathBuf;

use ristbond_core::Role;
use serde::Serialize;

/// Target identity a child switches to before exec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub uid: u32,
    pub gid: u32,
}

impl Identity {
    /// `None` when both ids are zero, meaning "keep the current identity".
    pub fn from_ids(uid: u32, gid: u32) -> Option<Self> {
        (uid != 0 || gid != 0).then_some(Self { uid, gid })
    }
}

/// A fully-resolved process invocation: program, argv, and launch metadata.
///
/// Specs are plain values; nothing is spawned until the supervisor receives
/// one. Two specs built from equal configurations compare equal.
///
/// # Example
///
/// ```
/// use ristbond_av::ProcessSpec;
/// use ristbond_core::Role;
///
/// let mut spec = ProcessSpec::new(Role::Relay, "mediamtx");
/// spec.arg("/app/mediamtx.yml");
/// assert_eq!(spec.command_line(), "mediamtx /app/mediamtx.yml");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessSpec {
    pub role: Role,
    /// Name used for the per-process log file.
    pub name: String,
    pub program: PathBuf,
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<Identity>,
}

impl ProcessSpec {
    pub fn new(role: Role, program: impl Into<PathBuf>) -> Self {
        Self {
            role,
            name: role.process_name(),
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: BTreeMap::new(),
            identity: None,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    pub fn working_dir(&mut self, dir: impl Into<PathBuf>) -> &mut Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn env(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn identity(&mut self, identity: Option<Identity>) -> &mut Self {
        self.identity = identity;
        self
    }

    /// Render the invocation on one line for logs. Arguments containing
    /// whitespace or shell metacharacters are single-quoted.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.to_string_lossy().into_owned())
            .chain(self.args.iter().map(|a| quote(a)))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=+,@%".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
