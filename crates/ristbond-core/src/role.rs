//! Logical roles in the pipeline and their reported status.

use std::fmt;

use serde::{Serialize, Serializer};

/// A logical slot in the pipeline that owns at most one live process.
///
/// Ordering is start order: the relay comes up before the encoder, which comes
/// up before any bonding sender. Teardown walks the same order in reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    /// The media relay server.
    Relay,
    /// The encoder/multiplexer feeding every loopback sink.
    Encoder,
    /// A single bonding sender emitting every enabled path (single shape).
    Bond,
    /// The bonding sender for one path (per-path shape).
    Sender(usize),
}

impl Role {
    /// Name used for the per-process log file and log tagging.
    pub fn process_name(&self) -> String {
        match self {
            Role::Relay => "mediamtx".to_string(),
            Role::Encoder => "ffmpeg".to_string(),
            Role::Bond => "rist".to_string(),
            Role::Sender(i) => format!("rist-{i}"),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Relay => f.write_str("relay"),
            Role::Encoder => f.write_str("encoder"),
            Role::Bond => f.write_str("bond"),
            Role::Sender(i) => write!(f, "sender[{i}]"),
        }
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Coarse status reported for a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleStatus {
    Running,
    Stopped,
    Disabled,
}

impl fmt::Display for RoleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RoleStatus::Running => "running",
            RoleStatus::Stopped => "stopped",
            RoleStatus::Disabled => "disabled",
        };
        f.write_str(s)
    }
}
