//! Process table and coarse lifecycle phase of the pipeline.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use ristbond_core::{Config, Role};
use ristbond_process::ProcessHandle;
use serde::Serialize;

/// Whole-pipeline lifecycle phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelinePhase {
    #[default]
    Stopped,
    Starting,
    Running,
    Stopping,
    /// Running, but at least one enabled path failed to launch.
    Degraded,
}

impl PipelinePhase {
    /// Whether single-path edits should be applied to live processes.
    pub fn is_active(self) -> bool {
        matches!(self, PipelinePhase::Running | PipelinePhase::Degraded)
    }
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelinePhase::Stopped => "stopped",
            PipelinePhase::Starting => "starting",
            PipelinePhase::Running => "running",
            PipelinePhase::Stopping => "stopping",
            PipelinePhase::Degraded => "degraded",
        };
        f.write_str(s)
    }
}

/// Role to handle mapping, owned by the controller and only touched under
/// its lock.
#[derive(Debug, Default)]
pub struct PipelineState {
    pub(crate) handles: BTreeMap<Role, ProcessHandle>,
    /// Enabled paths an operator stopped explicitly; cleared by a full start.
    pub(crate) held: BTreeSet<usize>,
    /// Configuration the running processes were synthesized from.
    pub(crate) applied: Option<Config>,
}

impl PipelineState {
    pub(crate) fn handle(&self, role: Role) -> Option<&ProcessHandle> {
        self.handles.get(&role)
    }

    pub(crate) fn is_alive(&self, role: Role) -> bool {
        self.handle(role).is_some_and(ProcessHandle::is_alive)
    }

    /// Remove the most recently started handle (reverse start order).
    pub(crate) fn pop_last(&mut self) -> Option<ProcessHandle> {
        self.handles.pop_last().map(|(_, handle)| handle)
    }
}
