//! Read-only status snapshots of the pipeline.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use ristbond_core::{Config, Role, RoleStatus, SenderMode};
use ristbond_process::ProcessHandle;
use serde::Serialize;

use super::state::{PipelinePhase, PipelineState};

/// Process details for one role.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleReport {
    pub status: RoleStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

impl RoleReport {
    fn disabled() -> Self {
        Self {
            status: RoleStatus::Disabled,
            pid: None,
            started_at: None,
            exit_code: None,
        }
    }

    fn from_handle(handle: Option<&ProcessHandle>) -> Self {
        match handle {
            Some(h) if h.is_alive() => Self {
                status: RoleStatus::Running,
                pid: Some(h.pid()),
                started_at: Some(h.started_at()),
                exit_code: None,
            },
            Some(h) => Self {
                status: RoleStatus::Stopped,
                pid: None,
                started_at: None,
                exit_code: h.exit_code(),
            },
            None => Self {
                status: RoleStatus::Stopped,
                pid: None,
                started_at: None,
                exit_code: None,
            },
        }
    }
}

/// One configured bonded path and the state of the process carrying it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SenderReport {
    pub index: usize,
    pub cname: String,
    pub enabled: bool,
    pub weight: u32,
    pub virt_ip: String,
    pub virt_port: u16,
    /// Stopped by the operator while enabled.
    pub held: bool,
    #[serde(flatten)]
    pub process: RoleReport,
}

/// Full pipeline snapshot returned by the status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineStatus {
    pub phase: PipelinePhase,
    pub mode: SenderMode,
    pub relay: RoleReport,
    pub encoder: RoleReport,
    /// The shared bonding process, in the single shape only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bond: Option<RoleReport>,
    pub senders: Vec<SenderReport>,
}

impl PipelineStatus {
    pub(crate) fn collect(phase: PipelinePhase, config: &Config, state: &PipelineState) -> Self {
        let mode = config.rist.mode;
        let relay = if config.mediamtx.enable {
            RoleReport::from_handle(state.handle(Role::Relay))
        } else {
            RoleReport::disabled()
        };
        let bond = (mode == SenderMode::Single)
            .then(|| RoleReport::from_handle(state.handle(Role::Bond)));

        let senders = (0..config.rist.senders.len())
            .filter_map(|i| config.resolved_sender(i))
            .map(|s| {
                let held = state.held.contains(&s.index);
                let process = if !s.enabled {
                    RoleReport::disabled()
                } else {
                    match (&bond, mode) {
                        (Some(bond), SenderMode::Single) if !held => bond.clone(),
                        (_, SenderMode::Single) => RoleReport::from_handle(None),
                        (_, SenderMode::PerPath) => {
                            RoleReport::from_handle(state.handle(Role::Sender(s.index)))
                        }
                    }
                };
                SenderReport {
                    index: s.index,
                    cname: s.cname,
                    enabled: s.enabled,
                    weight: s.weight,
                    virt_ip: s.virt_ip,
                    virt_port: s.virt_port,
                    held,
                    process,
                }
            })
            .collect();

        Self {
            phase,
            mode,
            relay,
            encoder: RoleReport::from_handle(state.handle(Role::Encoder)),
            bond,
            senders,
        }
    }

    /// Flat `role -> running|stopped|disabled` view.
    pub fn roles(&self) -> BTreeMap<String, RoleStatus> {
        let mut roles = BTreeMap::new();
        roles.insert(Role::Relay.to_string(), self.relay.status);
        roles.insert(Role::Encoder.to_string(), self.encoder.status);
        if let Some(ref bond) = self.bond {
            roles.insert(Role::Bond.to_string(), bond.status);
        }
        for s in &self.senders {
            roles.insert(Role::Sender(s.index).to_string(), s.process.status);
        }
        roles
    }

    pub fn sender(&self, index: usize) -> Option<&SenderReport> {
        self.senders.get(index)
    }
}
