//! The pipeline controller: whole-pipeline and single-path reconciliation.
//!
//! Every mutating operation takes the controller's lock for its full
//! duration, so at most one reconciliation is in flight. Public operations
//! lock once and delegate to `*_locked` helpers, which is how one operation
//! composes others (restart = stop + start, toggle = persist + start/stop)
//! without re-entering the lock.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use ristbond_av::{
    synthesize_bond_invocation, synthesize_encoder_invocation, synthesize_path_invocation,
    synthesize_relay_invocation, synthesize_sender_invocations, ProcessSpec,
};
use ristbond_core::config::WEIGHT_RANGE;
use ristbond_core::{Config, Error, Result, Role, SenderMode};
use ristbond_process::Supervisor;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};

use super::state::{PipelinePhase, PipelineState};
use super::status::PipelineStatus;
use crate::config::ConfigStore;

/// Requested change to a path's `enabled` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleAction {
    Enable,
    Disable,
    Toggle,
}

/// A sender that failed to launch during a full start.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleFailure {
    pub role: Role,
    pub error: String,
}

/// Outcome of a full start.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StartReport {
    pub failures: Vec<RoleFailure>,
}

impl StartReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Owns the pipeline's processes and serializes every change to them.
pub struct PipelineController {
    store: ConfigStore,
    supervisor: Supervisor,
    state: Mutex<PipelineState>,
    phase: RwLock<PipelinePhase>,
}

impl PipelineController {
    pub fn new(store: ConfigStore, supervisor: Supervisor) -> Self {
        Self {
            store,
            supervisor,
            state: Mutex::new(PipelineState::default()),
            phase: RwLock::new(PipelinePhase::Stopped),
        }
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    /// Current phase; never waits on an in-flight reconciliation.
    pub fn phase(&self) -> PipelinePhase {
        *self.phase.read()
    }

    fn set_phase(&self, phase: PipelinePhase) {
        let mut current = self.phase.write();
        if *current != phase {
            tracing::info!("Pipeline {} -> {}", *current, phase);
            *current = phase;
        }
    }

    async fn lock(&self) -> MutexGuard<'_, PipelineState> {
        self.state.lock().await
    }

    /// Load and validate the stored configuration.
    fn prepare(&self) -> Result<Config> {
        self.store.load()?.validated()
    }

    // -----------------------------------------------------------------------
    // Whole pipeline
    // -----------------------------------------------------------------------

    /// Launch relay, encoder, and every enabled path from the stored config.
    ///
    /// Anything already running is stopped first. Relay or encoder launch
    /// failures abort the start and leave the pipeline stopped; a path that
    /// fails to launch is reported and the rest carry on.
    pub async fn start_all(&self) -> Result<StartReport> {
        let mut state = self.lock().await;
        let config = self.prepare()?;
        self.start_locked(&mut state, config).await
    }

    /// Terminate every tracked process, enabled or not.
    pub async fn stop_all(&self) {
        let mut state = self.lock().await;
        self.stop_locked(&mut state).await;
    }

    /// Full stop then start from the stored configuration, as one operation.
    pub async fn restart_all(&self) -> Result<StartReport> {
        let mut state = self.lock().await;
        let config = self.prepare()?;
        self.stop_locked(&mut state).await;
        self.start_locked(&mut state, config).await
    }

    /// Re-read the store and apply it. A broken file leaves processes alone.
    pub async fn reload_from_store(&self) -> Result<StartReport> {
        tracing::info!("Reloading configuration from {}", self.store.path().display());
        self.restart_all().await
    }

    /// Replace the stored document and restart everything from it.
    ///
    /// Text that does not parse or validate is rejected with
    /// [`Error::InvalidConfig`] before anything is persisted or stopped.
    pub async fn save_and_restart_all(&self, text: &str) -> Result<StartReport> {
        let config = Config::from_yaml(text)
            .and_then(Config::validated)
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;

        let mut state = self.lock().await;
        self.store.save_text(text)?;
        tracing::info!("Saved new configuration, restarting pipeline");
        self.stop_locked(&mut state).await;
        self.start_locked(&mut state, config).await
    }

    async fn start_locked(&self, state: &mut PipelineState, config: Config) -> Result<StartReport> {
        // Synthesize everything before touching a process.
        let relay = synthesize_relay_invocation(&config);
        let encoder = synthesize_encoder_invocation(&config)?;
        let senders = match synthesize_sender_invocations(&config) {
            Ok(specs) => specs,
            Err(Error::NoEnabledSenders) => {
                tracing::warn!("No enabled senders; starting without a bonding process");
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        self.set_phase(PipelinePhase::Starting);
        self.terminate_all(state).await;
        state.held.clear();

        let mandatory = relay.iter().chain(std::iter::once(&encoder));
        for spec in mandatory {
            if let Err(e) = self.launch_into(state, spec) {
                tracing::error!("{} failed to start: {e}", spec.role);
                self.terminate_all(state).await;
                state.applied = None;
                self.set_phase(PipelinePhase::Stopped);
                return Err(e);
            }
        }

        let mut report = StartReport::default();
        for spec in &senders {
            if let Err(e) = self.launch_into(state, spec) {
                tracing::warn!("{} failed to start: {e}", spec.role);
                report.failures.push(RoleFailure {
                    role: spec.role,
                    error: e.to_string(),
                });
            }
        }

        state.applied = Some(config);
        self.set_phase(if report.is_clean() {
            PipelinePhase::Running
        } else {
            PipelinePhase::Degraded
        });
        Ok(report)
    }

    async fn stop_locked(&self, state: &mut PipelineState) {
        self.set_phase(PipelinePhase::Stopping);
        self.terminate_all(state).await;
        state.held.clear();
        state.applied = None;
        self.set_phase(PipelinePhase::Stopped);
    }

    async fn terminate_all(&self, state: &mut PipelineState) {
        while let Some(handle) = state.pop_last() {
            self.supervisor.terminate(&handle).await;
        }
    }

    fn launch_into(&self, state: &mut PipelineState, spec: &ProcessSpec) -> Result<()> {
        let handle = self.supervisor.launch(spec)?;
        state.handles.insert(spec.role, handle);
        Ok(())
    }

    /// Launch `spec`, first terminating whatever holds its role.
    async fn replace(&self, state: &mut PipelineState, spec: &ProcessSpec) -> Result<()> {
        if let Some(old) = state.handles.remove(&spec.role) {
            tracing::debug!("{} already running (pid {}), restarting", spec.role, old.pid());
            self.supervisor.terminate(&old).await;
        }
        self.launch_into(state, spec)
    }

    // -----------------------------------------------------------------------
    // Single path
    // -----------------------------------------------------------------------

    /// (Re)launch the process carrying path `index`, leaving every other
    /// role untouched.
    ///
    /// The stored config is validated first. While the pipeline runs, the
    /// path must read the loopback port the encoder was started with.
    pub async fn start_sender(&self, index: usize) -> Result<()> {
        let mut state = self.lock().await;
        self.start_sender_locked(&mut state, index).await
    }

    /// Stop path `index` only.
    pub async fn stop_sender(&self, index: usize) -> Result<()> {
        let mut state = self.lock().await;
        self.stop_sender_locked(&mut state, index).await
    }

    async fn start_sender_locked(&self, state: &mut PipelineState, index: usize) -> Result<()> {
        let config = self.prepare()?;
        let len = config.rist.senders.len();
        let sender = config
            .rist
            .senders
            .get(index)
            .ok_or(Error::BadIndex { index, len })?;
        if !sender.enabled {
            return Err(Error::SenderDisabled(index));
        }
        check_wiring(state, &config, index)?;
        state.held.remove(&index);

        let result = match config.rist.mode {
            SenderMode::PerPath => {
                let spec = synthesize_path_invocation(&config, index)?
                    .ok_or(Error::SenderDisabled(index))?;
                self.replace(state, &spec).await
            }
            SenderMode::Single => self.relaunch_bond(state, &config, true).await,
        };
        self.refresh_phase(state, &config);
        result
    }

    async fn stop_sender_locked(&self, state: &mut PipelineState, index: usize) -> Result<()> {
        let config = self.store.load()?;
        let len = config.rist.senders.len();
        let enabled = config
            .rist
            .senders
            .get(index)
            .ok_or(Error::BadIndex { index, len })?
            .enabled;

        // Rebuilding the bond launches a process, so the config must hold up.
        let rebuild_bond =
            config.rist.mode == SenderMode::Single && state.handles.contains_key(&Role::Bond);
        let config = if rebuild_bond {
            let config = config.validated()?;
            check_wiring(state, &config, index)?;
            config
        } else {
            config
        };

        if enabled {
            state.held.insert(index);
        }
        if rebuild_bond {
            self.relaunch_bond(state, &config, false).await?;
        } else if let Some(handle) = state.handles.remove(&Role::Sender(index)) {
            self.supervisor.terminate(&handle).await;
        }
        self.refresh_phase(state, &config);
        Ok(())
    }

    /// Rebuild the single-shape bonding process without held paths.
    ///
    /// With no paths left the process is stopped. `launch_if_absent`
    /// distinguishes "bring it up" from "only adjust a running one".
    async fn relaunch_bond(
        &self,
        state: &mut PipelineState,
        config: &Config,
        launch_if_absent: bool,
    ) -> Result<()> {
        if !launch_if_absent && !state.handles.contains_key(&Role::Bond) {
            return Ok(());
        }
        match synthesize_bond_invocation(config, &state.held) {
            Ok(spec) => self.replace(state, &spec).await,
            Err(Error::NoEnabledSenders) => {
                if let Some(handle) = state.handles.remove(&Role::Bond) {
                    tracing::info!("No paths left for the bonding process, stopping it");
                    self.supervisor.terminate(&handle).await;
                }
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Recompute Running/Degraded after a single-path change.
    fn refresh_phase(&self, state: &PipelineState, config: &Config) {
        if !self.phase().is_active() {
            return;
        }
        let expected: Vec<usize> = config
            .rist
            .senders
            .iter()
            .enumerate()
            .filter(|(i, s)| s.enabled && !state.held.contains(i))
            .map(|(i, _)| i)
            .collect();
        let paths_up = match config.rist.mode {
            SenderMode::PerPath => expected.iter().all(|&i| state.is_alive(Role::Sender(i))),
            SenderMode::Single => expected.is_empty() || state.is_alive(Role::Bond),
        };
        self.set_phase(if paths_up {
            PipelinePhase::Running
        } else {
            PipelinePhase::Degraded
        });
    }

    // -----------------------------------------------------------------------
    // Config edits that touch one path
    // -----------------------------------------------------------------------

    /// Flip a path's `enabled` flag: persist first, then apply.
    ///
    /// Disabling always stops the path. Enabling starts it only while the
    /// pipeline is running; otherwise the edit waits for the next full start.
    /// The edited config must validate, and a path the running encoder does
    /// not feed is refused with [`Error::RestartRequired`]; neither case
    /// persists anything.
    pub async fn toggle_sender(&self, index: usize, action: ToggleAction) -> Result<bool> {
        let mut state = self.lock().await;
        let mut config = self.store.load()?;
        let len = config.rist.senders.len();
        let sender = config
            .rist
            .senders
            .get_mut(index)
            .ok_or(Error::BadIndex { index, len })?;

        let enable = match action {
            ToggleAction::Enable => true,
            ToggleAction::Disable => false,
            ToggleAction::Toggle => !sender.enabled,
        };
        sender.enabled = enable;
        let config = config.validated()?;
        if enable && self.phase().is_active() {
            check_wiring(&state, &config, index)?;
        }
        self.store.save(&config)?;
        tracing::info!("sender[{index}] {}", if enable { "enabled" } else { "disabled" });

        if enable {
            if self.phase().is_active() {
                self.start_sender_locked(&mut state, index).await?;
            }
        } else {
            state.held.remove(&index);
            self.stop_sender_locked(&mut state, index).await?;
        }
        Ok(enable)
    }

    /// Change a path's weight: persist first, then restart only that path if
    /// it is currently carrying traffic. Refused without persisting under the
    /// same conditions as [`Self::toggle_sender`].
    pub async fn set_sender_weight(&self, index: usize, weight: i64) -> Result<()> {
        if !WEIGHT_RANGE.contains(&weight) {
            return Err(Error::WeightOutOfRange(weight));
        }
        let weight = u32::try_from(weight).map_err(|_| Error::WeightOutOfRange(weight))?;

        let mut state = self.lock().await;
        let mut config = self.store.load()?;
        let len = config.rist.senders.len();
        let sender = config
            .rist
            .senders
            .get_mut(index)
            .ok_or(Error::BadIndex { index, len })?;
        sender.weight = weight;
        let live = sender.enabled && !state.held.contains(&index);
        let config = config.validated()?;
        let relaunch = live && self.phase().is_active();
        if relaunch {
            check_wiring(&state, &config, index)?;
        }
        self.store.save(&config)?;
        tracing::info!("sender[{index}] weight set to {weight}");

        if relaunch {
            self.start_sender_locked(&mut state, index).await?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Snapshot of every role. Waits for an in-flight reconciliation.
    pub async fn get_status(&self) -> PipelineStatus {
        let state = self.lock().await;
        let config = match self.store.load() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Status falls back to the applied config: {e}");
                state.applied.clone().unwrap_or_default()
            }
        };
        PipelineStatus::collect(self.phase(), &config, &state)
    }

    /// Pids of every tracked handle, live or exited.
    pub async fn pids(&self) -> BTreeMap<Role, u32> {
        let state = self.lock().await;
        state
            .handles
            .iter()
            .map(|(role, handle)| (*role, handle.pid()))
            .collect()
    }

    /// Synthesized invocations for the stored config, without launching.
    pub fn planned_invocations(&self) -> Result<Vec<ProcessSpec>> {
        plan(&self.prepare()?)
    }
}

/// Reject a single-path launch whose loopback input is not what the running
/// encoder was started with. Nothing is running when `applied` is unset.
fn check_wiring(state: &PipelineState, config: &Config, index: usize) -> Result<()> {
    let Some(applied) = state.applied.as_ref() else {
        return Ok(());
    };
    if applied.rist.mode != config.rist.mode {
        return Err(Error::RestartRequired(format!(
            "sender shape changed from {:?} to {:?}",
            applied.rist.mode, config.rist.mode
        )));
    }
    match config.rist.mode {
        SenderMode::PerPath => {
            let fed = applied.feed_port(index);
            if fed.is_some() && fed == config.feed_port(index) {
                Ok(())
            } else {
                Err(Error::RestartRequired(format!(
                    "sender[{index}] is not fed by the running encoder"
                )))
            }
        }
        SenderMode::Single => {
            let (fed, wanted) = (applied.tee.ingress_port(), config.tee.ingress_port());
            if fed == wanted {
                Ok(())
            } else {
                Err(Error::RestartRequired(format!(
                    "bond now reads port {wanted} but the encoder feeds {fed}"
                )))
            }
        }
    }
}

/// Every invocation a full start of `config` would launch, in start order.
pub fn plan(config: &Config) -> Result<Vec<ProcessSpec>> {
    let mut specs: Vec<ProcessSpec> = synthesize_relay_invocation(config).into_iter().collect();
    specs.push(synthesize_encoder_invocation(config)?);
    match synthesize_sender_invocations(config) {
        Ok(senders) => specs.extend(senders),
        Err(Error::NoEnabledSenders) => {}
        Err(e) => return Err(e),
    }
    Ok(specs)
}

impl std::fmt::Debug for PipelineController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineController")
            .field("store", &self.store)
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}
