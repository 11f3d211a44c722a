//! Launching and terminating external processes.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use ristbond_av::ProcessSpec;
use ristbond_core::{Error, Result};
use tokio::process::Command;
use tokio::time::Instant;

use crate::handle::ProcessHandle;
use crate::log_pump;

/// Grace period between the stop signal and a forced kill.
pub const DEFAULT_GRACE: Duration = Duration::from_secs(5);

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const KILL_REAP_TIMEOUT: Duration = Duration::from_secs(2);

/// Starts and stops external processes and wires up their logs.
///
/// The supervisor itself holds no process table; callers own the returned
/// [`ProcessHandle`]s.
#[derive(Debug, Clone)]
pub struct Supervisor {
    log_dir: PathBuf,
    grace: Duration,
}

impl Supervisor {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
            grace: DEFAULT_GRACE,
        }
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Per-process log file for `name`.
    pub fn log_path(&self, name: &str) -> PathBuf {
        self.log_dir.join(format!("{name}.log"))
    }

    /// Spawn the process described by `spec`.
    ///
    /// The child gets its own process group, piped output feeding a log pump,
    /// and, when `spec` carries an identity, switches to it before exec.
    /// Must be called from within a Tokio runtime.
    pub fn launch(&self, spec: &ProcessSpec) -> Result<ProcessHandle> {
        let launch_err = |what: &str, e: std::io::Error| Error::launch(&spec.name, format!("{what}: {e}"));

        std::fs::create_dir_all(&self.log_dir)
            .map_err(|e| launch_err("create log directory", e))?;
        let mut log_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_path(&spec.name))
            .map_err(|e| launch_err("open log file", e))?;

        let command_line = spec.command_line();
        tracing::info!("[START] {}: {}", spec.name, command_line);
        let _ = writeln!(log_file, "[START] {command_line}");

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .envs(&spec.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(ref dir) = spec.working_dir {
            cmd.current_dir(dir);
        }

        #[cfg(unix)]
        {
            cmd.process_group(0);
            if let Some(identity) = spec.identity {
                let (uid, gid) = (identity.uid, identity.gid);
                tracing::debug!("{} will run as uid={uid} gid={gid}", spec.name);
                // SAFETY: the hook only issues async-signal-safe syscalls.
                unsafe {
                    cmd.pre_exec(move || crate::identity::switch_identity(uid, gid));
                }
            }
        }

        let mut child = cmd.spawn().map_err(|e| {
            let _ = writeln!(log_file, "[ERROR] spawn failed: {e}");
            tracing::error!("[ERROR] {}: spawn failed: {e}", spec.name);
            launch_err(&format!("spawn {}", spec.program.display()), e)
        })?;

        let pid = child
            .id()
            .ok_or_else(|| Error::launch(&spec.name, "process exited before its pid was read"))?;
        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return Err(Error::launch(&spec.name, "child output was not captured"));
        };

        let _ = writeln!(log_file, "[PID] {pid}");

        let pump = log_pump::spawn(
            spec.name.clone(),
            stdout,
            stderr,
            tokio::fs::File::from_std(log_file),
        );

        tracing::debug!("{} started with pid {pid}", spec.name);
        Ok(ProcessHandle::new(pid, spec.name.clone(), spec.role, child, pump))
    }

    /// Stop a process: SIGTERM, wait up to the grace period, then SIGKILL.
    ///
    /// Idempotent. An already-exited handle only has its log pump drained.
    /// Returns the observed exit status, if the process could be reaped.
    pub async fn terminate(&self, handle: &ProcessHandle) -> Option<ExitStatus> {
        if let Some(status) = handle.poll() {
            handle.finish_pump().await;
            return Some(status);
        }

        tracing::info!("[STOP] {} (pid {})", handle.name(), handle.pid());
        signal_group(handle.pid(), Stop::Graceful);

        let deadline = Instant::now() + self.grace;
        let mut status = wait_until(handle, deadline, POLL_INTERVAL).await;

        if status.is_none() {
            tracing::warn!(
                "[KILL] {} (pid {}) ignored SIGTERM for {:?}",
                handle.name(),
                handle.pid(),
                self.grace
            );
            signal_group(handle.pid(), Stop::Forced);
            handle.start_kill();
            status = wait_until(handle, Instant::now() + KILL_REAP_TIMEOUT, Duration::from_millis(20)).await;
            if status.is_none() {
                tracing::error!("{} (pid {}) could not be reaped", handle.name(), handle.pid());
            }
        }

        handle.finish_pump().await;
        status
    }

    /// Non-blocking liveness probe.
    pub fn is_alive(&self, handle: &ProcessHandle) -> bool {
        handle.is_alive()
    }
}

async fn wait_until(handle: &ProcessHandle, deadline: Instant, step: Duration) -> Option<ExitStatus> {
    loop {
        if let Some(status) = handle.poll() {
            return Some(status);
        }
        let now = Instant::now();
        if now >= deadline {
            return None;
        }
        tokio::time::sleep(step.min(deadline - now)).await;
    }
}

#[derive(Debug, Clone, Copy)]
enum Stop {
    Graceful,
    Forced,
}

/// Signal the child's process group, falling back to the pid alone.
#[cfg(unix)]
fn signal_group(pid: u32, stop: Stop) {
    use nix::sys::signal::{kill, killpg, Signal};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return;
    };
    let sig = match stop {
        Stop::Graceful => Signal::SIGTERM,
        Stop::Forced => Signal::SIGKILL,
    };
    let pid = Pid::from_raw(raw);
    if killpg(pid, sig).is_err() {
        if let Err(e) = kill(pid, sig) {
            tracing::debug!("{sig:?} to pid {raw} failed: {e}");
        }
    }
}

#[cfg(not(unix))]
fn signal_group(_pid: u32, _stop: Stop) {}
