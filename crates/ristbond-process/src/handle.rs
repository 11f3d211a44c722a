//! Handle to one supervised child process.

use std::process::ExitStatus;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use ristbond_core::Role;
use tokio::process::Child;
use tokio::task::JoinHandle;

/// How long to wait for a log pump to drain after its process exited.
const PUMP_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// A live (or recently exited) external process.
///
/// Owned by whoever launched it; dropping the handle kills the child.
#[derive(Debug)]
pub struct ProcessHandle {
    pid: u32,
    name: String,
    role: Role,
    started_at: DateTime<Utc>,
    child: Mutex<Child>,
    exit: Mutex<Option<ExitStatus>>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl ProcessHandle {
    pub(crate) fn new(
        pid: u32,
        name: String,
        role: Role,
        child: Child,
        pump: JoinHandle<()>,
    ) -> Self {
        Self {
            pid,
            name,
            role,
            started_at: Utc::now(),
            child: Mutex::new(child),
            exit: Mutex::new(None),
            pump: Mutex::new(Some(pump)),
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Non-blocking exit-status query. Returns `None` while the process runs.
    pub fn poll(&self) -> Option<ExitStatus> {
        let mut exit = self.exit.lock();
        if exit.is_some() {
            return *exit;
        }
        match self.child.lock().try_wait() {
            Ok(Some(status)) => {
                tracing::info!("[EXIT] {} (pid {}): rc={}", self.name, self.pid, code_of(status));
                *exit = Some(status);
                Some(status)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("try_wait failed for {} (pid {}): {e}", self.name, self.pid);
                None
            }
        }
    }

    pub fn is_alive(&self) -> bool {
        self.poll().is_none()
    }

    /// Last observed exit code; signals are reported as negative numbers.
    pub fn exit_code(&self) -> Option<i32> {
        (*self.exit.lock()).map(code_of)
    }

    pub(crate) fn start_kill(&self) {
        if let Err(e) = self.child.lock().start_kill() {
            tracing::debug!("start_kill for {} (pid {}): {e}", self.name, self.pid);
        }
    }

    /// Wait for the log pump to see end-of-stream, bounded.
    pub(crate) async fn finish_pump(&self) {
        let pump = self.pump.lock().take();
        if let Some(mut pump) = pump {
            if tokio::time::timeout(PUMP_DRAIN_TIMEOUT, &mut pump).await.is_err() {
                tracing::debug!("log pump for {} still open, detaching", self.name);
                pump.abort();
            }
        }
    }
}

fn code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return -sig;
        }
    }
    -1
}
