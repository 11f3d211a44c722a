//! # ristbond-process
//!
//! The process supervisor: spawns external programs from
//! [`ristbond_av::ProcessSpec`]s, pumps their output into tracing and a
//! per-process log file, probes liveness without blocking, and stops them
//! with a graceful signal followed by a forced kill after a grace period.

pub mod handle;
#[cfg(unix)]
mod identity;
mod log_pump;
pub mod supervisor;

pub use handle::ProcessHandle;
pub use log_pump::CHILD_TARGET;
pub use supervisor::{Supervisor, DEFAULT_GRACE};
