//! Switching a child to an unprivileged identity before exec.

use std::io;

use nix::sys::signal::{signal, SigHandler, Signal};
use nix::unistd::{setgid, setuid, Gid, Uid};

/// Runs in the forked child, between `fork` and `exec`.
///
/// Groups are dropped before the user id so the child cannot regain them.
/// SIGINT and SIGTERM go back to their default disposition only after the
/// identity switch.
pub(crate) fn switch_identity(uid: u32, gid: u32) -> io::Result<()> {
    let gid = Gid::from_raw(gid);

    #[cfg(not(any(target_os = "macos", target_os = "ios")))]
    nix::unistd::setgroups(&[gid])?;
    setgid(gid)?;
    setuid(Uid::from_raw(uid))?;

    // SAFETY: resetting to SIG_DFL installs no Rust handler.
    unsafe {
        signal(Signal::SIGINT, SigHandler::SigDfl)?;
        signal(Signal::SIGTERM, SigHandler::SigDfl)?;
    }
    Ok(())
}
