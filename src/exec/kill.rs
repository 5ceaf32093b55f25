// src/exec/kill.rs

//! "Terminate a process and all of its descendants".
//!
//! On unix every command is spawned as the leader of its own process group,
//! so killing the group takes shell wrappers and their children down too.
//! If the group cannot be resolved we fall back to the single process.
//!
//! Elsewhere this is a no-op: the runner's waiter kills the child through
//! its cancel channel instead.

use crate::errors::Result;

#[cfg(unix)]
pub fn terminate_tree(pid: u32) -> Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, kill, killpg};
    use nix::unistd::{Pid, getpgid, getpgrp};
    use tracing::debug;

    use crate::errors::RorschError;

    if pid == 0 {
        return Ok(());
    }

    let target = Pid::from_raw(pid as i32);

    let result = match getpgid(Some(target)) {
        // Never signal our own group.
        Ok(pgid) if pgid != getpgrp() => {
            let result = killpg(pgid, Signal::SIGKILL);
            debug!(pid, pgid = pgid.as_raw(), ?result, "killed process group");
            result
        }
        Ok(_) | Err(_) => {
            let result = kill(target, Signal::SIGKILL);
            debug!(pid, ?result, "killed process");
            result
        }
    };

    match result {
        // Already gone; nothing left to terminate.
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(errno) => Err(RorschError::Kill {
            pid,
            message: errno.desc().to_string(),
        }),
    }
}

#[cfg(not(unix))]
pub fn terminate_tree(_pid: u32) -> Result<()> {
    Ok(())
}
