use std::ffi::OsStr;
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::Command;

use nix::errno::Errno;
use nix::sys::ptrace;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;

/// Handle of a traced debuggee.
///
/// The process is referenced through a pidfd, so signaling it after it was
/// reaped never reaches another process reusing its PID.
pub struct TracedProcessHandle {
    pidfd: OwnedFd,
    pid: Pid,
    kill_on_drop: bool,
}

impl TracedProcessHandle {
    /// Creates a new handle from the given process ID.
    pub fn open(pid: Pid, kill_on_drop: bool) -> crate::Result<Self> {
        let fd = Errno::result(unsafe {
            nix::libc::syscall(nix::libc::SYS_pidfd_open, pid.as_raw(), 0)
        })
        .map_err(|e| crate::Error::trace("pidfd_open", pid.as_raw() as u64, e))?;

        let pidfd = unsafe { OwnedFd::from_raw_fd(fd as RawFd) };

        Ok(Self {
            pidfd,
            pid,
            kill_on_drop,
        })
    }

    /// Returns the process ID of the process associated with this handle.
    pub const fn id(&self) -> Pid {
        self.pid
    }

    /// Returns the process ID of the process associated with this handle.
    pub const fn raw_id(&self) -> u64 {
        self.pid.as_raw() as u64
    }

    /// Sends `SIGKILL` to the process.
    ///
    /// Returns `false` if the process was already reaped.
    pub fn kill(&self) -> crate::Result<bool> {
        let res = Errno::result(unsafe {
            nix::libc::syscall(
                nix::libc::SYS_pidfd_send_signal,
                self.pidfd.as_raw_fd(),
                Signal::SIGKILL as nix::libc::c_int,
                std::ptr::null::<nix::libc::siginfo_t>(),
                0,
            )
        });

        match res {
            Ok(_) => Ok(true),
            Err(Errno::ESRCH) => Ok(false),
            Err(e) => Err(crate::Error::trace("pidfd_send_signal", self.raw_id(), e)),
        }
    }
}

impl Drop for TracedProcessHandle {
    fn drop(&mut self) {
        if self.kill_on_drop {
            match self.kill() {
                Ok(true) => tracing::debug!(pid = self.pid.as_raw(), "process killed"),
                Ok(false) => (),
                Err(e) => {
                    tracing::error!(error = %e, pidfd = self.pidfd.as_raw_fd(), "pidfd_send_signal")
                }
            }
        }
    }
}

/// Spawns a new child process.
///
/// # Note
///
/// The process is spawned in debug-mode: it stops (`SIGTRAP`) right after
/// its `execve`, which the caller is responsible for waiting on. It is
/// killed when the returned handle is dropped.
pub fn spawn_debuggee<I, S>(program: &Path, args: I) -> crate::Result<TracedProcessHandle>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(program);
    command.args(args);

    // On Linux, if a `pre_exec` closure is specified, `rust-std` will
    // spawn the process with `fork`+`exec`, otherwise `posix_spawn` is used.
    unsafe {
        command.pre_exec(|| ptrace::traceme().map_err(|e| io::Error::from_raw_os_error(e as i32)))
    };

    // the child is reaped by the session's `waitpid` calls, never by `Child`
    let child = command
        .spawn()
        .map_err(|e| crate::Error::Spawn(program.to_path_buf(), e))?;

    let pid = Pid::from_raw(child.id() as i32);

    let handle = TracedProcessHandle::open(pid, true).inspect_err(|_| {
        // not reaped yet, so the PID cannot have been reused
        let _ = signal::kill(pid, Signal::SIGKILL);
    })?;

    tracing::debug!(pid = pid.as_raw(), program = %program.display(), "debuggee spawned");

    Ok(handle)
}
