use nix::errno::Errno;
use nix::sys::ptrace;
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;

use super::{Exception, Registers, TracedProcessHandle};
use crate::{ModuleRegistry, ProcessControl, StopEvent, StopKind, TraceeMemory, WaitTarget};

/// `ptrace`-based process controller.
///
/// # Note
///
/// Linux only accepts `ptrace` requests from the thread which attached to
/// the debuggee, so the controller must stay on the thread which spawned it.
pub struct LinuxController {
    /// Handle of the debuggee, killed when dropped.
    debuggee: TracedProcessHandle,
}

impl LinuxController {
    /// Creates a controller over a debuggee spawned by
    /// [spawn_debuggee](super::spawn_debuggee).
    pub const fn new(debuggee: TracedProcessHandle) -> Self {
        Self { debuggee }
    }

    /// Returns the process ID of the debuggee.
    pub const fn process_id(&self) -> u64 {
        thread_id(self.debuggee.id())
    }

    /// Returns the handle of the debuggee.
    pub const fn debuggee(&self) -> &TracedProcessHandle {
        &self.debuggee
    }
}

const fn pid(thread_id: u64) -> Pid {
    Pid::from_raw(thread_id as i32)
}

const fn thread_id(pid: Pid) -> u64 {
    pid.as_raw() as u64
}

impl TraceeMemory for LinuxController {
    fn read_word(&mut self, thread_id: u64, addr: u64) -> crate::Result<u64> {
        super::mem::read_word(pid(thread_id), addr)
    }

    fn write_word(&mut self, thread_id: u64, addr: u64, word: u64) -> crate::Result<()> {
        super::mem::write_word(pid(thread_id), addr, word)
    }
}

impl ProcessControl for LinuxController {
    type Registers = Registers;

    fn wait_for_stop(&mut self, target: WaitTarget) -> crate::Result<Option<StopEvent>> {
        let (wait_pid, target_id) = match target {
            WaitTarget::Thread(id) => (Some(pid(id)), id),
            WaitTarget::Any => (None, 0),
        };

        loop {
            // FIXME: this call blocks the async runtime
            let status = match waitpid(wait_pid, Some(WaitPidFlag::__WALL | WaitPidFlag::__WNOTHREAD)) {
                Ok(status) => status,
                Err(Errno::ECHILD) => return Ok(None),
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(crate::Error::trace("waitpid", target_id, e)),
            };

            let event = match status {
                WaitStatus::Stopped(pid, signal) => StopEvent {
                    thread_id: thread_id(pid),
                    kind: StopKind::Stopped(Exception(signal)),
                },
                WaitStatus::PtraceEvent(pid, signal, event) => {
                    tracing::trace!(pid = pid.as_raw(), event, "ptrace event");

                    StopEvent {
                        thread_id: thread_id(pid),
                        kind: StopKind::Stopped(Exception(signal)),
                    }
                }
                WaitStatus::Exited(pid, exit_code) => StopEvent {
                    thread_id: thread_id(pid),
                    kind: StopKind::Exited(exit_code),
                },
                WaitStatus::Signaled(pid, signal, _) => StopEvent {
                    thread_id: thread_id(pid),
                    kind: StopKind::Killed(Exception(signal)),
                },
                status => {
                    tracing::trace!(?status, "ignored wait status");
                    continue;
                }
            };

            break Ok(Some(event));
        }
    }

    fn get_registers(&mut self, thread_id: u64) -> crate::Result<Registers> {
        ptrace::getregs(pid(thread_id))
            .map(Registers)
            .map_err(|e| crate::Error::trace("ptrace(PTRACE_GETREGS)", thread_id, e))
    }

    fn set_registers(&mut self, thread_id: u64, regs: &Registers) -> crate::Result<()> {
        ptrace::setregs(pid(thread_id), regs.0)
            .map_err(|e| crate::Error::trace("ptrace(PTRACE_SETREGS)", thread_id, e))
    }

    fn continue_exec(&mut self, thread_id: u64, signal: Option<Exception>) -> crate::Result<()> {
        ptrace::cont(pid(thread_id), signal.map(|e| e.0))
            .map_err(|e| crate::Error::trace("ptrace(PTRACE_CONT)", thread_id, e))
    }

    fn single_step(&mut self, thread_id: u64, signal: Option<Exception>) -> crate::Result<()> {
        ptrace::step(pid(thread_id), signal.map(|e| e.0))
            .map_err(|e| crate::Error::trace("ptrace(PTRACE_SINGLESTEP)", thread_id, e))
    }

    fn enable_thread_tracing(&mut self, thread_id: u64) -> crate::Result<()> {
        ptrace::setoptions(
            pid(thread_id),
            ptrace::Options::PTRACE_O_TRACEFORK
                | ptrace::Options::PTRACE_O_TRACEVFORK
                | ptrace::Options::PTRACE_O_TRACECLONE,
        )
        .map_err(|e| crate::Error::trace("ptrace(PTRACE_SETOPTIONS)", thread_id, e))
    }

    async fn load_modules(&mut self, process_id: u64) -> crate::Result<ModuleRegistry> {
        super::build_module_registry(pid(process_id)).await
    }
}
