use std::fmt;
use std::path::{Path, PathBuf};

use super::breakpoint::BreakpointManager;
use super::control::{ProcessControl, RegisterSnapshot, StopEvent, StopKind, WaitTarget};
use super::handler::{EventHandler, StepReport};
use super::line::{self, LineEntry, LookupError};
use super::module::{Module, ModuleRegistry};
use super::thread::ThreadManager;
use crate::error::SessionError;
use crate::sys::Exception;

/// Exit status of a traced thread or process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitStatus {
    /// Normal exit with the given code.
    ExitCode(i32),

    /// Termination by the given signal.
    Exception(Exception),
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExitCode(code) => write!(f, "exit code {code}"),
            Self::Exception(exception) => write!(f, "killed by {exception}"),
        }
    }
}

/// Result of a completed [Session].
#[derive(Clone, Debug)]
pub struct SessionOutcome {
    /// Exit status of the debuggee, if it was observed.
    pub exit_status: Option<ExitStatus>,

    /// Number of single-steps reported.
    pub steps: u64,

    /// Threads seen during the session, with their last known state.
    pub threads: ThreadManager,
}

enum EntryOutcome {
    Reached,
    Exited(ExitStatus),
}

/// Line-stepping session over a spawned debuggee.
pub struct Session<C> {
    /// Process controller, the only issuer of control requests.
    controller: C,

    /// Process ID of the debuggee.
    process_id: u64,

    /// Canonical path of the debugged program.
    program: PathBuf,

    /// Function at which stepping starts.
    entry_function: String,

    breakpoints: BreakpointManager,
    threads: ThreadManager,
    exit_status: Option<ExitStatus>,
    steps: u64,
}

impl<C: ProcessControl> Session<C> {
    /// Creates a session over a debuggee spawned in traced mode.
    ///
    /// `program` must be the canonical path of the debuggee's executable.
    pub fn new(controller: C, process_id: u64, program: impl Into<PathBuf>) -> Self {
        Self {
            controller,
            process_id,
            program: program.into(),
            entry_function: "main".to_owned(),
            breakpoints: BreakpointManager::new(),
            threads: ThreadManager::new(),
            exit_status: None,
            steps: 0,
        }
    }

    /// Sets the function at which stepping starts (`main` by default).
    pub fn with_entry_function(mut self, name: impl Into<String>) -> Self {
        self.entry_function = name.into();
        self
    }

    /// Returns the process ID of the debuggee.
    pub const fn process_id(&self) -> u64 {
        self.process_id
    }

    /// Returns the path of the debugged program.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Runs the debuggee up to the entry function, then single-steps every
    /// traced thread until none remains.
    #[tracing::instrument(name = "Session", skip_all, fields(pid = self.process_id))]
    pub async fn run<H: EventHandler>(
        mut self,
        handler: &mut H,
    ) -> Result<SessionOutcome, SessionError<H::Error>> {
        let pid = self.process_id;

        self.wait_for_initial_stop()?;
        self.controller.enable_thread_tracing(pid)?;

        let registry = self.controller.load_modules(pid).await?;

        let main_module = registry
            .find_by_path(&self.program)
            .ok_or_else(|| crate::Error::MainModuleNotFound(self.program.clone()))?;

        handler
            .modules_loaded(&registry, main_module)
            .await
            .map_err(SessionError::Handler)?;

        match line::resolve_function_entry(main_module, &self.entry_function) {
            Ok(entry) => match self.run_to_entry(main_module, &entry)? {
                EntryOutcome::Reached => {
                    handler
                        .entry_reached(pid, &self.entry_function, &entry)
                        .await
                        .map_err(SessionError::Handler)?;

                    self.step(pid, None)?;
                }
                EntryOutcome::Exited(status) => {
                    tracing::debug!(%status, "debuggee exited before its entry");
                    self.on_exit(pid, status, handler).await?;
                }
            },
            Err(e) => {
                tracing::warn!(function = %self.entry_function, error = %e, "entry unresolved");

                handler
                    .entry_unresolved(&self.entry_function, &e)
                    .await
                    .map_err(SessionError::Handler)?;

                self.step(pid, None)?;
            }
        }

        self.step_loop(&registry, handler).await?;

        Ok(SessionOutcome {
            exit_status: self.exit_status,
            steps: self.steps,
            threads: self.threads,
        })
    }

    fn wait_for_initial_stop(&mut self) -> crate::Result<()> {
        let pid = self.process_id;

        match self.controller.wait_for_stop(WaitTarget::Thread(pid))? {
            Some(StopEvent {
                kind: StopKind::Stopped(_),
                ..
            }) => {
                self.threads.register_thread_stop(pid);
                Ok(())
            }
            event => Err(crate::Error::UnexpectedStop {
                thread_id: pid,
                state: format!("{event:?}"),
            }),
        }
    }

    /// Continues the debuggee until it hits a breakpoint placed at `entry`.
    fn run_to_entry(&mut self, module: &Module, entry: &LineEntry) -> crate::Result<EntryOutcome> {
        let pid = self.process_id;
        let addr = module.to_absolute(entry.address);

        self.breakpoints.install(&mut self.controller, pid, addr)?;

        let mut signal = None;

        loop {
            self.controller.continue_exec(pid, signal.take())?;
            self.threads.register_thread_resume(pid);

            let Some(event) = self.controller.wait_for_stop(WaitTarget::Thread(pid))? else {
                return Err(crate::Error::UnexpectedStop {
                    thread_id: pid,
                    state: "gone".to_owned(),
                });
            };

            let exception = match event.kind {
                StopKind::Stopped(exception) => exception,
                StopKind::Exited(code) => return Ok(EntryOutcome::Exited(ExitStatus::ExitCode(code))),
                StopKind::Killed(exception) => {
                    return Ok(EntryOutcome::Exited(ExitStatus::Exception(exception)));
                }
            };

            self.threads.register_thread_stop(pid);

            let mut regs = self.controller.get_registers(pid)?;

            // the trap leaves the instruction pointer past the patched byte
            let trap_addr = regs.instr_addr().wrapping_sub(1);

            if module.to_file_offset(trap_addr) == entry.address {
                regs.set_instr_addr(trap_addr);
                self.controller.set_registers(pid, &regs)?;
                self.breakpoints.remove(&mut self.controller, addr)?;

                tracing::debug!(addr = format_args!("{addr:#x}"), "entry reached");

                return Ok(EntryOutcome::Reached);
            }

            tracing::debug!(%exception, "ignored stop before entry");

            signal = exception.forwarded();
        }
    }

    async fn step_loop<H: EventHandler>(
        &mut self,
        registry: &ModuleRegistry,
        handler: &mut H,
    ) -> Result<(), SessionError<H::Error>> {
        while let Some(StopEvent { thread_id, kind }) =
            self.controller.wait_for_stop(WaitTarget::Any)?
        {
            let exception = match kind {
                StopKind::Stopped(exception) => exception,
                StopKind::Exited(code) => {
                    self.on_exit(thread_id, ExitStatus::ExitCode(code), handler)
                        .await?;
                    continue;
                }
                StopKind::Killed(exception) => {
                    self.on_exit(thread_id, ExitStatus::Exception(exception), handler)
                        .await?;
                    continue;
                }
            };

            self.threads.register_thread_stop(thread_id);

            let regs = match self.controller.get_registers(thread_id) {
                Ok(regs) => regs,
                Err(e) if e.is_vanished_thread() => {
                    // killed by a sibling's exit, its exit is reported next
                    tracing::warn!(thread_id, "thread vanished");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let instr_addr = regs.instr_addr();
            let module = registry.find(instr_addr);

            let result = module
                .ok_or(LookupError::Unmapped(instr_addr))
                .and_then(|module| line::resolve_line(module, instr_addr));

            let report = StepReport {
                thread_id,
                instr_addr,
                module,
                result,
            };

            self.steps += 1;

            handler
                .line_stepped(&report)
                .await
                .map_err(SessionError::Handler)?;

            self.step(thread_id, exception.forwarded())?;
        }

        let live = self.threads.live_count();
        if live > 0 {
            tracing::warn!(live, "tracees gone without reporting their exit");
        }

        tracing::debug!(steps = self.steps, threads = self.threads.len(), "all threads exited");

        Ok(())
    }

    fn step(&mut self, thread_id: u64, signal: Option<Exception>) -> crate::Result<()> {
        match self.controller.single_step(thread_id, signal) {
            Ok(()) => {
                self.threads.register_thread_resume(thread_id);
                Ok(())
            }
            Err(e) if e.is_vanished_thread() => {
                tracing::warn!(thread_id, "thread vanished before being stepped");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn on_exit<H: EventHandler>(
        &mut self,
        thread_id: u64,
        status: ExitStatus,
        handler: &mut H,
    ) -> Result<(), SessionError<H::Error>> {
        self.threads.register_thread_exit(thread_id);

        if thread_id == self.process_id {
            self.exit_status = Some(status);
        }

        tracing::debug!(thread_id, %status, "thread exited");

        handler
            .thread_exited(thread_id, status)
            .await
            .map_err(SessionError::Handler)
    }
}
