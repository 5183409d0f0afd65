use std::future::{self, Future};

use super::line::{LineEntry, LookupError};
use super::module::{Module, ModuleRegistry};
use super::session::ExitStatus;

/// Outcome of one single-step of a thread.
#[derive(Clone, Debug)]
pub struct StepReport<'a> {
    /// ID of the stepped thread.
    pub thread_id: u64,

    /// Run-time instruction address of the thread.
    pub instr_addr: u64,

    /// Module containing the instruction, if any.
    pub module: Option<&'a Module>,

    /// Source line of the instruction.
    pub result: Result<LineEntry, LookupError>,
}

/// Trait for implementing a session event handler.
///
/// The session awaits every returned future before resuming the debuggee,
/// so a handler can pause the execution (e.g., until the user asks for the
/// next step).
pub trait EventHandler {
    /// Error returned by this event handler.
    type Error: std::error::Error;

    /// Function called once the module snapshot of the debuggee is built.
    fn modules_loaded(
        &mut self,
        _registry: &ModuleRegistry,
        _main_module: &Module,
    ) -> impl Future<Output = Result<(), Self::Error>> {
        future::ready(Ok(()))
    }

    /// Function called when the debuggee has reached the entry function.
    fn entry_reached(
        &mut self,
        _thread_id: u64,
        _function: &str,
        _entry: &LineEntry,
    ) -> impl Future<Output = Result<(), Self::Error>> {
        future::ready(Ok(()))
    }

    /// Function called when the entry function could not be resolved.
    ///
    /// Stepping then starts from the debuggee's first instruction.
    fn entry_unresolved(
        &mut self,
        _function: &str,
        _error: &LookupError,
    ) -> impl Future<Output = Result<(), Self::Error>> {
        future::ready(Ok(()))
    }

    /// Function called after a thread has executed one instruction.
    fn line_stepped(
        &mut self,
        _report: &StepReport<'_>,
    ) -> impl Future<Output = Result<(), Self::Error>> {
        future::ready(Ok(()))
    }

    /// Function called when a thread (or traced process) has exited.
    fn thread_exited(
        &mut self,
        _thread_id: u64,
        _status: ExitStatus,
    ) -> impl Future<Output = Result<(), Self::Error>> {
        future::ready(Ok(()))
    }
}
