use std::future::Future;

use super::module::ModuleRegistry;
use crate::sys::Exception;

/// Word-sized access to the memory of a traced thread.
pub trait TraceeMemory {
    /// Reads the machine word at the given address.
    fn read_word(&mut self, thread_id: u64, addr: u64) -> crate::Result<u64>;

    /// Writes the machine word at the given address.
    fn write_word(&mut self, thread_id: u64, addr: u64, word: u64) -> crate::Result<()>;
}

/// Registers of a stopped thread.
pub trait RegisterSnapshot {
    /// Returns the instruction pointer.
    fn instr_addr(&self) -> u64;

    /// Sets the instruction pointer.
    fn set_instr_addr(&mut self, addr: u64);
}

/// Thread(s) to wait for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitTarget {
    /// A specific thread.
    Thread(u64),

    /// Any traced thread or process.
    Any,
}

/// State change of a traced thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StopEvent {
    /// ID of the thread.
    pub thread_id: u64,

    /// What happened to the thread.
    pub kind: StopKind,
}

/// Kind of a [StopEvent].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopKind {
    /// The thread is stopped by the given signal.
    ///
    /// Tracing events (thread creation, ...) are reported as `SIGTRAP`.
    Stopped(Exception),

    /// The thread exited with the given code.
    Exited(i32),

    /// The thread was terminated by the given signal.
    Killed(Exception),
}

/// Control over a traced process and its threads.
///
/// All the calls must be issued from the thread which spawned the debuggee.
pub trait ProcessControl: TraceeMemory {
    /// Registers of a thread.
    type Registers: RegisterSnapshot;

    /// Blocks until the target changes state.
    ///
    /// Returns `None` once no traced thread remains.
    fn wait_for_stop(&mut self, target: WaitTarget) -> crate::Result<Option<StopEvent>>;

    /// Fetches the registers of a stopped thread.
    fn get_registers(&mut self, thread_id: u64) -> crate::Result<Self::Registers>;

    /// Assigns the registers of a stopped thread.
    fn set_registers(&mut self, thread_id: u64, regs: &Self::Registers) -> crate::Result<()>;

    /// Resumes a stopped thread, delivering the given signal.
    fn continue_exec(&mut self, thread_id: u64, signal: Option<Exception>) -> crate::Result<()>;

    /// Executes a single instruction of a stopped thread, delivering the
    /// given signal.
    fn single_step(&mut self, thread_id: u64, signal: Option<Exception>) -> crate::Result<()>;

    /// Makes threads and processes created by the given one traced as well.
    fn enable_thread_tracing(&mut self, thread_id: u64) -> crate::Result<()>;

    /// Builds the snapshot of the modules mapped by the given process.
    fn load_modules(
        &mut self,
        process_id: u64,
    ) -> impl Future<Output = crate::Result<ModuleRegistry>>;
}
