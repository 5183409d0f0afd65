//! This crate provides the core of `linestep`: a process-level debugger
//! which spawns a program under trace, maps its instruction addresses to
//! source lines, and single-steps every one of its threads.
//!
//! The debugger is able to spawn a process (on the **same host machine**) as
//! a child and debug it.
//!
//! # Example
//!
//! ```no_run
//! use linestep_debugger::{Debugger, EventHandler, StepReport};
//!
//! struct Printer;
//!
//! impl EventHandler for Printer {
//!     type Error = std::convert::Infallible;
//!
//!     async fn line_stepped(&mut self, report: &StepReport<'_>) -> Result<(), Self::Error> {
//!         if let Ok(entry) = &report.result {
//!             println!("[{}] {}:{}", report.thread_id, entry.file, entry.line);
//!         }
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let session = Debugger::spawn("./a.out", ["hello"]).await.unwrap();
//!     let outcome = session.run(&mut Printer).await.unwrap();
//!     println!("{:?}", outcome.exit_status);
//! }
//! ```
//!
//! # Supported Platforms
//!
//! <table>
//!     <thead>
//!         <tr>
//!             <th>Host Machine</th>
//!             <th>Debuggee Platform</th>
//!         </tr>
//!     </thead>
//!     <tbody>
//!         <tr>
//!             <td>Linux <code>x86_64</code></td>
//!             <td><code>x86_64</code></td>
//!         </tr>
//!     </tbody>
//! </table>

mod common;
mod error;
mod sys;

pub use self::common::address;
pub use self::common::breakpoint::{Breakpoint, BreakpointManager, TRAP_OPCODE};
pub use self::common::control::{
    ProcessControl, RegisterSnapshot, StopEvent, StopKind, TraceeMemory, WaitTarget,
};
pub use self::common::debugger::Debugger;
pub use self::common::handler::{EventHandler, StepReport};
pub use self::common::line::{LineEntry, LookupError, line_rows, resolve_function_entry, resolve_line};
pub use self::common::module::{MappedRegion, Module, ModuleRegistry};
pub use self::common::session::{ExitStatus, Session, SessionOutcome};
pub use self::common::thread::{ThreadManager, ThreadState};
pub use self::error::{Error, Result, SessionError};
pub use self::sys::{
    Exception, LinuxController, Registers, TracedProcessHandle, spawn_debuggee,
};
